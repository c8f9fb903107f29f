//! Temperature conversion start and completion handling.

use crate::{DALLAS_START_CONV, DallasError, DallasResult, ReadoutResolution};
use embedded_hal::delay::DelayNs;
use embedded_onewire::{OneWire, OneWireAddress};
use log::{debug, warn};

/// How a conversion request waits for the devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionPolicy {
    /// Return right after the start command. The caller must not read the
    /// scratchpad before [`ReadoutResolution::conversion_ms`] has elapsed.
    FireAndForget,
    /// Sleep for the maximum conversion time of the resolution.
    BlockingDelay,
    /// Read time slots until a device releases the line (reads 1), bounded by
    /// the maximum conversion time.
    ActivePoll,
}

impl ConversionPolicy {
    /// Policy for the `wait_for_conversion` / `check_for_conversion` flags.
    ///
    /// A parasitically powered device cannot signal completion since the bus is
    /// held high during the conversion, so polling falls back to a blocking delay.
    pub fn select(wait_for_conversion: bool, check_for_conversion: bool, parasite: bool) -> Self {
        match (wait_for_conversion, check_for_conversion && !parasite) {
            (false, _) => ConversionPolicy::FireAndForget,
            (true, true) => ConversionPolicy::ActivePoll,
            (true, false) => ConversionPolicy::BlockingDelay,
        }
    }

    /// Waits for a conversion at `resolution` according to the policy.
    ///
    /// # Errors
    /// [`DallasError::ConversionTimeout`] if polling did not see the end of the
    /// conversion within the maximum conversion time.
    pub fn wait<O: OneWire, D: DelayNs>(
        &self,
        bus: &mut O,
        delay: &mut D,
        resolution: ReadoutResolution,
    ) -> DallasResult<(), O::BusError> {
        let budget = resolution.conversion_ms();
        match self {
            ConversionPolicy::FireAndForget => Ok(()),
            ConversionPolicy::BlockingDelay => {
                delay.delay_ms(budget);
                Ok(())
            }
            ConversionPolicy::ActivePoll => {
                for elapsed in 0..=budget {
                    if bus.read_bit()? {
                        debug!("conversion done after ~{elapsed} ms");
                        return Ok(());
                    }
                    if elapsed < budget {
                        delay.delay_ms(1);
                    }
                }
                warn!("conversion not done after {budget} ms");
                Err(DallasError::ConversionTimeout)
            }
        }
    }
}

/// Issues Convert T to one device or, with `target` set to `None`, to every device on the bus.
///
/// In parasite mode the bus is held high after the command so the devices can
/// draw conversion current from the data line.
pub(crate) fn start_conversion<O: OneWire>(
    bus: &mut O,
    target: Option<&OneWireAddress>,
    parasite: bool,
) -> DallasResult<(), O::BusError> {
    bus.address(target)?;
    if parasite {
        bus.write_byte_power(DALLAS_START_CONV)?;
    } else {
        bus.write_byte(DALLAS_START_CONV)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::ConversionPolicy;

    #[test]
    fn policy_selection() {
        use ConversionPolicy::*;
        assert_eq!(ConversionPolicy::select(false, false, false), FireAndForget);
        assert_eq!(ConversionPolicy::select(false, true, false), FireAndForget);
        assert_eq!(ConversionPolicy::select(false, true, true), FireAndForget);
        assert_eq!(ConversionPolicy::select(true, false, false), BlockingDelay);
        assert_eq!(ConversionPolicy::select(true, true, false), ActivePoll);
    }

    #[test]
    fn parasite_power_disables_polling() {
        assert_eq!(
            ConversionPolicy::select(true, true, true),
            ConversionPolicy::BlockingDelay
        );
    }
}
