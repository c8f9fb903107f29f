use embedded_onewire::OneWireError;
use thiserror::Error;

/// Errors of the temperature sensor driver.
///
/// `E` is the error type of the underlying [`OneWire`](embedded_onewire::OneWire) transport.
#[derive(Debug, Error)]
pub enum DallasError<E> {
    /// Error reported by the 1-Wire transport.
    #[error("1-Wire bus error: {0:?}")]
    Bus(OneWireError<E>),
    /// The device address fails its CRC check.
    #[error("device address fails its CRC check")]
    InvalidAddressCrc,
    /// The scratchpad read back fails its CRC check; the device is treated as disconnected.
    #[error("scratchpad fails its CRC check")]
    InvalidScratchpadCrc,
    /// The MAX31850 flagged a thermocouple fault (open circuit or short) for the last conversion.
    #[error("thermocouple fault")]
    ThermocoupleFault,
    /// No valid device at this index of the enumeration.
    #[error("no device at index {0}")]
    DeviceNotFound(u8),
    /// Polling for the end of a conversion ran past the maximum conversion time.
    #[error("temperature conversion did not complete in time")]
    ConversionTimeout,
}

impl<E> DallasError<E> {
    /// `true` if the error concerns a single device rather than the bus as a whole:
    /// enumeration and broadcast operations skip such devices and carry on.
    pub fn is_device_error(&self) -> bool {
        !matches!(
            self,
            DallasError::Bus(OneWireError::Other(_))
                | DallasError::Bus(OneWireError::ShortCircuit)
                | DallasError::Bus(OneWireError::BusInUse)
        )
    }
}

impl<E> From<OneWireError<E>> for DallasError<E> {
    fn from(value: OneWireError<E>) -> Self {
        Self::Bus(value)
    }
}
