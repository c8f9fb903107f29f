use crate::{
    OneWire, OneWireAddress, OneWireError, OneWireResult, OneWireStatus, ONEWIRE_CONDITIONAL_SEARCH_CMD,
    ONEWIRE_SEARCH_CMD,
};
use log::trace;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Type of search performed using [`OneWireSearch`] or [`OneWireSearchState`].
pub enum OneWireSearchKind {
    /// Normal search
    #[default]
    Normal = ONEWIRE_SEARCH_CMD,
    /// Search only for devices with alarm
    Alarmed = ONEWIRE_CONDITIONAL_SEARCH_CMD,
}

/// Cursor of the [1-Wire search algorithm](https://www.analog.com/en/resources/app-notes/1wire-search-algorithm.html).
///
/// The cursor holds everything the algorithm needs between two calls (the last
/// ROM found, the bit position of the last unexplored zero branch and whether the
/// last device has been reached), but not the bus. It is a plain value: it can be
/// stored, copied, or threaded through calls, and two cursors never interfere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OneWireSearchState {
    kind: OneWireSearchKind,
    last_device: bool,
    last_discrepancy: u8,
    family: u8,
    rom: [u8; OneWireAddress::BYTES],
}

impl Default for OneWireSearchState {
    fn default() -> Self {
        Self::new(OneWireSearchKind::Normal)
    }
}

impl OneWireSearchState {
    /// Creates a cursor positioned at the start of a pass.
    pub const fn new(kind: OneWireSearchKind) -> Self {
        Self {
            kind,
            last_device: false,
            last_discrepancy: 0,
            family: 0,
            rom: [0; OneWireAddress::BYTES],
        }
    }

    /// Creates a cursor that only reports devices of the given family.
    pub const fn with_family(kind: OneWireSearchKind, family: u8) -> Self {
        let mut state = Self::new(kind);
        state.family = family;
        state.rom[0] = family;
        state.last_discrepancy = OneWireAddress::BITS;
        state
    }

    /// Restarts the pass. The next call to [`next`](Self::next) reports the first device again.
    pub fn reset(&mut self) {
        *self = if self.family == 0 {
            Self::new(self.kind)
        } else {
            Self::with_family(self.kind, self.family)
        };
    }

    /// Kind of search this cursor performs.
    pub fn kind(&self) -> OneWireSearchKind {
        self.kind
    }

    /// `true` once the last device of the pass has been reported.
    pub fn is_exhausted(&self) -> bool {
        self.last_device
    }

    /// Bit position (1-64) of the deepest zero branch still to be explored, 0 if none.
    pub fn last_discrepancy(&self) -> u8 {
        self.last_discrepancy
    }

    /// Searches for the next device on the 1-Wire bus.
    ///
    /// Returns `Ok(None)` when the pass is over: after the last device has been
    /// reported, when no device answers the reset pulse, or when nobody answers
    /// a bit slot. The cursor is reset at that point, so the following call
    /// starts a fresh pass.
    ///
    /// The CRC of the returned address is not checked here; see
    /// [`OneWireAddress::is_valid`].
    #[allow(clippy::should_implement_trait)]
    pub fn next<T: OneWire>(
        &mut self,
        onewire: &mut T,
    ) -> OneWireResult<Option<OneWireAddress>, T::BusError> {
        if self.last_device {
            self.reset();
            return Ok(None);
        }
        let status = match onewire.reset() {
            Ok(status) => status,
            Err(OneWireError::NoDevicePresent) => {
                self.reset();
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        if !status.presence() {
            self.reset();
            return Ok(None);
        }
        if status.shortcircuit() {
            return Err(OneWireError::ShortCircuit);
        }
        onewire.write_byte(self.kind as u8)?;
        let mut last_zero: u8 = 0;
        for id_bit_num in 1..=OneWireAddress::BITS {
            let idx = ((id_bit_num - 1) / 8) as usize; // Index in the ROM array
            let rom_mask = 1u8 << ((id_bit_num - 1) % 8); // Mask for the current bit in the ROM byte
            // Direction to take if the devices disagree on this bit
            let dir = if id_bit_num < self.last_discrepancy {
                self.rom[idx] & rom_mask > 0
            } else {
                id_bit_num == self.last_discrepancy
            };
            let (id_bit, complement_bit, set) = Self::triplet(onewire, dir)?;
            if id_bit && complement_bit {
                // Nobody answered, the participating devices left the bus
                trace!("1-Wire search: no response at bit {id_bit_num}");
                self.reset();
                return Ok(None);
            }
            if !id_bit && !complement_bit && !set {
                last_zero = id_bit_num;
            }
            if set {
                self.rom[idx] |= rom_mask;
            } else {
                self.rom[idx] &= !rom_mask;
            }
        }
        self.last_discrepancy = last_zero;
        self.last_device = last_zero == 0;

        // A line stuck low reads as all zeros; family code 0 is never assigned
        if self.rom[0] == 0 || (self.family != 0 && self.rom[0] != self.family) {
            self.reset();
            return Ok(None);
        }
        let found = OneWireAddress::new(self.rom);
        trace!("1-Wire search: found {found}, last discrepancy {last_zero}");
        Ok(Some(found))
    }

    /// Verifies if the device with the given ROM code is present on the 1-Wire bus
    /// (and, for [`OneWireSearchKind::Alarmed`], in alarm state).
    ///
    /// The cursor itself is left untouched.
    pub fn verify<T: OneWire>(
        &self,
        onewire: &mut T,
        rom: &OneWireAddress,
    ) -> OneWireResult<bool, T::BusError> {
        let mut probe = Self::new(self.kind);
        probe.rom = *rom.as_bytes();
        probe.last_discrepancy = OneWireAddress::BITS;
        Ok(probe.next(onewire)? == Some(*rom))
    }

    /// Reads the id bit and its complement, then writes the direction taken.
    fn triplet<T: OneWire>(
        onewire: &mut T,
        dir: bool,
    ) -> OneWireResult<(bool, bool, bool), T::BusError> {
        // Let the transport do the whole triplet if it can, fall back to
        // single bit operations otherwise.
        #[cfg(feature = "triplet-read")]
        match onewire.read_triplet(dir) {
            Err(OneWireError::Unimplemented) => {}
            other => return other,
        }
        let id_bit = onewire.read_bit()?;
        let complement_bit = onewire.read_bit()?;
        let set = if id_bit != complement_bit {
            // The bits are different, use the id_bit
            id_bit
        } else {
            dir
        };
        if !(id_bit && complement_bit) {
            onewire.write_bit(set)?;
        }
        Ok((id_bit, complement_bit, set))
    }
}

/// A structure for searching devices on a 1-Wire bus.
/// This structure binds a [`OneWireSearchState`] to a bus for the duration of a search.
pub struct OneWireSearch<'a, T> {
    onewire: &'a mut T,
    state: OneWireSearchState,
}

impl<'a, T> OneWireSearch<'a, T> {
    /// Creates a new [`OneWireSearch`] instance.
    ///
    /// # Arguments
    /// * `onewire` - A mutable reference to a type that implements the `OneWire` trait.
    /// * `kind` - Normal search (`0xf0`) or search for devices in alarm state (`0xec`).
    pub fn new(onewire: &'a mut T, kind: OneWireSearchKind) -> Self {
        Self::resume(onewire, OneWireSearchState::new(kind))
    }

    /// Creates a new [`OneWireSearch`] instance with a specific family code.
    /// # Arguments
    /// * `onewire` - A mutable reference to a type that implements the `OneWire` trait.
    /// * `kind` - Normal search (`0xf0`) or search for devices in alarm state (`0xec`).
    /// * `family` - The family code of the devices to search for.
    pub fn with_family(onewire: &'a mut T, kind: OneWireSearchKind, family: u8) -> Self {
        Self::resume(onewire, OneWireSearchState::with_family(kind, family))
    }

    /// Continues a search from a previously saved cursor.
    pub fn resume(onewire: &'a mut T, state: OneWireSearchState) -> Self {
        Self { onewire, state }
    }

    /// Current cursor, to be saved and resumed later.
    pub fn state(&self) -> OneWireSearchState {
        self.state
    }

    /// Restarts the pass.
    pub fn reset(&mut self) {
        self.state.reset();
    }
}

impl<T: OneWire> OneWireSearch<'_, T> {
    /// Searches for the next device, see [`OneWireSearchState::next`].
    ///
    /// Calling this repeatedly yields every device on the bus once, then `None`;
    /// calling it again after `None` starts a new pass.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> OneWireResult<Option<OneWireAddress>, T::BusError> {
        self.state.next(self.onewire)
    }

    /// Verifies if the device with the given ROM code is present on the 1-Wire bus.
    pub fn verify(&mut self, rom: &OneWireAddress) -> OneWireResult<bool, T::BusError> {
        self.state.verify(self.onewire, rom)
    }
}

/// Yields the devices of one search pass, then `None`.
impl<T: OneWire> Iterator for OneWireSearch<'_, T> {
    type Item = OneWireResult<OneWireAddress, T::BusError>;

    fn next(&mut self) -> Option<Self::Item> {
        OneWireSearch::next(self).transpose()
    }
}
