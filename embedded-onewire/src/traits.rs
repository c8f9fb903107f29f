use crate::{
    OneWireAddress, OneWireError, OneWireResult,
    consts::{ONEWIRE_MATCH_ROM_CMD, ONEWIRE_SKIP_ROM_CMD},
};

/// Status of the bus as reported after a reset pulse.
pub trait OneWireStatus {
    /// Whether at least one device answered the reset with a presence pulse.
    fn presence(&self) -> bool;

    /// Whether the transport detected a short on the data line.
    fn shortcircuit(&self) -> bool {
        false
    }
}

/// Plain transports may report presence as a `bool`.
impl OneWireStatus for bool {
    fn presence(&self) -> bool {
        *self
    }
}

/// Trait for 1-Wire communication.
/// This trait defines the basic operations required for 1-Wire communication, such as resetting the bus,
/// writing and reading bytes, and writing and reading bits.
///
/// Bit timing is entirely the implementor's business; drivers only ever talk
/// to the bus through these methods.
pub trait OneWire {
    /// The status type returned by the reset operation.
    /// This type must implement the [OneWireStatus] trait.
    type Status: OneWireStatus;
    /// The error type returned by the operations of this trait.
    /// This type is used to indicate errors in the underlying hardware or communication.
    type BusError;

    /// Resets the 1-Wire bus and returns the status of the bus.
    ///
    /// Implementations may either return a status whose [`OneWireStatus::presence`]
    /// is `false` or fail with [`OneWireError::NoDevicePresent`] when nobody answers.
    ///
    /// # Errors
    /// This method returns an error if the reset operation fails.
    fn reset(&mut self) -> OneWireResult<Self::Status, Self::BusError>;

    /// Writes a byte to the 1-Wire bus.
    /// # Arguments
    /// * `byte` - The byte to write to the bus.
    ///
    /// # Errors
    /// This method returns an error if the write operation fails.
    fn write_byte(&mut self, byte: u8) -> OneWireResult<(), Self::BusError>;

    /// Reads a byte from the 1-Wire bus.
    /// # Returns
    /// Byte read from the bus.
    ///
    /// # Errors
    /// This method returns an error if the read operation fails.
    fn read_byte(&mut self) -> OneWireResult<u8, Self::BusError>;

    /// Writes a single bit to the 1-Wire bus.
    ///
    /// # Errors
    /// This method returns an error if the write operation fails.
    fn write_bit(&mut self, bit: bool) -> OneWireResult<(), Self::BusError>;

    /// Reads a single bit from the 1-Wire bus.
    /// # Returns
    /// The bit read from the bus.
    /// # Errors
    /// This method returns an error if the read operation fails.
    fn read_bit(&mut self) -> OneWireResult<bool, Self::BusError>;

    /// Writes a byte and leaves the bus actively held high afterwards (strong pull-up),
    /// so that parasitically powered devices can draw current for a conversion or
    /// an EEPROM write. The pull-up is released by the next bus operation.
    ///
    /// Transports without a strong pull-up fall back to [`OneWire::write_byte`].
    fn write_byte_power(&mut self, byte: u8) -> OneWireResult<(), Self::BusError> {
        self.write_byte(byte)
    }

    /// # Note: Not intended for public API use.
    /// ## This method is internally used by the [search algorithm](https://www.analog.com/en/resources/app-notes/1wire-search-algorithm.html).
    ///
    /// Generates three time slots: two read time slots and one write time slot at the 1-Wire line.
    /// If the read time slots are 0 and 1, they are followed by a write-zero time slot.
    /// If the read time slots are 1 and 0, they are followed by a write-one time slot.
    /// If both read time slots are 0, `direction` selects the write time slot.
    ///
    /// # Returns
    /// The id bit, the complement bit and the direction taken.
    ///
    /// # Errors
    /// Returns [`OneWireError::Unimplemented`] unless the transport overrides it,
    /// in which case the search falls back to single bit operations.
    #[cfg(feature = "triplet-read")]
    fn read_triplet(&mut self, _direction: bool) -> OneWireResult<(bool, bool, bool), Self::BusError> {
        Err(OneWireError::Unimplemented)
    }

    /// Addresses devices on the 1-Wire bus.
    /// The first [`OneWire::read_byte`], [`OneWire::read_bit`], [`OneWire::write_byte`], [`OneWire::write_bit`] operation should be preceded by this method to address devices on the bus.
    /// Note: A [`OneWire::read_byte`] or [`OneWire::read_bit`] call will return garbage data if this method is called without specifying a ROM address on a bus with multiple devices.
    /// # Arguments
    /// * `rom` - The ROM address of the device to address. Pass [`None`] to skip ROM addressing and address all devices on the bus.
    ///
    /// # Errors
    /// Fails with [`OneWireError::NoDevicePresent`] if nobody answers the reset pulse.
    fn address(&mut self, rom: Option<&OneWireAddress>) -> OneWireResult<(), Self::BusError> {
        let status = self.reset()?; // Reset the bus before addressing
        if !status.presence() {
            return Err(OneWireError::NoDevicePresent);
        }
        if status.shortcircuit() {
            return Err(OneWireError::ShortCircuit);
        }
        match rom {
            Some(rom) => {
                self.write_byte(ONEWIRE_MATCH_ROM_CMD)?;
                for &b in rom.as_bytes().iter() {
                    self.write_byte(b)?; // Write each byte of the ROM address
                }
            }
            None => self.write_byte(ONEWIRE_SKIP_ROM_CMD)?,
        }
        Ok(())
    }
}
