use crate::{
    DALLAS_COPY_SCRATCH, DALLAS_READ_SCRATCH, DALLAS_RECALL_EEPROM, DALLAS_WRITE_SCRATCH,
    DS18S20_FAMILY, DallasError, DallasResult,
};
use bitfield_struct::bitfield;
use embedded_onewire::{OneWire, OneWireAddress, OneWireCrc};
use log::warn;

/// Conversion resolution of the configurable models, stored in the configuration
/// register as one of four fixed masks.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ReadoutResolution {
    /// 0.5 °C steps, 93.75 ms conversion.
    #[default]
    Resolution9bit = 0x1f,
    /// 0.25 °C steps, 187.5 ms conversion.
    Resolution10bit = 0x3f,
    /// 0.125 °C steps, 375 ms conversion.
    Resolution11bit = 0x5f,
    /// 0.0625 °C steps, 750 ms conversion.
    Resolution12bit = 0x7f,
}

impl ReadoutResolution {
    /// Resolution for a bit count, clamped to 9..=12.
    pub fn from_bits(bits: u8) -> Self {
        use ReadoutResolution::*;
        match bits {
            0..=9 => Resolution9bit,
            10 => Resolution10bit,
            11 => Resolution11bit,
            _ => Resolution12bit,
        }
    }

    /// Resolution encoded in a configuration register value. Reserved bits are ignored.
    pub fn from_config(config: u8) -> Self {
        use ReadoutResolution::*;
        match ConfigRegister::from_bits(config).resolution_bits() {
            0 => Resolution9bit,
            1 => Resolution10bit,
            2 => Resolution11bit,
            _ => Resolution12bit,
        }
    }

    /// Number of significant bits, 9 to 12.
    pub fn bits(&self) -> u8 {
        use ReadoutResolution::*;
        match self {
            Resolution9bit => 9,
            Resolution10bit => 10,
            Resolution11bit => 11,
            Resolution12bit => 12,
        }
    }

    /// Configuration register value selecting this resolution.
    pub fn config(&self) -> u8 {
        *self as u8
    }

    /// Maximum conversion time in milliseconds.
    pub fn conversion_ms(&self) -> u32 {
        use ReadoutResolution::*;
        match self {
            Resolution9bit => 94,
            Resolution10bit => 188,
            Resolution11bit => 375,
            Resolution12bit => 750,
        }
    }

    /// Mask clearing the raw temperature bits that are undefined at this resolution.
    pub fn raw_mask(&self) -> i16 {
        use ReadoutResolution::*;
        match self {
            Resolution9bit => !0b111,
            Resolution10bit => !0b11,
            Resolution11bit => !0b1,
            Resolution12bit => !0,
        }
    }
}

/// Configuration register (scratchpad byte 4) of the DS18B20 and DS1822.
///
/// Bits 0-4 read as 1, bit 7 reads as 0, bits 5-6 (R0, R1) select the resolution.
#[bitfield(u8)]
pub struct ConfigRegister {
    #[bits(5)]
    __: u8,
    /// R1:R0, 0 for 9 bits up to 3 for 12 bits.
    #[bits(2)]
    pub resolution_bits: u8,
    #[bits(1)]
    __: u8,
}

/// The 9-byte register image of a sensor.
///
/// | Byte | DS18B20 / DS1822 | DS18S20 |
/// |------|------------------|---------|
/// | 0 | Temperature LSB | Temperature LSB |
/// | 1 | Temperature MSB | Temperature MSB |
/// | 2 | T_H / user byte 1 | T_H / user byte 1 |
/// | 3 | T_L / user byte 2 | T_L / user byte 2 |
/// | 4 | Configuration | Reserved |
/// | 5 | Reserved | Reserved |
/// | 6 | Reserved | COUNT REMAIN |
/// | 7 | Reserved | COUNT PER °C |
/// | 8 | CRC | CRC |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Scratchpad([u8; Scratchpad::BYTES]);

impl Scratchpad {
    /// Size of the register image.
    pub const BYTES: usize = 9;
    /// Temperature LSB location.
    pub const TEMP_LSB: usize = 0;
    /// Temperature MSB location.
    pub const TEMP_MSB: usize = 1;
    /// High alarm threshold location.
    pub const HIGH_ALARM_TEMP: usize = 2;
    /// Low alarm threshold location.
    pub const LOW_ALARM_TEMP: usize = 3;
    /// Configuration register location (reserved on the DS18S20).
    pub const CONFIGURATION: usize = 4;
    /// COUNT REMAIN location (DS18S20).
    pub const COUNT_REMAIN: usize = 6;
    /// COUNT PER °C location (DS18S20).
    pub const COUNT_PER_C: usize = 7;
    /// CRC location.
    pub const SCRATCHPAD_CRC: usize = 8;

    /// Wraps a raw register image. The CRC is not checked.
    pub const fn new(raw: [u8; Self::BYTES]) -> Self {
        Self(raw)
    }

    /// Raw register image.
    pub const fn as_bytes(&self) -> &[u8; Self::BYTES] {
        &self.0
    }

    /// Signed raw temperature register.
    pub fn raw_temperature(&self) -> i16 {
        i16::from_le_bytes([self.0[Self::TEMP_LSB], self.0[Self::TEMP_MSB]])
    }

    /// High alarm threshold in °C.
    pub fn high_alarm(&self) -> i8 {
        self.0[Self::HIGH_ALARM_TEMP] as i8
    }

    /// Low alarm threshold in °C.
    pub fn low_alarm(&self) -> i8 {
        self.0[Self::LOW_ALARM_TEMP] as i8
    }

    /// Configuration register value.
    pub fn configuration(&self) -> u8 {
        self.0[Self::CONFIGURATION]
    }

    /// Resolution selected by the configuration register.
    pub fn resolution(&self) -> ReadoutResolution {
        ReadoutResolution::from_config(self.configuration())
    }

    /// COUNT REMAIN register of the DS18S20.
    pub fn count_remain(&self) -> u8 {
        self.0[Self::COUNT_REMAIN]
    }

    /// COUNT PER °C register of the DS18S20.
    pub fn count_per_c(&self) -> u8 {
        self.0[Self::COUNT_PER_C]
    }

    /// CRC byte as read from the device.
    pub fn crc(&self) -> u8 {
        self.0[Self::SCRATCHPAD_CRC]
    }

    /// `true` if the CRC byte matches the first eight bytes.
    ///
    /// An all-zero image, as read from a line stuck low, passes this check.
    pub fn is_valid(&self) -> bool {
        OneWireCrc::validate(&self.0)
    }

    /// Sets the high alarm threshold.
    pub fn set_high_alarm(&mut self, celsius: i8) {
        self.0[Self::HIGH_ALARM_TEMP] = celsius as u8;
        self.update_crc();
    }

    /// Sets the low alarm threshold.
    pub fn set_low_alarm(&mut self, celsius: i8) {
        self.0[Self::LOW_ALARM_TEMP] = celsius as u8;
        self.update_crc();
    }

    /// Sets the configuration register.
    pub fn set_configuration(&mut self, config: u8) {
        self.0[Self::CONFIGURATION] = config;
        self.update_crc();
    }

    fn update_crc(&mut self) {
        self.0[Self::SCRATCHPAD_CRC] = OneWireCrc::compute(&self.0[..Self::SCRATCHPAD_CRC]);
    }

    /// Reads the scratchpad of the device at `address`.
    ///
    /// # Errors
    /// [`DallasError::InvalidScratchpadCrc`] if the image fails its CRC check, which
    /// is also what an absent device looks like (all ones on the wire).
    pub fn read<O: OneWire>(
        bus: &mut O,
        address: &OneWireAddress,
    ) -> DallasResult<Self, O::BusError> {
        bus.address(Some(address))?;
        bus.write_byte(DALLAS_READ_SCRATCH)?;
        let mut buf = [0; Self::BYTES];
        for b in buf.iter_mut() {
            *b = bus.read_byte()?;
        }
        let scratchpad = Self(buf);
        if scratchpad.is_valid() {
            Ok(scratchpad)
        } else {
            warn!("{address}: scratchpad CRC mismatch ({buf:02x?})");
            Err(DallasError::InvalidScratchpadCrc)
        }
    }

    /// Writes T_H, T_L and the configuration register of the device at `address`.
    ///
    /// The DS18S20 has no configuration register and only receives T_H and T_L.
    pub fn write<O: OneWire>(
        &self,
        bus: &mut O,
        address: &OneWireAddress,
    ) -> DallasResult<(), O::BusError> {
        bus.address(Some(address))?;
        bus.write_byte(DALLAS_WRITE_SCRATCH)?;
        bus.write_byte(self.0[Self::HIGH_ALARM_TEMP])?;
        bus.write_byte(self.0[Self::LOW_ALARM_TEMP])?;
        if address.family() != DS18S20_FAMILY {
            bus.write_byte(self.0[Self::CONFIGURATION])?;
        }
        Ok(())
    }

    /// Starts copying T_H, T_L and the configuration register to EEPROM.
    ///
    /// The copy takes up to 10 ms; with `parasite` set the bus is held high
    /// meanwhile and the caller must wait before the next bus operation.
    pub fn copy_to_eeprom<O: OneWire>(
        bus: &mut O,
        address: &OneWireAddress,
        parasite: bool,
    ) -> DallasResult<(), O::BusError> {
        bus.address(Some(address))?;
        if parasite {
            bus.write_byte_power(DALLAS_COPY_SCRATCH)?;
        } else {
            bus.write_byte(DALLAS_COPY_SCRATCH)?;
        }
        Ok(())
    }

    /// Reloads T_H, T_L and the configuration register from EEPROM.
    pub fn recall_eeprom<O: OneWire>(
        bus: &mut O,
        address: &OneWireAddress,
    ) -> DallasResult<(), O::BusError> {
        bus.address(Some(address))?;
        bus.write_byte(DALLAS_RECALL_EEPROM)?;
        Ok(())
    }
}

impl From<[u8; Scratchpad::BYTES]> for Scratchpad {
    fn from(raw: [u8; Scratchpad::BYTES]) -> Self {
        Self(raw)
    }
}
