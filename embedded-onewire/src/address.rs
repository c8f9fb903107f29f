use crate::OneWireCrc;
use core::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

/// 64-bit ROM code identifying one device on a 1-Wire bus.
///
/// | Byte | Description |
/// |------|-------------|
/// | 0 | Family code (e.g., 0x28 for DS18B20) |
/// | 1-6 | Serial number |
/// | 7 | CRC-8 of bytes 0-6 |
///
/// The on-wire order is byte 0 first; the little-endian `u64` form keeps the
/// family code in the low byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct OneWireAddress([u8; OneWireAddress::BYTES]);

impl OneWireAddress {
    /// The length of a device address in bytes.
    pub const BYTES: usize = 8;

    /// The length of a device address in bits.
    pub const BITS: u8 = Self::BYTES as u8 * 8;

    /// Creates an address from its raw bytes, without checking the CRC.
    pub const fn new(raw: [u8; Self::BYTES]) -> Self {
        Self(raw)
    }

    /// Creates an address from a family code and a 48-bit serial, computing the CRC.
    pub fn from_parts(family: u8, serial: [u8; 6]) -> Self {
        let mut raw = [family, serial[0], serial[1], serial[2], serial[3], serial[4], serial[5], 0];
        raw[7] = OneWireCrc::compute(&raw[..7]);
        Self(raw)
    }

    /// Family code of the device, byte 0 of the ROM.
    pub const fn family(&self) -> u8 {
        self.0[0]
    }

    /// The 48-bit serial number.
    pub fn serial(&self) -> [u8; 6] {
        let mut serial = [0; 6];
        serial.copy_from_slice(&self.0[1..7]);
        serial
    }

    /// CRC byte as stored in the ROM.
    pub const fn crc(&self) -> u8 {
        self.0[7]
    }

    /// `true` if the stored CRC matches the CRC-8 of the first seven bytes.
    pub fn is_valid(&self) -> bool {
        OneWireCrc::compute(&self.0[..7]) == self.0[7]
    }

    /// Raw ROM bytes in bus order.
    pub const fn as_bytes(&self) -> &[u8; Self::BYTES] {
        &self.0
    }
}

impl From<[u8; OneWireAddress::BYTES]> for OneWireAddress {
    fn from(raw: [u8; OneWireAddress::BYTES]) -> Self {
        Self(raw)
    }
}

impl From<OneWireAddress> for [u8; OneWireAddress::BYTES] {
    fn from(addr: OneWireAddress) -> Self {
        addr.0
    }
}

impl From<u64> for OneWireAddress {
    fn from(rom: u64) -> Self {
        Self(rom.to_le_bytes())
    }
}

impl From<OneWireAddress> for u64 {
    fn from(addr: OneWireAddress) -> Self {
        u64::from_le_bytes(addr.0)
    }
}

impl AsRef<[u8]> for OneWireAddress {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Display for OneWireAddress {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        )
    }
}

/// Error returned when parsing an address from text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressParseError {
    /// Fewer than 16 hex digits.
    NotEnough,
    /// A character that is neither a hex digit nor a separator, or trailing digits.
    Invalid,
}

impl FromStr for OneWireAddress {
    type Err = AddressParseError;

    /// Parses 16 hex digits, optionally separated by `:` or whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut raw = [0u8; Self::BYTES];
        let mut digits = s.chars().filter(|c| !c.is_whitespace() && *c != ':');
        for byte in raw.iter_mut() {
            let (Some(h), Some(l)) = (digits.next(), digits.next()) else {
                return Err(AddressParseError::NotEnough);
            };
            match (h.to_digit(16), l.to_digit(16)) {
                (Some(h), Some(l)) => *byte = ((h << 4) | l) as u8,
                _ => return Err(AddressParseError::Invalid),
            }
        }
        if digits.next().is_some() {
            return Err(AddressParseError::Invalid);
        }
        Ok(Self(raw))
    }
}
