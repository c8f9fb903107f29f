#![allow(dead_code)]
//! Simulated multi-drop 1-Wire bus with Dallas temperature sensors.

use embedded_hal::delay::DelayNs;
use embedded_onewire::{OneWire, OneWireAddress, OneWireCrc, OneWireResult};

pub const DEFAULT_TH: i8 = 100;
pub const DEFAULT_TL: i8 = -10;

/// One sensor on the simulated bus.
#[derive(Debug, Clone)]
pub struct Sensor {
    pub rom: OneWireAddress,
    pub scratchpad: [u8; 9],
    pub eeprom: [u8; 3],
    pub parasite: bool,
    /// Flip the CRC byte on every scratchpad read.
    pub corrupt_crc: bool,
    /// Raw temperature loaded by the next conversion.
    pub next_raw: Option<i16>,
    /// Number of polls a conversion keeps the line low.
    pub conversion_polls: u32,
    busy: u32,
}

impl Sensor {
    fn with_family(family: u8, serial: u8, raw: i16, config: u8, count_remain: u8) -> Self {
        let [lsb, msb] = raw.to_le_bytes();
        let mut scratchpad = [
            lsb,
            msb,
            DEFAULT_TH as u8,
            DEFAULT_TL as u8,
            config,
            0xff,
            count_remain,
            0x10,
            0,
        ];
        scratchpad[8] = OneWireCrc::compute(&scratchpad[..8]);
        Self {
            rom: OneWireAddress::from_parts(family, [serial, 0x5a, 0x3c, 0x0f, 0x00, 0x00]),
            eeprom: [scratchpad[2], scratchpad[3], scratchpad[4]],
            scratchpad,
            parasite: false,
            corrupt_crc: false,
            next_raw: None,
            conversion_polls: 0,
            busy: 0,
        }
    }

    /// DS18B20 with a 12-bit configuration.
    pub fn ds18b20(serial: u8, raw: i16) -> Self {
        Self::with_family(0x28, serial, raw, 0x7f, 0x0c)
    }

    /// DS18B20 with the given configuration register.
    pub fn ds18b20_config(serial: u8, raw: i16, config: u8) -> Self {
        Self::with_family(0x28, serial, raw, config, 0x0c)
    }

    /// DS18S20, `raw` in half degrees.
    pub fn ds18s20(serial: u8, raw: i16, count_remain: u8) -> Self {
        Self::with_family(0x10, serial, raw, 0xff, count_remain)
    }

    pub fn max31850(serial: u8, raw: i16) -> Self {
        Self::with_family(0x3b, serial, raw, 0xf0, 0xff)
    }

    pub fn parasite(mut self) -> Self {
        self.parasite = true;
        self
    }

    pub fn corrupt(mut self) -> Self {
        self.corrupt_crc = true;
        self
    }

    pub fn busy_for(mut self, polls: u32) -> Self {
        self.conversion_polls = polls;
        self
    }

    pub fn thresholds(mut self, high: i8, low: i8) -> Self {
        self.scratchpad[2] = high as u8;
        self.scratchpad[3] = low as u8;
        self.eeprom[0] = high as u8;
        self.eeprom[1] = low as u8;
        self.update_crc();
        self
    }

    fn update_crc(&mut self) {
        self.scratchpad[8] = OneWireCrc::compute(&self.scratchpad[..8]);
    }

    fn raw(&self) -> i16 {
        i16::from_le_bytes([self.scratchpad[0], self.scratchpad[1]])
    }

    /// Alarm flag as the device computes it after a conversion.
    fn alarmed(&self) -> bool {
        let degrees = if self.rom.family() == 0x10 {
            self.raw() >> 1
        } else {
            self.raw() >> 4
        };
        degrees <= self.scratchpad[3] as i8 as i16 || degrees >= self.scratchpad[2] as i8 as i16
    }

    fn rom_bit(&self, bit: usize) -> bool {
        self.rom.as_bytes()[bit / 8] & (1 << (bit % 8)) != 0
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    Idle,
    MatchRom(Vec<u8>),
    Function,
    Search { bit: usize, reads: u8, active: Vec<usize> },
    ReadScratch(usize),
    WriteScratch(usize),
    ReadPower,
    Converting,
    Done,
}

/// Byte and bit level model of the bus: every selected device drives the
/// line at once and the bus reads the wired AND.
#[derive(Debug)]
pub struct SimBus {
    pub sensors: Vec<Sensor>,
    phase: Phase,
    selected: Vec<usize>,
    /// Function commands in the order they were received.
    pub commands: Vec<u8>,
    /// Bytes written with the strong pull-up.
    pub powered: Vec<u8>,
    /// Completion polls during conversions.
    pub polls: u32,
}

impl SimBus {
    pub fn new(sensors: Vec<Sensor>) -> Self {
        Self {
            sensors,
            phase: Phase::Idle,
            selected: Vec::new(),
            commands: Vec::new(),
            powered: Vec::new(),
            polls: 0,
        }
    }

    pub fn sensor(&self, rom: &OneWireAddress) -> &Sensor {
        self.sensors
            .iter()
            .find(|s| s.rom == *rom)
            .expect("sensor on the bus")
    }

    fn function(&mut self, cmd: u8) {
        self.commands.push(cmd);
        self.phase = match cmd {
            0x44 => {
                for &i in &self.selected {
                    let sensor = &mut self.sensors[i];
                    if let Some(raw) = sensor.next_raw.take() {
                        let [lsb, msb] = raw.to_le_bytes();
                        sensor.scratchpad[0] = lsb;
                        sensor.scratchpad[1] = msb;
                        sensor.update_crc();
                    }
                    sensor.busy = sensor.conversion_polls;
                }
                Phase::Converting
            }
            0xbe => Phase::ReadScratch(0),
            0x4e => Phase::WriteScratch(0),
            0x48 => {
                for &i in &self.selected {
                    let sensor = &mut self.sensors[i];
                    sensor.eeprom.copy_from_slice(&sensor.scratchpad[2..5]);
                }
                Phase::Done
            }
            0xb8 => {
                for &i in &self.selected {
                    let sensor = &mut self.sensors[i];
                    let eeprom = sensor.eeprom;
                    sensor.scratchpad[2..5].copy_from_slice(&eeprom);
                    sensor.update_crc();
                }
                Phase::Done
            }
            0xb4 => Phase::ReadPower,
            _ => Phase::Done,
        };
    }
}

impl OneWire for SimBus {
    type Status = bool;
    type BusError = ();

    fn reset(&mut self) -> OneWireResult<bool, ()> {
        self.phase = Phase::Idle;
        self.selected.clear();
        Ok(!self.sensors.is_empty())
    }

    fn write_byte(&mut self, byte: u8) -> OneWireResult<(), ()> {
        match core::mem::replace(&mut self.phase, Phase::Done) {
            Phase::Idle => {
                self.phase = match byte {
                    0xcc => {
                        self.selected = (0..self.sensors.len()).collect();
                        Phase::Function
                    }
                    0x55 => Phase::MatchRom(Vec::new()),
                    0xf0 | 0xec => {
                        let alarmed_only = byte == 0xec;
                        let active = (0..self.sensors.len())
                            .filter(|&i| !alarmed_only || self.sensors[i].alarmed())
                            .collect();
                        Phase::Search { bit: 0, reads: 0, active }
                    }
                    _ => Phase::Done,
                }
            }
            Phase::MatchRom(mut rom) => {
                rom.push(byte);
                if rom.len() == 8 {
                    self.selected = (0..self.sensors.len())
                        .filter(|&i| self.sensors[i].rom.as_bytes()[..] == rom[..])
                        .collect();
                    self.phase = Phase::Function;
                } else {
                    self.phase = Phase::MatchRom(rom);
                }
            }
            Phase::Function => self.function(byte),
            Phase::WriteScratch(pos) => {
                for &i in &self.selected {
                    let sensor = &mut self.sensors[i];
                    let limit = if sensor.rom.family() == 0x10 { 2 } else { 3 };
                    if pos < limit {
                        sensor.scratchpad[2 + pos] = byte;
                        sensor.update_crc();
                    }
                }
                self.phase = Phase::WriteScratch(pos + 1);
            }
            other => self.phase = other,
        }
        Ok(())
    }

    fn write_byte_power(&mut self, byte: u8) -> OneWireResult<(), ()> {
        self.powered.push(byte);
        self.write_byte(byte)
    }

    fn read_byte(&mut self) -> OneWireResult<u8, ()> {
        let Phase::ReadScratch(pos) = self.phase else {
            return Ok(0xff);
        };
        self.phase = Phase::ReadScratch(pos + 1);
        if pos >= 9 {
            return Ok(0xff);
        }
        Ok(self.selected.iter().fold(0xff, |acc, &i| {
            let sensor = &self.sensors[i];
            let byte = if pos == 8 && sensor.corrupt_crc {
                !sensor.scratchpad[8]
            } else {
                sensor.scratchpad[pos]
            };
            acc & byte
        }))
    }

    fn write_bit(&mut self, bit: bool) -> OneWireResult<(), ()> {
        if let Phase::Search { bit: current, reads, active } = &mut self.phase {
            let sensors = &self.sensors;
            active.retain(|&i| sensors[i].rom_bit(*current) == bit);
            *current += 1;
            *reads = 0;
        }
        Ok(())
    }

    fn read_bit(&mut self) -> OneWireResult<bool, ()> {
        match &mut self.phase {
            Phase::Search { bit, reads, active } => {
                let complement = *reads == 1;
                *reads += 1;
                Ok(active
                    .iter()
                    .all(|&i| self.sensors[i].rom_bit(*bit) != complement))
            }
            Phase::ReadPower => Ok(!self.selected.iter().any(|&i| self.sensors[i].parasite)),
            Phase::Converting => {
                self.polls += 1;
                let mut done = true;
                for &i in &self.selected {
                    let sensor = &mut self.sensors[i];
                    if sensor.busy > 0 {
                        sensor.busy -= 1;
                        done = false;
                    }
                }
                Ok(done)
            }
            _ => Ok(true),
        }
    }
}

/// Delay that records the requested waits instead of sleeping.
#[derive(Debug, Default)]
pub struct RecordingDelay {
    pub ms: Vec<u32>,
    pub ns: u64,
}

impl RecordingDelay {
    pub fn total_ms(&self) -> u32 {
        self.ms.iter().sum()
    }
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.ns += u64::from(ns);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.ms.push(ms);
    }
}
