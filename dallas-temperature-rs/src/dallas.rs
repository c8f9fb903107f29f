use crate::{
    ALARM_TEMP_MAX, ALARM_TEMP_MIN, AlarmObserver, ConversionPolicy, DALLAS_READ_POWERMODE,
    DEVICE_DISCONNECTED_C, DEVICE_DISCONNECTED_F, DallasConfig, DallasError, DallasResult,
    Decoder, LogAlarmHandler, ReadoutResolution, Scratchpad, conversion::start_conversion,
    to_fahrenheit,
};
use embedded_hal::delay::DelayNs;
use embedded_onewire::{OneWire, OneWireAddress, OneWireSearchKind, OneWireSearchState};
use log::{debug, trace, warn};

/// EEPROM write time after a copy scratchpad command.
const EEPROM_WRITE_MS: u32 = 20;
/// Additional settling time of the strong pull-up in parasite mode.
const EEPROM_PARASITE_EXTRA_MS: u32 = 10;

/// Temperature sensors on one 1-Wire bus.
///
/// Owns the bus and a delay provider for the lifetime of the session. Devices
/// are not remembered between calls: addressing by index repeats the search
/// up to that index, so prefer addressing by [`OneWireAddress`] on busy buses.
///
/// Methods come in two flavours. The readers named after the classic Arduino
/// interface ([`get_temp_c`](Self::get_temp_c), [`is_connected`](Self::is_connected),
/// [`has_alarm`](Self::has_alarm), ...) never fail and report a missing device as
/// [`DEVICE_DISCONNECTED_C`] or `false`. Everything else returns a [`DallasResult`].
pub struct DallasTemperature<O, D, A = LogAlarmHandler> {
    bus: O,
    delay: D,
    config: DallasConfig,
    parasite: bool,
    devices: u8,
    alarm_search: OneWireSearchState,
    alarm_handler: A,
}

impl<O: OneWire, D: DelayNs> DallasTemperature<O, D> {
    /// Creates a session with the default [`DallasConfig`] and the [`LogAlarmHandler`].
    ///
    /// Call [`begin`](Self::begin) before using the device count or the parasite flag.
    pub fn new(bus: O, delay: D) -> Self {
        Self {
            bus,
            delay,
            config: DallasConfig::default(),
            parasite: false,
            devices: 0,
            alarm_search: OneWireSearchState::new(OneWireSearchKind::Alarmed),
            alarm_handler: LogAlarmHandler,
        }
    }
}

impl<O, D, A> DallasTemperature<O, D, A> {
    /// Replaces the session settings.
    pub fn with_config(mut self, config: DallasConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the alarm handler called by [`process_alarms`](Self::process_alarms).
    pub fn with_alarm_handler<B: AlarmObserver>(self, alarm_handler: B) -> DallasTemperature<O, D, B> {
        DallasTemperature {
            bus: self.bus,
            delay: self.delay,
            config: self.config,
            parasite: self.parasite,
            devices: self.devices,
            alarm_search: self.alarm_search,
            alarm_handler,
        }
    }

    /// Replaces the alarm handler with another one of the same type.
    pub fn set_alarm_handler(&mut self, alarm_handler: A) {
        self.alarm_handler = alarm_handler;
    }

    /// Current session settings.
    pub fn config(&self) -> &DallasConfig {
        &self.config
    }

    /// The underlying bus, e.g. to talk to other devices sharing it.
    pub fn bus_mut(&mut self) -> &mut O {
        &mut self.bus
    }

    /// Ends the session and returns the bus and the delay provider.
    pub fn release(self) -> (O, D) {
        (self.bus, self.delay)
    }

    /// Number of valid devices found by the last [`begin`](Self::begin).
    pub fn device_count(&self) -> u8 {
        self.devices
    }

    /// `true` if any device found by [`begin`](Self::begin) is parasitically powered.
    pub fn is_parasite_power_mode(&self) -> bool {
        self.parasite
    }

    /// `true` if the address passes its CRC check.
    pub fn valid_address(&self, address: &OneWireAddress) -> bool {
        address.is_valid()
    }

    /// Global resolution.
    pub fn resolution(&self) -> ReadoutResolution {
        self.config.resolution()
    }

    /// Whether conversion requests block until the conversion is done.
    pub fn wait_for_conversion(&self) -> bool {
        self.config.wait_for_conversion()
    }

    /// See [`DallasConfig::with_wait_for_conversion`].
    pub fn set_wait_for_conversion(&mut self, wait: bool) {
        self.config.set_wait_for_conversion(wait);
    }

    /// Whether blocking waits poll the bus for completion.
    pub fn check_for_conversion(&self) -> bool {
        self.config.check_for_conversion()
    }

    /// See [`DallasConfig::with_check_for_conversion`].
    pub fn set_check_for_conversion(&mut self, check: bool) {
        self.config.set_check_for_conversion(check);
    }

    /// Restarts the alarm search of [`alarm_search`](Self::alarm_search).
    pub fn reset_alarm_search(&mut self) {
        self.alarm_search.reset();
    }
}

impl<O: OneWire, D: DelayNs, A: AlarmObserver> DallasTemperature<O, D, A> {
    /// Enumerates the bus.
    ///
    /// Counts the devices with a valid address, checks whether any of them is
    /// parasitically powered and raises the global resolution to the highest
    /// resolution found on a device. Devices that do not answer individually
    /// are skipped.
    ///
    /// # Returns
    /// The number of devices found.
    pub fn begin(&mut self) -> DallasResult<u8, O::BusError> {
        self.devices = 0;
        self.parasite = false;
        let mut resolution = self.config.resolution();
        let mut search = OneWireSearchState::new(OneWireSearchKind::Normal);
        while let Some(address) = search.next(&mut self.bus)? {
            if !address.is_valid() {
                warn!("{address}: invalid address CRC, skipped");
                continue;
            }
            trace!("found {address}");
            self.devices = self.devices.saturating_add(1);
            match self.read_power_supply(&address) {
                Ok(parasite) => self.parasite |= parasite,
                Err(e) if e.is_device_error() => warn!("{address}: power supply not readable"),
                Err(e) => return Err(e),
            }
            match self.resolution_of(&address) {
                Ok(r) => resolution = resolution.max(r),
                Err(e) if e.is_device_error() => warn!("{address}: resolution not readable"),
                Err(e) => return Err(e),
            }
        }
        self.config.set_resolution(resolution);
        debug!(
            "{} devices, parasite power: {}, resolution: {} bits",
            self.devices,
            self.parasite,
            resolution.bits()
        );
        Ok(self.devices)
    }

    /// Address of the `index`-th valid device in search order.
    ///
    /// Searches the bus from the start on every call.
    ///
    /// # Errors
    /// [`DallasError::DeviceNotFound`] if fewer than `index + 1` valid devices answer.
    pub fn get_address(&mut self, index: u8) -> DallasResult<OneWireAddress, O::BusError> {
        let mut search = OneWireSearchState::new(OneWireSearchKind::Normal);
        let mut count = 0u8;
        while let Some(address) = search.next(&mut self.bus)? {
            if !address.is_valid() {
                continue;
            }
            if count == index {
                return Ok(address);
            }
            count += 1;
        }
        Err(DallasError::DeviceNotFound(index))
    }

    /// `true` if the device answers with a valid scratchpad.
    pub fn is_connected(&mut self, address: &OneWireAddress) -> bool {
        self.read_scratchpad(address).is_ok()
    }

    /// Reads the 9-byte scratchpad of a device.
    ///
    /// # Errors
    /// [`DallasError::InvalidAddressCrc`] if `address` fails its CRC check, nothing is sent then.
    /// [`DallasError::InvalidScratchpadCrc`] if the device is absent or the read was corrupted.
    pub fn read_scratchpad(
        &mut self,
        address: &OneWireAddress,
    ) -> DallasResult<Scratchpad, O::BusError> {
        check_address(address)?;
        Scratchpad::read(&mut self.bus, address)
    }

    /// Writes T_H, T_L and the configuration register of a device, then copies
    /// them to EEPROM unless disabled by [`DallasConfig::with_save_to_eeprom`].
    pub fn write_scratchpad(
        &mut self,
        address: &OneWireAddress,
        scratchpad: &Scratchpad,
    ) -> DallasResult<(), O::BusError> {
        check_address(address)?;
        scratchpad.write(&mut self.bus, address)?;
        if self.config.save_to_eeprom() {
            self.save_scratchpad(address)?;
        }
        Ok(())
    }

    /// Copies T_H, T_L and the configuration register of a device to EEPROM
    /// and waits for the write to finish.
    pub fn save_scratchpad(&mut self, address: &OneWireAddress) -> DallasResult<(), O::BusError> {
        check_address(address)?;
        Scratchpad::copy_to_eeprom(&mut self.bus, address, self.parasite)?;
        self.delay.delay_ms(EEPROM_WRITE_MS);
        if self.parasite {
            self.delay.delay_ms(EEPROM_PARASITE_EXTRA_MS);
        }
        Ok(())
    }

    /// Restores T_H, T_L and the configuration register of a device from EEPROM.
    pub fn recall_scratchpad(&mut self, address: &OneWireAddress) -> DallasResult<(), O::BusError> {
        check_address(address)?;
        Scratchpad::recall_eeprom(&mut self.bus, address)
    }

    /// `true` if the device is parasitically powered, i.e. pulls the bus low
    /// in reply to Read Power Supply.
    pub fn read_power_supply(&mut self, address: &OneWireAddress) -> DallasResult<bool, O::BusError> {
        check_address(address)?;
        self.bus.address(Some(address))?;
        self.bus.write_byte(DALLAS_READ_POWERMODE)?;
        let parasite = !self.bus.read_bit()?;
        trace!("{address}: parasite power: {parasite}");
        Ok(parasite)
    }

    /// Sets the resolution of every device on the bus and makes it the global resolution.
    ///
    /// Devices that do not answer are skipped.
    pub fn set_resolution(&mut self, resolution: ReadoutResolution) -> DallasResult<(), O::BusError> {
        self.config.set_resolution(resolution);
        let mut search = OneWireSearchState::new(OneWireSearchKind::Normal);
        while let Some(address) = search.next(&mut self.bus)? {
            if !address.is_valid() {
                continue;
            }
            match self.write_resolution(&address, resolution) {
                Ok(_) => {}
                Err(e) if e.is_device_error() => warn!("{address}: resolution not set"),
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Resolution of one device. The DS18S20 and MAX31850 always report 12 bits.
    pub fn resolution_of(
        &mut self,
        address: &OneWireAddress,
    ) -> DallasResult<ReadoutResolution, O::BusError> {
        check_address(address)?;
        if let Some(fixed) = Decoder::for_family(address.family()).fixed_resolution() {
            return Ok(fixed);
        }
        Ok(self.read_scratchpad(address)?.resolution())
    }

    /// Sets the resolution of one device.
    ///
    /// The global resolution becomes the highest of `resolution` and the
    /// resolutions of the other devices, so conversion waits stay long enough
    /// for every device.
    ///
    /// # Returns
    /// `false` if the device has a fixed resolution.
    pub fn set_resolution_of(
        &mut self,
        address: &OneWireAddress,
        resolution: ReadoutResolution,
    ) -> DallasResult<bool, O::BusError> {
        if !self.write_resolution(address, resolution)? {
            return Ok(false);
        }
        let mut global = resolution;
        let mut search = OneWireSearchState::new(OneWireSearchKind::Normal);
        while global < ReadoutResolution::Resolution12bit {
            let Some(other) = search.next(&mut self.bus)? else {
                break;
            };
            if other == *address || !other.is_valid() {
                continue;
            }
            match self.resolution_of(&other) {
                Ok(r) => global = global.max(r),
                Err(e) if e.is_device_error() => {}
                Err(e) => return Err(e),
            }
        }
        self.config.set_resolution(global);
        Ok(true)
    }

    fn write_resolution(
        &mut self,
        address: &OneWireAddress,
        resolution: ReadoutResolution,
    ) -> DallasResult<bool, O::BusError> {
        check_address(address)?;
        if Decoder::for_family(address.family()).fixed_resolution().is_some() {
            return Ok(false);
        }
        let mut scratchpad = self.read_scratchpad(address)?;
        if scratchpad.resolution() != resolution {
            scratchpad.set_configuration(resolution.config());
            self.write_scratchpad(address, &scratchpad)?;
        }
        Ok(true)
    }

    /// Starts a conversion on every device and waits according to the
    /// [`ConversionPolicy`] for the global resolution.
    ///
    /// With parasite power several devices converting at once may draw more
    /// current than the strong pull-up provides.
    pub fn request_temperatures(&mut self) -> DallasResult<(), O::BusError> {
        start_conversion(&mut self.bus, None, self.parasite)?;
        self.wait_for(self.config.resolution())
    }

    /// Starts a conversion on one device and waits for its resolution.
    ///
    /// # Returns
    /// `false` if the device did not answer.
    ///
    /// # Errors
    /// [`DallasError::InvalidAddressCrc`] if `address` fails its CRC check.
    pub fn request_temperatures_by_address(
        &mut self,
        address: &OneWireAddress,
    ) -> DallasResult<bool, O::BusError> {
        check_address(address)?;
        let resolution = match self.resolution_of(address) {
            Ok(resolution) => resolution,
            Err(e) if e.is_device_error() => return Ok(false),
            Err(e) => return Err(e),
        };
        start_conversion(&mut self.bus, Some(address), self.parasite)?;
        self.wait_for(resolution)?;
        Ok(true)
    }

    /// [`request_temperatures_by_address`](Self::request_temperatures_by_address)
    /// for the `index`-th device.
    pub fn request_temperatures_by_index(&mut self, index: u8) -> DallasResult<bool, O::BusError> {
        match self.get_address(index) {
            Ok(address) => self.request_temperatures_by_address(&address),
            Err(DallasError::DeviceNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn wait_for(&mut self, resolution: ReadoutResolution) -> DallasResult<(), O::BusError> {
        let policy = ConversionPolicy::select(
            self.config.wait_for_conversion(),
            self.config.check_for_conversion(),
            self.parasite,
        );
        trace!("conversion wait: {policy:?}, {} bits", resolution.bits());
        policy.wait(&mut self.bus, &mut self.delay, resolution)
    }

    /// `true` once a conversion started on the bus has finished.
    ///
    /// Only meaningful right after a non-blocking request to externally powered devices.
    pub fn is_conversion_complete(&mut self) -> DallasResult<bool, O::BusError> {
        Ok(self.bus.read_bit()?)
    }

    /// `true` if the temperature register of the device holds a nonzero LSB.
    pub fn is_conversion_available(
        &mut self,
        address: &OneWireAddress,
    ) -> DallasResult<bool, O::BusError> {
        let scratchpad = self.read_scratchpad(address)?;
        Ok(scratchpad.as_bytes()[Scratchpad::TEMP_LSB] != 0)
    }

    /// Last converted temperature of a device in °C.
    ///
    /// # Errors
    /// [`DallasError::ThermocoupleFault`] if a MAX31850 flagged the conversion as faulty.
    pub fn read_temp_c(&mut self, address: &OneWireAddress) -> DallasResult<f32, O::BusError> {
        let scratchpad = self.read_scratchpad(address)?;
        let decoder = Decoder::for_family(address.family());
        if decoder.is_fault(&scratchpad) {
            warn!("{address}: thermocouple fault");
            return Err(DallasError::ThermocoupleFault);
        }
        Ok(decoder.decode(&scratchpad))
    }

    /// Last converted temperature of a device in °C, or [`DEVICE_DISCONNECTED_C`].
    pub fn get_temp_c(&mut self, address: &OneWireAddress) -> f32 {
        self.read_temp_c(address).unwrap_or(DEVICE_DISCONNECTED_C)
    }

    /// Last converted temperature of a device in °F, or [`DEVICE_DISCONNECTED_F`].
    pub fn get_temp_f(&mut self, address: &OneWireAddress) -> f32 {
        self.read_temp_c(address)
            .map(to_fahrenheit)
            .unwrap_or(DEVICE_DISCONNECTED_F)
    }

    /// [`get_temp_c`](Self::get_temp_c) of the `index`-th device.
    pub fn get_temp_c_by_index(&mut self, index: u8) -> f32 {
        match self.get_address(index) {
            Ok(address) => self.get_temp_c(&address),
            Err(_) => DEVICE_DISCONNECTED_C,
        }
    }

    /// [`get_temp_f`](Self::get_temp_f) of the `index`-th device.
    pub fn get_temp_f_by_index(&mut self, index: u8) -> f32 {
        match self.get_address(index) {
            Ok(address) => self.get_temp_f(&address),
            Err(_) => DEVICE_DISCONNECTED_F,
        }
    }

    /// Sets the high alarm threshold of a device, clamped to -55..=125 °C.
    pub fn set_high_alarm_temp(
        &mut self,
        address: &OneWireAddress,
        celsius: i8,
    ) -> DallasResult<(), O::BusError> {
        let mut scratchpad = self.read_scratchpad(address)?;
        scratchpad.set_high_alarm(celsius.clamp(ALARM_TEMP_MIN, ALARM_TEMP_MAX));
        self.write_scratchpad(address, &scratchpad)
    }

    /// Sets the low alarm threshold of a device, clamped to -55..=125 °C.
    pub fn set_low_alarm_temp(
        &mut self,
        address: &OneWireAddress,
        celsius: i8,
    ) -> DallasResult<(), O::BusError> {
        let mut scratchpad = self.read_scratchpad(address)?;
        scratchpad.set_low_alarm(celsius.clamp(ALARM_TEMP_MIN, ALARM_TEMP_MAX));
        self.write_scratchpad(address, &scratchpad)
    }

    /// High alarm threshold of a device in °C.
    pub fn high_alarm_temp(&mut self, address: &OneWireAddress) -> DallasResult<i8, O::BusError> {
        Ok(self.read_scratchpad(address)?.high_alarm())
    }

    /// Low alarm threshold of a device in °C.
    pub fn low_alarm_temp(&mut self, address: &OneWireAddress) -> DallasResult<i8, O::BusError> {
        Ok(self.read_scratchpad(address)?.low_alarm())
    }

    /// Next device in alarm state, or `None` once the pass is over.
    ///
    /// The following call starts a new pass. Bus errors end the pass as well.
    pub fn alarm_search(&mut self) -> Option<OneWireAddress> {
        match self.alarm_search.next(&mut self.bus) {
            Ok(found) => found,
            Err(_) => {
                warn!("alarm search aborted by a bus error");
                self.alarm_search.reset();
                None
            }
        }
    }

    /// `true` if the last converted temperature of the device is at or beyond
    /// one of its thresholds, compared in whole degrees.
    pub fn has_alarm(&mut self, address: &OneWireAddress) -> bool {
        let Ok(scratchpad) = self.read_scratchpad(address) else {
            return false;
        };
        let degrees = Decoder::for_family(address.family()).alarm_degrees(&scratchpad);
        degrees <= scratchpad.low_alarm() as i16 || degrees >= scratchpad.high_alarm() as i16
    }

    /// `true` if any device on the bus is in alarm state.
    ///
    /// Leaves the cursor of [`alarm_search`](Self::alarm_search) untouched.
    pub fn any_alarm(&mut self) -> bool {
        let mut search = OneWireSearchState::new(OneWireSearchKind::Alarmed);
        matches!(search.next(&mut self.bus), Ok(Some(_)))
    }

    /// Calls the alarm handler once for every valid device in alarm state.
    ///
    /// Runs its own search pass and leaves the cursor of
    /// [`alarm_search`](Self::alarm_search) untouched.
    ///
    /// # Returns
    /// The number of alarms dispatched.
    pub fn process_alarms(&mut self) -> DallasResult<u8, O::BusError> {
        let mut search = OneWireSearchState::new(OneWireSearchKind::Alarmed);
        let mut count = 0u8;
        while let Some(address) = search.next(&mut self.bus)? {
            if address.is_valid() {
                self.alarm_handler.on_alarm(&address);
                count = count.saturating_add(1);
            }
        }
        Ok(count)
    }
}

fn check_address<E>(address: &OneWireAddress) -> DallasResult<(), E> {
    if address.is_valid() {
        Ok(())
    } else {
        warn!("{address}: invalid address CRC");
        Err(DallasError::InvalidAddressCrc)
    }
}
