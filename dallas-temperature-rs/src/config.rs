use crate::ReadoutResolution;

/// Session settings of a [`DallasTemperature`](crate::DallasTemperature) instance.
///
/// ```ignore
/// let config = DallasConfig::default()
///     .with_resolution(ReadoutResolution::Resolution12bit)
///     .with_check_for_conversion(false);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DallasConfig {
    resolution: ReadoutResolution,
    wait_for_conversion: bool,
    check_for_conversion: bool,
    save_to_eeprom: bool,
}

impl Default for DallasConfig {
    fn default() -> Self {
        Self {
            resolution: ReadoutResolution::Resolution9bit,
            wait_for_conversion: true,
            check_for_conversion: true,
            save_to_eeprom: true,
        }
    }
}

impl DallasConfig {
    /// Global resolution applied by [`set_resolution`](crate::DallasTemperature::set_resolution)
    /// and used to size conversion waits.
    pub fn with_resolution(mut self, resolution: ReadoutResolution) -> Self {
        self.resolution = resolution;
        self
    }

    /// Whether conversion requests block until the conversion is done.
    pub fn with_wait_for_conversion(mut self, wait: bool) -> Self {
        self.wait_for_conversion = wait;
        self
    }

    /// Whether blocking waits poll the bus for completion instead of sleeping
    /// the full conversion time. Ignored with parasite power.
    pub fn with_check_for_conversion(mut self, check: bool) -> Self {
        self.check_for_conversion = check;
        self
    }

    /// Whether threshold and resolution writes are copied to EEPROM.
    pub fn with_save_to_eeprom(mut self, save: bool) -> Self {
        self.save_to_eeprom = save;
        self
    }

    /// Global resolution.
    pub fn resolution(&self) -> ReadoutResolution {
        self.resolution
    }

    /// Blocking conversion requests.
    pub fn wait_for_conversion(&self) -> bool {
        self.wait_for_conversion
    }

    /// Polled conversion waits.
    pub fn check_for_conversion(&self) -> bool {
        self.check_for_conversion
    }

    /// EEPROM copy after scratchpad writes.
    pub fn save_to_eeprom(&self) -> bool {
        self.save_to_eeprom
    }

    pub(crate) fn set_resolution(&mut self, resolution: ReadoutResolution) {
        self.resolution = resolution;
    }

    pub(crate) fn set_wait_for_conversion(&mut self, wait: bool) {
        self.wait_for_conversion = wait;
    }

    pub(crate) fn set_check_for_conversion(&mut self, check: bool) {
        self.check_for_conversion = check;
    }
}

#[cfg(test)]
mod tests {
    use super::DallasConfig;
    use crate::ReadoutResolution;

    #[test]
    fn defaults() {
        let config = DallasConfig::default();
        assert_eq!(config.resolution(), ReadoutResolution::Resolution9bit);
        assert!(config.wait_for_conversion());
        assert!(config.check_for_conversion());
        assert!(config.save_to_eeprom());
    }

    #[test]
    fn builder() {
        let config = DallasConfig::default()
            .with_resolution(ReadoutResolution::Resolution11bit)
            .with_wait_for_conversion(false)
            .with_save_to_eeprom(false);
        assert_eq!(config.resolution(), ReadoutResolution::Resolution11bit);
        assert!(!config.wait_for_conversion());
        assert!(config.check_for_conversion());
        assert!(!config.save_to_eeprom());
    }
}
