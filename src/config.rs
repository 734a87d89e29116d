use std::time::Duration;

/// Arguments of the display mode command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedSettings {
    pub show_weight: bool,
    pub show_timer: bool,
    pub show_grams: bool,
}

impl Default for LedSettings {
    fn default() -> Self {
        Self {
            show_weight: false,
            show_timer: false,
            show_grams: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScaleConfig {
    /// Reconnect automatically when an established link drops.
    pub auto_reconnect: bool,
    /// Display mode sent as part of every successful connect.
    pub initial_led: LedSettings,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            initial_led: LedSettings::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// How long to scan for a peripheral advertising the scale service.
    pub timeout: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}
