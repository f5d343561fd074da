use log::{error, info};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{
    DEFAULT_BACKOFF_MS, DEFAULT_COOLDOWN_WINDOWS, DEFAULT_DB_MAX, DEFAULT_DB_MIN, DEFAULT_DEBUG,
    DEFAULT_METER_WIDTH, DEFAULT_OUTPUT_DIR, DEFAULT_SAMPLE_RATE, DEFAULT_THRESHOLD,
    DEFAULT_WINDOW_SECS,
};
use crate::error::SoundwatchError;

/// The main configuration struct that holds all settings for the monitor.
///
/// This structure can be initialized from environment variables, a TOML file,
/// or with default values. Values are resolved with environment variables
/// having the highest precedence, followed by the config file, and then
/// defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Requested capture sample rate in Hz (the device may negotiate another)
    pub sample_rate: Option<u32>,
    /// Recording window duration in seconds
    pub window_secs: Option<f64>,
    /// Width of the console level meter in columns
    pub meter_width: Option<usize>,
    /// Bottom of the displayed dB range
    pub db_min: Option<f32>,
    /// Top of the displayed dB range
    pub db_max: Option<f32>,
    /// Detection score above which a window is persisted
    pub threshold: Option<f32>,
    /// Directory for saving event recordings
    pub output_dir: Option<String>,
    /// Wait after a recovered error before the next window, in milliseconds
    pub backoff_ms: Option<u64>,
    /// Suppress persistence for this many windows after a detection (0 = off)
    pub cooldown_windows: Option<u32>,
    /// Input device name (None = system default)
    pub input_device: Option<String>,
    /// Enable debug output
    pub debug: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            sample_rate: Some(DEFAULT_SAMPLE_RATE),
            window_secs: Some(DEFAULT_WINDOW_SECS),
            meter_width: Some(DEFAULT_METER_WIDTH),
            db_min: Some(DEFAULT_DB_MIN),
            db_max: Some(DEFAULT_DB_MAX),
            threshold: Some(DEFAULT_THRESHOLD),
            output_dir: Some(DEFAULT_OUTPUT_DIR.to_string()),
            backoff_ms: Some(DEFAULT_BACKOFF_MS),
            cooldown_windows: Some(DEFAULT_COOLDOWN_WINDOWS),
            input_device: None,
            debug: Some(DEFAULT_DEBUG),
        }
    }
}

impl AppConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        AppConfig::default()
    }

    /// Find the configuration file path
    fn find_config_file() -> Option<PathBuf> {
        // First check if a config file path is specified in the environment
        if let Ok(config_path) = env::var("SOUNDWATCH_CONFIG") {
            let path = Path::new(&config_path);
            if path.exists() {
                return Some(path.to_path_buf());
            }
        }

        // Search order:
        // 1. Current directory: "./soundwatch.toml"
        // 2. User's home directory: "~/.config/soundwatch/config.toml"
        // 3. XDG config directory
        // 4. System config: "/etc/soundwatch/config.toml"

        let current_dir = Path::new("soundwatch.toml");
        if current_dir.exists() {
            return Some(current_dir.to_path_buf());
        }

        if let Ok(home) = env::var("HOME") {
            let home_config = Path::new(&home).join(".config/soundwatch/config.toml");
            if home_config.exists() {
                return Some(home_config);
            }
        }

        if let Ok(xdg_config) = env::var("XDG_CONFIG_HOME") {
            let xdg_config_path = Path::new(&xdg_config).join("soundwatch/config.toml");
            if xdg_config_path.exists() {
                return Some(xdg_config_path);
            }
        }

        let system_config = Path::new("/etc/soundwatch/config.toml");
        if system_config.exists() {
            return Some(system_config.to_path_buf());
        }

        None
    }

    /// Load configuration from file, if available
    pub fn load() -> Self {
        let mut config = AppConfig::default();

        if let Some(config_path) = Self::find_config_file() {
            match fs::read_to_string(&config_path) {
                Ok(content) => match toml::from_str::<AppConfig>(&content) {
                    Ok(file_config) => {
                        info!("Loaded configuration from {}", config_path.display());
                        config.merge(file_config);
                    }
                    Err(e) => {
                        error!("Error parsing config file: {}", e);
                    }
                },
                Err(e) => {
                    error!("Error reading config file: {}", e);
                }
            }
        }

        // Override with environment variables
        config.apply_env_vars();

        config
    }

    /// Merge another configuration into this one, only taking values that are Some
    pub fn merge(&mut self, other: AppConfig) {
        if other.sample_rate.is_some() {
            self.sample_rate = other.sample_rate;
        }
        if other.window_secs.is_some() {
            self.window_secs = other.window_secs;
        }
        if other.meter_width.is_some() {
            self.meter_width = other.meter_width;
        }
        if other.db_min.is_some() {
            self.db_min = other.db_min;
        }
        if other.db_max.is_some() {
            self.db_max = other.db_max;
        }
        if other.threshold.is_some() {
            self.threshold = other.threshold;
        }
        if other.output_dir.is_some() {
            self.output_dir = other.output_dir;
        }
        if other.backoff_ms.is_some() {
            self.backoff_ms = other.backoff_ms;
        }
        if other.cooldown_windows.is_some() {
            self.cooldown_windows = other.cooldown_windows;
        }
        if other.input_device.is_some() {
            self.input_device = other.input_device;
        }
        if other.debug.is_some() {
            self.debug = other.debug;
        }
    }

    /// Parse a boolean value from a string
    fn parse_bool(val: &str) -> Option<bool> {
        match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        }
    }

    fn env_string(prefixed: &str, plain: &str) -> Option<String> {
        env::var(prefixed).ok().or_else(|| env::var(plain).ok())
    }

    fn env_parsed<T: std::str::FromStr>(prefixed: &str, plain: &str) -> Option<T> {
        Self::env_string(prefixed, plain).and_then(|s| s.parse().ok())
    }

    /// Apply environment variables to override configuration
    fn apply_env_vars(&mut self) {
        // Try both prefixed and unprefixed environment variables
        if let Some(val) = Self::env_parsed("SOUNDWATCH_SAMPLE_RATE", "SAMPLE_RATE") {
            self.sample_rate = Some(val);
        }
        if let Some(val) = Self::env_parsed("SOUNDWATCH_WINDOW_SECS", "WINDOW_SECS") {
            self.window_secs = Some(val);
        }
        if let Some(val) = Self::env_parsed("SOUNDWATCH_METER_WIDTH", "METER_WIDTH") {
            self.meter_width = Some(val);
        }
        if let Some(val) = Self::env_parsed("SOUNDWATCH_DB_MIN", "DB_MIN") {
            self.db_min = Some(val);
        }
        if let Some(val) = Self::env_parsed("SOUNDWATCH_DB_MAX", "DB_MAX") {
            self.db_max = Some(val);
        }
        if let Some(val) = Self::env_parsed("SOUNDWATCH_THRESHOLD", "DETECTION_THRESHOLD") {
            self.threshold = Some(val);
        }
        if let Some(val) = Self::env_string("SOUNDWATCH_OUTPUT_DIR", "OUTPUT_DIR") {
            self.output_dir = Some(val);
        }
        if let Some(val) = Self::env_parsed("SOUNDWATCH_BACKOFF_MS", "BACKOFF_MS") {
            self.backoff_ms = Some(val);
        }
        if let Some(val) = Self::env_parsed("SOUNDWATCH_COOLDOWN_WINDOWS", "COOLDOWN_WINDOWS") {
            self.cooldown_windows = Some(val);
        }
        if let Some(val) = Self::env_string("SOUNDWATCH_INPUT_DEVICE", "INPUT_DEVICE") {
            self.input_device = Some(val);
        }
        if let Some(val) =
            Self::env_string("SOUNDWATCH_DEBUG", "DEBUG").and_then(|s| Self::parse_bool(&s))
        {
            self.debug = Some(val);
        }
    }

    /// Generate a sample configuration file with comments
    pub fn generate_sample_config() -> String {
        let default_config = AppConfig::default();

        format!(
            r#"# Soundwatch Configuration
# This file configures the sound-event monitor.
# Values set here can be overridden by environment variables.

# Requested capture sample rate in Hz. If the input device does not
# support this rate, the device's native rate is adopted instead.
# Default: {}
sample_rate = {}

# Recording window duration in seconds
# Default: {}
window_secs = {}

# Width of the console level meter in columns
# Default: {}
meter_width = {}

# Displayed dB range
# Defaults: {} / {}
db_min = {}
db_max = {}

# Detection score above which a window is saved (0.0 - 1.0)
# Default: {}
threshold = {}

# Directory for saving event recordings
# Default: {}
output_dir = "{}"

# Wait after a recovered error before the next window, in milliseconds
# Default: {}
backoff_ms = {}

# Suppress saving for this many windows after a detection (0 disables)
# Default: {}
cooldown_windows = {}

# Input device name (omit for the system default)
# input_device = "USB Microphone"

# Enable debug output (true/false)
# Default: {}
debug = {}
"#,
            DEFAULT_SAMPLE_RATE,
            default_config.get_sample_rate(),
            DEFAULT_WINDOW_SECS,
            default_config.get_window_secs(),
            DEFAULT_METER_WIDTH,
            default_config.get_meter_width(),
            DEFAULT_DB_MIN,
            DEFAULT_DB_MAX,
            default_config.get_db_min(),
            default_config.get_db_max(),
            DEFAULT_THRESHOLD,
            default_config.get_threshold(),
            DEFAULT_OUTPUT_DIR,
            default_config.get_output_dir(),
            DEFAULT_BACKOFF_MS,
            default_config.get_backoff_ms(),
            DEFAULT_COOLDOWN_WINDOWS,
            default_config.get_cooldown_windows(),
            DEFAULT_DEBUG,
            default_config.get_debug()
        )
    }

    /// Create a configuration file in the specified location
    pub fn create_config_file(&self, path: &str) -> Result<(), SoundwatchError> {
        let config_content = Self::generate_sample_config();

        if let Some(parent) = Path::new(path).parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, config_content)?;

        Ok(())
    }

    // Accessor methods — env vars are already resolved by apply_env_vars() during load().
    // These just unwrap the Option with a default fallback.

    pub fn get_sample_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE)
    }

    pub fn get_window_secs(&self) -> f64 {
        self.window_secs.unwrap_or(DEFAULT_WINDOW_SECS)
    }

    pub fn get_meter_width(&self) -> usize {
        self.meter_width.unwrap_or(DEFAULT_METER_WIDTH)
    }

    pub fn get_db_min(&self) -> f32 {
        self.db_min.unwrap_or(DEFAULT_DB_MIN)
    }

    pub fn get_db_max(&self) -> f32 {
        self.db_max.unwrap_or(DEFAULT_DB_MAX)
    }

    pub fn get_threshold(&self) -> f32 {
        self.threshold.unwrap_or(DEFAULT_THRESHOLD)
    }

    pub fn get_output_dir(&self) -> String {
        self.output_dir
            .clone()
            .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string())
    }

    pub fn get_backoff_ms(&self) -> u64 {
        self.backoff_ms.unwrap_or(DEFAULT_BACKOFF_MS)
    }

    pub fn get_cooldown_windows(&self) -> u32 {
        self.cooldown_windows.unwrap_or(DEFAULT_COOLDOWN_WINDOWS)
    }

    pub fn get_input_device(&self) -> Option<String> {
        self.input_device.clone()
    }

    pub fn get_debug(&self) -> bool {
        self.debug.unwrap_or(DEFAULT_DEBUG)
    }
}
