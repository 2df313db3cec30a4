//! # SonosDisplay Configuration Module
//!
//! Read-only configuration for the Sonos display:
//! - embedded default configuration (`sonosdisplay.yaml`)
//! - merged with an optional `config.yaml` from the configuration directory
//! - environment variable overrides (`SONOSDISPLAY_CONFIG__SECTION__KEY=value`)
//! - typed getters falling back to defaults on missing or invalid values
//!
//! Nothing is ever written back to disk.
//!
//! ## Usage
//!
//! ```no_run
//! use svdconfig::Config;
//!
//! let config = Config::load_config("")?;
//! let width = config.get_display_width();
//! let device = config.get_default_device();
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{anyhow, Result};
use dirs::home_dir;
use serde_yaml::{Mapping, Value};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

// Embedded default configuration
const DEFAULT_CONFIG: &str = include_str!("sonosdisplay.yaml");

const ENV_CONFIG_DIR: &str = "SONOSDISPLAY_CONFIG";
const ENV_PREFIX: &str = "SONOSDISPLAY_CONFIG__";
const CONFIG_DIR_NAME: &str = ".sonosdisplay";
const CONFIG_FILE_NAME: &str = "config.yaml";

// Default values, used when a key is missing or has the wrong type
const DEFAULT_DISPLAY_WIDTH: u32 = 320;
const DEFAULT_DISPLAY_HEIGHT: u32 = 240;
const DEFAULT_FULLSCREEN: bool = true;
const DEFAULT_FONT: &str = "/usr/share/fonts/truetype/freefont/FreeSansBold.ttf";
const DEFAULT_VOLUME_FONT_SIZE: u32 = 200;
const DEFAULT_STATUS_FONT_SIZE: u32 = 24;
const DEFAULT_DELAY_ACTIVE_MS: u64 = 250;
const DEFAULT_DELAY_IDLE_MS: u64 = 1000;
const DEFAULT_BACKLIGHT_ENABLED: bool = true;
const DEFAULT_BACKLIGHT_OFF_AFTER_SECS: u64 = 300;
const DEFAULT_BACKLIGHT_LOW: &str = "~/pitft22-backlight low";
const DEFAULT_BACKLIGHT_HIGH: &str = "~/pitft22-backlight high";
const DEFAULT_BACKLIGHT_OFF: &str = "~/pitft22-backlight off";
const DEFAULT_DEVICE: &str = "Living Room";
const DEFAULT_DISCOVERY_TIMEOUT_SECS: u64 = 5;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 5;
const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_LOG_ENABLE_CONSOLE: bool = true;
const DEFAULT_LOG_ENABLE_SYSLOG: bool = true;

/// Generates a getter for an unsigned integer value with default
macro_rules! impl_uint_config {
    ($getter:ident, $ty:ty, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> $ty {
            let path: &[&str] = $path;
            match self.get_value(path) {
                Ok(Value::Number(n)) => match n.as_u64().and_then(|v| <$ty>::try_from(v).ok()) {
                    Some(v) => v,
                    None => {
                        warn!(key = %path.join("."), value = %n, "Out of range, using default {}", $default);
                        $default
                    }
                },
                Ok(Value::String(s)) => s.trim().parse::<$ty>().unwrap_or_else(|_| {
                    warn!(key = %path.join("."), value = %s, "Not a number, using default {}", $default);
                    $default
                }),
                _ => $default,
            }
        }
    };
}

/// Generates a getter for a bool value with default
macro_rules! impl_bool_config {
    ($getter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> bool {
            match self.get_value($path) {
                Ok(Value::Bool(b)) => b,
                _ => $default,
            }
        }
    };
}

/// Generates a getter for a string value with default
macro_rules! impl_string_config {
    ($getter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> String {
            match self.get_value($path) {
                Ok(Value::String(s)) if !s.is_empty() => s,
                Ok(Value::Number(n)) => n.to_string(),
                _ => $default.to_string(),
            }
        }
    };
}

/// Configuration of the Sonos display
///
/// Holds the merged YAML tree (defaults, file, environment) and exposes
/// typed getters for every setting the display uses.
#[derive(Debug, Clone)]
pub struct Config {
    path: Option<PathBuf>,
    data: Value,
}

impl Config {
    /// Finds the configuration directory, in order:
    /// 1. the provided `directory` if not empty
    /// 2. the `SONOSDISPLAY_CONFIG` environment variable
    /// 3. `.sonosdisplay` in the current directory
    /// 4. `.sonosdisplay` in the user's home directory
    fn find_config_dir(directory: &str) -> Option<PathBuf> {
        if !directory.is_empty() {
            return Some(PathBuf::from(directory));
        }

        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %env_path, "Trying to load config from env");
            return Some(PathBuf::from(env_path));
        }

        let local = Path::new(CONFIG_DIR_NAME);
        if local.is_dir() {
            return Some(local.to_path_buf());
        }

        home_dir()
            .map(|home| home.join(CONFIG_DIR_NAME))
            .filter(|p| p.is_dir())
    }

    /// Loads the configuration
    ///
    /// 1. determines the configuration directory (see [`Config::find_config_dir`])
    /// 2. parses the embedded default configuration
    /// 3. merges `config.yaml` from that directory when it exists
    /// 4. applies `SONOSDISPLAY_CONFIG__*` environment overrides
    pub fn load_config(directory: &str) -> Result<Self> {
        let path = Self::find_config_dir(directory).map(|dir| dir.join(CONFIG_FILE_NAME));

        let external = match &path {
            Some(p) if p.is_file() => {
                info!(config_file = %p.display(), "Loaded config file");
                Some(fs::read_to_string(p)?)
            }
            Some(p) => {
                info!(config_file = %p.display(), "Config file not found, using embedded defaults");
                None
            }
            None => {
                info!("No config directory, using embedded defaults");
                None
            }
        };

        let mut config = Self::from_yaml_overlay(external.as_deref())?;
        Self::apply_env_overrides(&mut config.data, env::vars());
        config.path = path;
        Ok(config)
    }

    /// Builds a configuration from the embedded defaults and an optional YAML overlay.
    ///
    /// Environment variables are not consulted.
    pub fn from_yaml_overlay(overlay: Option<&str>) -> Result<Self> {
        let mut value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;

        if let Some(yaml) = overlay.filter(|y| !y.trim().is_empty()) {
            let external: Value = serde_yaml::from_str(yaml)?;
            if !external.is_null() {
                merge_yaml(&mut value, &Self::lower_keys_value(external));
            }
        }

        Ok(Self {
            path: None,
            data: Self::lower_keys_value(value),
        })
    }

    /// Path of the `config.yaml` that was looked up, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Gets a configuration value at the specified path
    ///
    /// # Arguments
    ///
    /// * `path` - keys from the root (e.g. `&["display", "width"]`), case-insensitive
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let mut current = &self.data;
        for (i, key) in path.iter().enumerate() {
            if let Value::Mapping(map) = current {
                let key = key.to_lowercase();
                match map.get(&Value::String(key)) {
                    Some(next) => current = next,
                    None => return Err(anyhow!("Path {} does not exist", path[..=i].join("."))),
                }
            } else {
                return Err(anyhow!("Path {} is not a mapping", path[..i].join(".")));
            }
        }
        Ok(current.clone())
    }

    fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
        if path.is_empty() {
            *data = value;
            return Ok(());
        }
        if let Value::Mapping(map) = data {
            let key_value = Value::String(path[0].to_lowercase());
            if path.len() == 1 {
                map.insert(key_value, value);
            } else {
                let entry = map
                    .entry(key_value)
                    .or_insert(Value::Mapping(Mapping::new()));
                Self::set_value_internal(entry, &path[1..], value)?;
            }
            Ok(())
        } else {
            Err(anyhow!("Current node is not a map"))
        }
    }

    fn apply_env_overrides<I>(config: &mut Value, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(rest) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let key_path = rest.split("__").collect::<Vec<_>>();
            let yaml_value = Self::convert_env_value(&value);
            if let Err(e) = Self::set_value_internal(config, &key_path, yaml_value) {
                warn!(env_var = %key, "Ignoring environment override: {}", e);
            }
        }
    }

    fn convert_env_value(value: &str) -> Value {
        match serde_yaml::from_str::<Value>(value) {
            Ok(parsed) if !parsed.is_null() => parsed,
            _ => Value::String(value.to_string()),
        }
    }

    fn lower_keys_value(value: Value) -> Value {
        match value {
            Value::Mapping(map) => {
                let mut new_map = Mapping::new();
                for (k, v) in map {
                    let k = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    new_map.insert(k, Self::lower_keys_value(v));
                }
                Value::Mapping(new_map)
            }
            Value::Sequence(seq) => {
                Value::Sequence(seq.into_iter().map(Self::lower_keys_value).collect())
            }
            _ => value,
        }
    }

    // display
    impl_uint_config!(get_display_width, u32, &["display", "width"], DEFAULT_DISPLAY_WIDTH);
    impl_uint_config!(get_display_height, u32, &["display", "height"], DEFAULT_DISPLAY_HEIGHT);
    impl_bool_config!(get_fullscreen, &["display", "fullscreen"], DEFAULT_FULLSCREEN);
    impl_string_config!(get_font_path, &["display", "font"], DEFAULT_FONT);
    impl_uint_config!(
        get_volume_font_size,
        u32,
        &["display", "volume_font_size"],
        DEFAULT_VOLUME_FONT_SIZE
    );
    impl_uint_config!(
        get_status_font_size,
        u32,
        &["display", "status_font_size"],
        DEFAULT_STATUS_FONT_SIZE
    );

    // polling
    impl_uint_config!(
        get_delay_active_ms,
        u64,
        &["polling", "delay_active_ms"],
        DEFAULT_DELAY_ACTIVE_MS
    );
    impl_uint_config!(
        get_delay_idle_ms,
        u64,
        &["polling", "delay_idle_ms"],
        DEFAULT_DELAY_IDLE_MS
    );

    // backlight
    impl_bool_config!(get_backlight_enabled, &["backlight", "enabled"], DEFAULT_BACKLIGHT_ENABLED);
    impl_uint_config!(
        get_backlight_off_after_secs,
        u64,
        &["backlight", "off_after_secs"],
        DEFAULT_BACKLIGHT_OFF_AFTER_SECS
    );
    impl_string_config!(get_backlight_low_command, &["backlight", "low_command"], DEFAULT_BACKLIGHT_LOW);
    impl_string_config!(
        get_backlight_high_command,
        &["backlight", "high_command"],
        DEFAULT_BACKLIGHT_HIGH
    );
    impl_string_config!(get_backlight_off_command, &["backlight", "off_command"], DEFAULT_BACKLIGHT_OFF);

    // sonos
    impl_string_config!(get_default_device, &["sonos", "default_device"], DEFAULT_DEVICE);
    impl_uint_config!(
        get_discovery_timeout_secs,
        u64,
        &["sonos", "discovery_timeout_secs"],
        DEFAULT_DISCOVERY_TIMEOUT_SECS
    );
    impl_uint_config!(
        get_http_timeout_secs,
        u64,
        &["sonos", "http_timeout_secs"],
        DEFAULT_HTTP_TIMEOUT_SECS
    );

    // logging
    impl_string_config!(get_log_min_level, &["logging", "min_level"], DEFAULT_LOG_MIN_LEVEL);
    impl_bool_config!(
        get_log_enable_console,
        &["logging", "enable_console"],
        DEFAULT_LOG_ENABLE_CONSOLE
    );
    impl_bool_config!(
        get_log_enable_syslog,
        &["logging", "enable_syslog"],
        DEFAULT_LOG_ENABLE_SYSLOG
    );
}

/// Merges external YAML configuration into default configuration
///
/// Mappings are merged key by key; scalars and sequences from `external`
/// replace the default.
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}
