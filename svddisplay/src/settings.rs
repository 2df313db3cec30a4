use std::path::PathBuf;
use std::time::Duration;

use svdcontrol::DiscoveryOptions;
use svdconfig::Config;

/// Backlight part of the settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BacklightSettings {
    pub enabled: bool,
    /// Time spent at low level before switching off
    pub off_after: Duration,
    pub low_command: String,
    pub high_command: String,
    pub off_command: String,
}

/// Everything the display reads from the configuration, resolved once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySettings {
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
    pub font_path: PathBuf,
    pub volume_font_size: f32,
    pub status_font_size: f32,
    pub delay_active: Duration,
    pub delay_idle: Duration,
    pub backlight: BacklightSettings,
    pub discovery: DiscoveryOptions,
}

impl DisplaySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            width: config.get_display_width().max(1),
            height: config.get_display_height().max(1),
            fullscreen: config.get_fullscreen(),
            font_path: PathBuf::from(config.get_font_path()),
            volume_font_size: config.get_volume_font_size() as f32,
            status_font_size: config.get_status_font_size() as f32,
            delay_active: Duration::from_millis(config.get_delay_active_ms()),
            delay_idle: Duration::from_millis(config.get_delay_idle_ms()),
            backlight: BacklightSettings {
                enabled: config.get_backlight_enabled(),
                off_after: Duration::from_secs(config.get_backlight_off_after_secs()),
                low_command: config.get_backlight_low_command(),
                high_command: config.get_backlight_high_command(),
                off_command: config.get_backlight_off_command(),
            },
            discovery: DiscoveryOptions {
                timeout: Duration::from_secs(config.get_discovery_timeout_secs()),
                http_timeout: Duration::from_secs(config.get_http_timeout_secs()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_kiosk_screen() {
        let settings = DisplaySettings::from_config(&Config::from_yaml_overlay(None).unwrap());

        assert_eq!((settings.width, settings.height), (320, 240));
        assert!(settings.fullscreen);
        assert_eq!(settings.volume_font_size, 200.0);
        assert_eq!(settings.status_font_size, 24.0);
        assert_eq!(settings.delay_active, Duration::from_millis(250));
        assert_eq!(settings.delay_idle, Duration::from_millis(1000));
        assert!(settings.backlight.enabled);
        assert_eq!(settings.backlight.off_after, Duration::from_secs(300));
        assert_eq!(settings.backlight.low_command, "~/pitft22-backlight low");
        assert_eq!(settings.discovery.timeout, Duration::from_secs(5));
    }

    #[test]
    fn overlay_changes_settings() {
        let config = Config::from_yaml_overlay(Some(
            "display:\n  width: 480\n  fullscreen: false\npolling:\n  delay_idle_ms: 2000\nbacklight:\n  enabled: false\n",
        ))
        .unwrap();
        let settings = DisplaySettings::from_config(&config);

        assert_eq!(settings.width, 480);
        assert_eq!(settings.height, 240);
        assert!(!settings.fullscreen);
        assert_eq!(settings.delay_idle, Duration::from_secs(2));
        assert!(!settings.backlight.enabled);
    }
}
