//! Backlight control.
//!
//! Dims the screen when the player stops and switches it off after a
//! while. Any other state brings it back to full brightness.

use std::fmt;
use std::process::Command;
use std::time::{Duration, Instant};

use svdcontrol::PlaybackState;
use tracing::{debug, info, warn};

use crate::settings::BacklightSettings;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BacklightLevel {
    High,
    Low,
    Off,
}

impl BacklightLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            BacklightLevel::High => "high",
            BacklightLevel::Low => "low",
            BacklightLevel::Off => "off",
        }
    }
}

impl fmt::Display for BacklightLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Applies a backlight level to the hardware.
pub trait BacklightDriver {
    fn apply(&mut self, level: BacklightLevel);
}

/// Runs one shell command per level and waits for it.
pub struct ShellBacklight {
    low_command: String,
    high_command: String,
    off_command: String,
}

impl ShellBacklight {
    pub fn new(settings: &BacklightSettings) -> Self {
        Self {
            low_command: settings.low_command.clone(),
            high_command: settings.high_command.clone(),
            off_command: settings.off_command.clone(),
        }
    }

    pub fn command_for(&self, level: BacklightLevel) -> &str {
        match level {
            BacklightLevel::High => &self.high_command,
            BacklightLevel::Low => &self.low_command,
            BacklightLevel::Off => &self.off_command,
        }
    }
}

impl BacklightDriver for ShellBacklight {
    fn apply(&mut self, level: BacklightLevel) {
        let command = self.command_for(level);
        debug!("Backlight {}: {}", level, command);

        // sh expands the leading ~ of the default commands
        match Command::new("sh").arg("-c").arg(command).status() {
            Ok(status) if status.success() => {}
            Ok(status) => warn!("Backlight command {:?} exited with {}", command, status),
            Err(err) => warn!("Cannot run backlight command {:?}: {}", command, err),
        }
    }
}

/// Backlight state machine.
pub struct Backlight<D: BacklightDriver> {
    driver: D,
    enabled: bool,
    off_after: Duration,
    level: Option<BacklightLevel>,
    low_since: Option<Instant>,
}

impl<D: BacklightDriver> Backlight<D> {
    pub fn new(driver: D, enabled: bool, off_after: Duration) -> Self {
        Self {
            driver,
            enabled,
            off_after,
            level: None,
            low_since: None,
        }
    }

    /// Level last applied, `None` before the first command.
    pub fn level(&self) -> Option<BacklightLevel> {
        self.level
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Sets the level unconditionally. Does nothing when control is disabled.
    pub fn set(&mut self, level: BacklightLevel, now: Instant) {
        if !self.enabled {
            return;
        }

        info!("Backlight {}", level);
        self.driver.apply(level);
        self.level = Some(level);
        if level == BacklightLevel::Low {
            self.low_since = Some(now);
        }
    }

    /// Applies the dimming rules for the current transport state.
    pub fn update(&mut self, state: &PlaybackState, now: Instant) {
        if !self.enabled {
            return;
        }

        match (state.is_stopped(), self.level) {
            (true, Some(BacklightLevel::High)) => self.set(BacklightLevel::Low, now),
            (true, Some(BacklightLevel::Low)) => {
                let low_for = self
                    .low_since
                    .map(|since| now.saturating_duration_since(since))
                    .unwrap_or_default();
                if low_for > self.off_after {
                    self.set(BacklightLevel::Off, now);
                }
            }
            (false, level) if level != Some(BacklightLevel::High) => {
                self.set(BacklightLevel::High, now)
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        applied: Vec<BacklightLevel>,
    }

    impl BacklightDriver for Recorder {
        fn apply(&mut self, level: BacklightLevel) {
            self.applied.push(level);
        }
    }

    fn backlight(enabled: bool) -> Backlight<Recorder> {
        Backlight::new(Recorder::default(), enabled, Duration::from_secs(300))
    }

    #[test]
    fn stopped_dims_then_switches_off() {
        let t0 = Instant::now();
        let mut bl = backlight(true);
        bl.set(BacklightLevel::High, t0);

        bl.update(&PlaybackState::Stopped, t0);
        assert_eq!(bl.level(), Some(BacklightLevel::Low));

        bl.update(&PlaybackState::Stopped, t0 + Duration::from_secs(300));
        assert_eq!(bl.level(), Some(BacklightLevel::Low));

        bl.update(&PlaybackState::Stopped, t0 + Duration::from_secs(301));
        assert_eq!(bl.level(), Some(BacklightLevel::Off));

        bl.update(&PlaybackState::Stopped, t0 + Duration::from_secs(900));
        assert_eq!(
            bl.driver().applied,
            vec![BacklightLevel::High, BacklightLevel::Low, BacklightLevel::Off]
        );
    }

    #[test]
    fn activity_restores_high() {
        let t0 = Instant::now();
        let mut bl = backlight(true);
        bl.set(BacklightLevel::High, t0);
        bl.update(&PlaybackState::Stopped, t0);

        bl.update(&PlaybackState::Playing, t0 + Duration::from_secs(1));
        assert_eq!(bl.level(), Some(BacklightLevel::High));

        bl.update(&PlaybackState::Paused, t0 + Duration::from_secs(2));
        assert_eq!(
            bl.driver().applied,
            vec![BacklightLevel::High, BacklightLevel::Low, BacklightLevel::High]
        );
    }

    #[test]
    fn off_timer_restarts_after_activity() {
        let t0 = Instant::now();
        let mut bl = backlight(true);
        bl.set(BacklightLevel::High, t0);
        bl.update(&PlaybackState::Stopped, t0);
        bl.update(&PlaybackState::Playing, t0 + Duration::from_secs(200));
        bl.update(&PlaybackState::Stopped, t0 + Duration::from_secs(250));

        bl.update(&PlaybackState::Stopped, t0 + Duration::from_secs(400));
        assert_eq!(bl.level(), Some(BacklightLevel::Low));
    }

    #[test]
    fn off_goes_back_high_when_playing() {
        let t0 = Instant::now();
        let mut bl = backlight(true);
        bl.set(BacklightLevel::Off, t0);
        bl.update(&PlaybackState::Transitioning, t0);
        assert_eq!(bl.level(), Some(BacklightLevel::High));
    }

    #[test]
    fn disabled_control_never_runs_commands() {
        let t0 = Instant::now();
        let mut bl = backlight(false);
        bl.set(BacklightLevel::High, t0);
        bl.update(&PlaybackState::Playing, t0);
        bl.update(&PlaybackState::Stopped, t0);

        assert_eq!(bl.level(), None);
        assert!(bl.driver().applied.is_empty());
    }

    #[test]
    fn shell_backlight_picks_command_per_level() {
        let shell = ShellBacklight::new(&BacklightSettings {
            enabled: true,
            off_after: Duration::from_secs(300),
            low_command: "bl low".to_string(),
            high_command: "bl high".to_string(),
            off_command: "bl off".to_string(),
        });

        assert_eq!(shell.command_for(BacklightLevel::Low), "bl low");
        assert_eq!(shell.command_for(BacklightLevel::High), "bl high");
        assert_eq!(shell.command_for(BacklightLevel::Off), "bl off");
    }

    #[cfg(unix)]
    #[test]
    fn failing_shell_command_is_not_fatal() {
        let mut shell = ShellBacklight::new(&BacklightSettings {
            enabled: true,
            off_after: Duration::from_secs(300),
            low_command: "exit 3".to_string(),
            high_command: "true".to_string(),
            off_command: "true".to_string(),
        });

        shell.apply(BacklightLevel::Low);
        shell.apply(BacklightLevel::High);
    }
}
