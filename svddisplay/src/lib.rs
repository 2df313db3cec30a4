//! Volume display for a Sonos zone player.
//!
//! Polls one player, renders its volume and status on a small screen and
//! dims the backlight when the player is idle. The pieces are usable on
//! their own: [`controller::DisplayController`] only needs a
//! [`svdcontrol::PlayerStatus`], a [`backlight::BacklightDriver`] and a
//! [`render::Composer`].

pub mod app;
pub mod backlight;
pub mod controller;
pub mod errors;
pub mod logs;
pub mod render;
pub mod settings;
pub mod status;

pub use app::{find_speaker, run};
pub use backlight::{Backlight, BacklightDriver, BacklightLevel, ShellBacklight};
pub use controller::{DisplayController, PollDelays};
pub use errors::DisplayError;
pub use render::{Composer, DisplayContent, Frame, TextRenderer};
pub use settings::{BacklightSettings, DisplaySettings};
pub use status::{StatusChange, StatusTracker, poll_delay};
