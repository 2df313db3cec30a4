use std::time::{Duration, Instant};

use anyhow::Result;
use svdcontrol::{PlayerSnapshot, PlayerStatus};
use tracing::info;

use crate::backlight::{Backlight, BacklightDriver, BacklightLevel};
use crate::render::{Composer, DisplayContent, Frame};
use crate::status::{StatusTracker, poll_delay};

/// Poll intervals while playing and while stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollDelays {
    pub active: Duration,
    pub idle: Duration,
}

/// State of the display between two polls.
///
/// The window owns one controller and calls [`DisplayController::tick`]
/// each time the poll delay elapses.
pub struct DisplayController<P, D, C>
where
    P: PlayerStatus,
    D: BacklightDriver,
    C: Composer,
{
    player: P,
    backlight: Backlight<D>,
    composer: C,
    tracker: StatusTracker,
    delays: PollDelays,
    delay: Duration,
    frame: Option<Frame>,
}

impl<P, D, C> DisplayController<P, D, C>
where
    P: PlayerStatus,
    D: BacklightDriver,
    C: Composer,
{
    pub fn new(player: P, backlight: Backlight<D>, composer: C, delays: PollDelays) -> Self {
        Self {
            player,
            backlight,
            composer,
            tracker: StatusTracker::new(),
            delays,
            delay: delays.active,
            frame: None,
        }
    }

    /// Backlight on and a first frame.
    ///
    /// The change baseline is left empty, so the first tick renders again.
    pub fn start(&mut self, now: Instant) -> Result<()> {
        self.backlight.set(BacklightLevel::High, now);
        let snapshot = self.player.poll()?;
        self.render(&snapshot)
    }

    /// One poll. Returns `true` when a new frame was rendered.
    pub fn tick(&mut self, now: Instant) -> Result<bool> {
        let snapshot = self.player.poll()?;
        self.backlight.update(&snapshot.transport_state, now);

        let Some(change) = self.tracker.observe(snapshot) else {
            return Ok(false);
        };

        info!(
            "Status change: source {} volume {} status {}",
            change.current.source, change.current.volume, change.current.transport_state
        );
        change.log();

        self.render(&change.current)?;
        Ok(true)
    }

    fn render(&mut self, snapshot: &PlayerSnapshot) -> Result<()> {
        let content = DisplayContent::from_snapshot(self.player.player_name(), snapshot);
        let frame = self.composer.compose(&content)?;
        info!("Display: Volume {} Player {}", content.volume, content.status);

        self.delay = poll_delay(
            &snapshot.transport_state,
            self.delays.active,
            self.delays.idle,
        );
        self.frame = Some(frame);
        Ok(())
    }

    /// Time to wait before the next tick.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Last rendered frame.
    pub fn frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    pub fn backlight(&self) -> &Backlight<D> {
        &self.backlight
    }

    pub fn composer(&self) -> &C {
        &self.composer
    }

    pub fn player(&self) -> &P {
        &self.player
    }
}
