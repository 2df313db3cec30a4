use std::time::Duration;

use anyhow::Result;
use tracing::trace;

use crate::avtransport_client::AvTransportClient;
use crate::model::{PlaybackState, PlayerSnapshot, SonosDevice};
use crate::music_source::MusicSource;
use crate::rendering_control_client::RenderingControlClient;
use crate::{DEFAULT_INSTANCE_ID, MASTER_CHANNEL};

/// What the display needs from a player.
pub trait PlayerStatus {
    /// Name shown on the status line
    fn player_name(&self) -> &str;

    /// Reads volume, music source and transport state in one go.
    fn poll(&mut self) -> Result<PlayerSnapshot>;
}

/// A Sonos zone player polled through RenderingControl and AVTransport.
pub struct SonosPlayer {
    device: SonosDevice,
    rendering_control: RenderingControlClient,
    avtransport: AvTransportClient,
}

impl SonosPlayer {
    pub fn new(device: SonosDevice, http_timeout: Duration) -> Self {
        let rendering_control = RenderingControlClient::new(
            device.rendering_control.control_url.clone(),
            device.rendering_control.service_type.clone(),
            http_timeout,
        );
        let avtransport = AvTransportClient::new(
            device.avtransport.control_url.clone(),
            device.avtransport.service_type.clone(),
            http_timeout,
        );

        Self {
            device,
            rendering_control,
            avtransport,
        }
    }

    pub fn device(&self) -> &SonosDevice {
        &self.device
    }
}

impl PlayerStatus for SonosPlayer {
    fn player_name(&self) -> &str {
        &self.device.room_name
    }

    fn poll(&mut self) -> Result<PlayerSnapshot> {
        let volume = self
            .rendering_control
            .get_volume(DEFAULT_INSTANCE_ID, MASTER_CHANNEL)?;
        let transport = self.avtransport.get_transport_info(DEFAULT_INSTANCE_ID)?;
        let position = self.avtransport.get_position_info(DEFAULT_INSTANCE_ID)?;

        let snapshot = PlayerSnapshot {
            volume,
            source: MusicSource::from_uri(&position.track_uri).to_string(),
            transport_state: PlaybackState::from_upnp_state(&transport.current_transport_state),
        };

        trace!(
            "{}: volume={} source={} state={}",
            self.device.room_name, snapshot.volume, snapshot.source, snapshot.transport_state
        );

        Ok(snapshot)
    }
}
