use std::fmt;

/// High-level playback state of a zone player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
    Transitioning,
    NoMedia,
    /// Vendor-specific or unknown state string, kept verbatim.
    Unknown(String),
}

impl PlaybackState {
    /// Map a raw UPnP AVTransport CurrentTransportState string
    /// to a logical PlaybackState. The match is exact and case sensitive.
    pub fn from_upnp_state(raw: &str) -> Self {
        match raw {
            "STOPPED" => PlaybackState::Stopped,
            "PLAYING" => PlaybackState::Playing,
            "PAUSED_PLAYBACK" => PlaybackState::Paused,
            "TRANSITIONING" => PlaybackState::Transitioning,
            "NO_MEDIA_PRESENT" => PlaybackState::NoMedia,
            _ => PlaybackState::Unknown(raw.to_string()),
        }
    }

    /// The AVTransport spelling of the state.
    pub fn as_str(&self) -> &str {
        match self {
            PlaybackState::Stopped => "STOPPED",
            PlaybackState::Playing => "PLAYING",
            PlaybackState::Paused => "PAUSED_PLAYBACK",
            PlaybackState::Transitioning => "TRANSITIONING",
            PlaybackState::NoMedia => "NO_MEDIA_PRESENT",
            PlaybackState::Unknown(s) => s.as_str(),
        }
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, PlaybackState::Stopped)
    }
}

/// Before the first poll nothing is known about the transport.
impl Default for PlaybackState {
    fn default() -> Self {
        PlaybackState::Unknown(String::new())
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observation of a player: what the display shows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlayerSnapshot {
    pub volume: u16,
    /// Music source label, see [`crate::MusicSource`]
    pub source: String,
    pub transport_state: PlaybackState,
}

/// Control endpoint of a UPnP service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceEndpoint {
    pub service_type: String,
    pub control_url: String,
}

/// A zone player found on the network.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SonosDevice {
    pub udn: String,
    /// Room name, the name users select the player by
    pub room_name: String,
    pub model_name: String,
    /// Device description URL
    pub location: String,
    pub avtransport: ServiceEndpoint,
    pub rendering_control: ServiceEndpoint,
    /// Used during discovery to drop satellites and paired speakers
    pub zone_group_topology: Option<ServiceEndpoint>,
}
