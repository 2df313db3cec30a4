//! Sonos control point used by the volume display.
//!
//! Discovers zone players over SSDP, reads their device description and
//! polls volume, transport state and music source through the UPnP
//! RenderingControl and AVTransport services. Players hidden by the zone
//! group topology (satellites, subwoofers, the second speaker of a pair)
//! are not offered.

pub mod avtransport_client;
pub mod description;
pub mod discovery;
pub mod errors;
pub mod model;
pub mod music_source;
pub mod player;
pub mod rendering_control_client;
pub mod soap_client;
pub mod zone_group_topology_client;

use std::time::Duration;

pub use avtransport_client::{AvTransportClient, PositionInfo, TransportInfo};
pub use description::{DescriptionError, fetch_device_description, parse_device_description};
pub use discovery::{DeviceDiscovery, DiscoveryOptions, SsdpDiscovery, find_by_name};
pub use errors::ControlPointError;
pub use model::{PlaybackState, PlayerSnapshot, ServiceEndpoint, SonosDevice};
pub use music_source::MusicSource;
pub use player::{PlayerStatus, SonosPlayer};
pub use rendering_control_client::RenderingControlClient;
pub use soap_client::invoke_upnp_action;
pub use zone_group_topology_client::{ZoneGroupTopologyClient, invisible_members};

/// Search target answered by every Sonos zone player
pub const ZONE_PLAYER_ST: &str = "urn:schemas-upnp-org:device:ZonePlayer:1";

/// AVTransport / RenderingControl instance used by Sonos
pub const DEFAULT_INSTANCE_ID: u32 = 0;

/// RenderingControl channel for the overall volume
pub const MASTER_CHANNEL: &str = "Master";

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);
