use std::collections::HashSet;
use std::time::Duration;

use anyhow::Result;
use svdupnp::ssdp::{SsdpClient, SsdpEvent};
use tracing::{debug, info, warn};
use ureq::Agent;

use crate::description::fetch_device_description;
use crate::errors::ControlPointError;
use crate::model::SonosDevice;
use crate::zone_group_topology_client::{ZoneGroupTopologyClient, invisible_members};
use crate::{DEFAULT_HTTP_TIMEOUT, ZONE_PLAYER_ST};

/// Timing of a discovery round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// How long SSDP answers are collected
    pub timeout: Duration,
    /// Timeout for each description fetch
    pub http_timeout: Duration,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

/// Source of the zone players visible on the network.
pub trait DeviceDiscovery {
    fn discover(&self) -> Result<Vec<SonosDevice>>;
}

/// Discovery through an SSDP M-SEARCH for zone players.
///
/// Only visible players are returned: members the zone group topology marks
/// invisible share the room name of the player they belong to.
pub struct SsdpDiscovery {
    options: DiscoveryOptions,
}

impl SsdpDiscovery {
    pub fn new(options: DiscoveryOptions) -> Self {
        Self { options }
    }

    /// Asks the first player exposing ZoneGroupTopology for the household
    /// topology. Every player reports the whole household.
    fn invisible_players(&self, devices: &[SonosDevice]) -> Result<HashSet<String>> {
        let Some(endpoint) = devices.iter().find_map(|d| d.zone_group_topology.as_ref()) else {
            return Ok(HashSet::new());
        };

        let client = ZoneGroupTopologyClient::new(
            endpoint.control_url.clone(),
            endpoint.service_type.clone(),
            self.options.http_timeout,
        );
        let state = client.get_zone_group_state()?;
        let invisible = invisible_members(&state)?;
        debug!("Invisible zone members: {:?}", invisible);
        Ok(invisible)
    }
}

impl DeviceDiscovery for SsdpDiscovery {
    fn discover(&self) -> Result<Vec<SonosDevice>> {
        let client = SsdpClient::new()
            .map_err(|e| ControlPointError::Discovery(format!("cannot open SSDP socket: {}", e)))?;

        let mx = self.options.timeout.as_secs().clamp(1, 5) as u32;
        client
            .send_msearch(ZONE_PLAYER_ST, mx)
            .map_err(|e| ControlPointError::Discovery(format!("M-SEARCH failed: {}", e)))?;

        let events = client
            .collect_events(self.options.timeout)
            .map_err(|e| ControlPointError::Discovery(format!("SSDP receive failed: {}", e)))?;

        let candidates = zone_player_locations(&events);
        debug!(
            "{} SSDP messages, {} zone player candidates",
            events.len(),
            candidates.len()
        );

        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(self.options.http_timeout))
            .build()
            .into();

        let mut devices = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            match fetch_device_description(&agent, &candidate.location) {
                Ok(device) => {
                    debug!(
                        "Found {} ({}) at {}, server {}",
                        device.room_name, device.model_name, candidate.location, candidate.server
                    );
                    devices.push(device);
                }
                Err(err) => {
                    warn!("Skipping {} at {}: {}", candidate.udn, candidate.location, err);
                }
            }
        }

        let devices = match self.invisible_players(&devices) {
            Ok(invisible) => visible_only(devices, &invisible),
            Err(err) => {
                warn!("Cannot read zone group state, keeping every player: {:#}", err);
                devices
            }
        };

        info!("Discovered {} zone players", devices.len());
        Ok(devices)
    }
}

/// Drops the players whose UDN is among the `invisible` zone member UUIDs.
fn visible_only(devices: Vec<SonosDevice>, invisible: &HashSet<String>) -> Vec<SonosDevice> {
    devices
        .into_iter()
        .filter(|d| {
            let uuid = d.udn.strip_prefix("uuid:").unwrap_or(&d.udn);
            let hidden = invisible.contains(uuid);
            if hidden {
                debug!("Ignoring invisible {} in {}", d.udn, d.room_name);
            }
            !hidden
        })
        .collect()
}

/// Exact room name match. With several players in one room the first wins.
pub fn find_by_name(devices: Vec<SonosDevice>, name: &str) -> Option<SonosDevice> {
    devices.into_iter().find(|d| d.room_name == name)
}

#[derive(Debug, PartialEq, Eq)]
struct Candidate {
    udn: String,
    location: String,
    server: String,
}

/// Every zone player that answered, once per UDN.
fn zone_player_locations(events: &[SsdpEvent]) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for event in events {
        if !event.device_type().eq_ignore_ascii_case(ZONE_PLAYER_ST) {
            continue;
        }
        let Some(location) = event.location() else {
            continue;
        };
        let udn = extract_udn_from_usn(event.usn());

        if seen.insert(udn.clone()) {
            out.push(Candidate {
                udn,
                location: location.to_string(),
                server: event.server().unwrap_or_default().to_string(),
            });
        }
    }

    out
}

/// "uuid:RINCON_xxx::urn:..." -> "uuid:RINCON_xxx"
fn extract_udn_from_usn(usn: &str) -> String {
    usn.split("::").next().unwrap_or(usn).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    use crate::model::ServiceEndpoint;

    fn from() -> SocketAddr {
        "192.168.1.20:1400".parse().unwrap()
    }

    fn response(udn: &str, st: &str, location: &str) -> SsdpEvent {
        SsdpEvent::SearchResponse {
            usn: format!("{}::{}", udn, st),
            st: st.to_string(),
            location: location.to_string(),
            server: "Linux UPnP/1.0 Sonos/70.3-35220 (ZPS12)".to_string(),
            from: from(),
        }
    }

    fn device(udn: &str, room: &str) -> SonosDevice {
        let endpoint = |st: &str| ServiceEndpoint {
            service_type: st.to_string(),
            control_url: "http://192.168.1.20:1400/ctl".to_string(),
        };
        SonosDevice {
            udn: udn.to_string(),
            room_name: room.to_string(),
            model_name: "Sonos One".to_string(),
            location: "http://192.168.1.20:1400/xml/device_description.xml".to_string(),
            avtransport: endpoint("urn:schemas-upnp-org:service:AVTransport:1"),
            rendering_control: endpoint("urn:schemas-upnp-org:service:RenderingControl:1"),
            zone_group_topology: Some(endpoint("urn:schemas-upnp-org:service:ZoneGroupTopology:1")),
        }
    }

    #[test]
    fn candidates_are_deduplicated_by_udn() {
        let events = vec![
            response("uuid:RINCON_A", ZONE_PLAYER_ST, "http://10.0.0.1:1400/d.xml"),
            response("uuid:RINCON_A", ZONE_PLAYER_ST, "http://10.0.0.1:1400/d.xml"),
            response("uuid:RINCON_B", ZONE_PLAYER_ST, "http://10.0.0.2:1400/d.xml"),
        ];

        let candidates = zone_player_locations(&events);
        let found: Vec<(&str, &str)> = candidates
            .iter()
            .map(|c| (c.udn.as_str(), c.location.as_str()))
            .collect();
        assert_eq!(
            found,
            vec![
                ("uuid:RINCON_A", "http://10.0.0.1:1400/d.xml"),
                ("uuid:RINCON_B", "http://10.0.0.2:1400/d.xml"),
            ]
        );
        assert_eq!(candidates[0].server, "Linux UPnP/1.0 Sonos/70.3-35220 (ZPS12)");
    }

    #[test]
    fn other_devices_and_byebye_are_ignored() {
        let events = vec![
            response(
                "uuid:tv",
                "urn:schemas-upnp-org:device:MediaRenderer:1",
                "http://10.0.0.9/d.xml",
            ),
            SsdpEvent::ByeBye {
                usn: format!("uuid:RINCON_C::{}", ZONE_PLAYER_ST),
                nt: ZONE_PLAYER_ST.to_string(),
                from: from(),
            },
        ];

        assert!(zone_player_locations(&events).is_empty());
    }

    #[test]
    fn usn_to_udn() {
        assert_eq!(
            extract_udn_from_usn("uuid:RINCON_A::urn:schemas-upnp-org:device:ZonePlayer:1"),
            "uuid:RINCON_A"
        );
        assert_eq!(extract_udn_from_usn("uuid:RINCON_A"), "uuid:RINCON_A");
    }

    #[test]
    fn find_by_name_matches_exact_room() {
        let devices = vec![device("uuid:A", "Kitchen"), device("uuid:B", "Living Room")];

        assert_eq!(
            find_by_name(devices.clone(), "Living Room").map(|d| d.udn),
            Some("uuid:B".to_string())
        );
        assert!(find_by_name(devices.clone(), "living room").is_none());
        assert!(find_by_name(devices, "Bedroom").is_none());
    }

    #[test]
    fn find_by_name_first_match_wins() {
        let devices = vec![device("uuid:A", "Office"), device("uuid:B", "Office")];
        assert_eq!(find_by_name(devices, "Office").unwrap().udn, "uuid:A");
    }

    #[test]
    fn invisible_satellite_answering_first_is_not_selected() {
        let state = r#"<ZoneGroupState><ZoneGroups>
            <ZoneGroup Coordinator="RINCON_BEAM" ID="RINCON_BEAM:1">
              <ZoneGroupMember UUID="RINCON_BEAM" ZoneName="Living Room">
                <Satellite UUID="RINCON_SUB" ZoneName="Living Room" Invisible="1"/>
              </ZoneGroupMember>
            </ZoneGroup>
          </ZoneGroups></ZoneGroupState>"#;
        let devices = vec![
            device("uuid:RINCON_SUB", "Living Room"),
            device("uuid:RINCON_BEAM", "Living Room"),
            device("uuid:RINCON_KITCHEN", "Kitchen"),
        ];

        let visible = visible_only(devices, &invisible_members(state).unwrap());

        assert_eq!(visible.len(), 2);
        assert_eq!(
            find_by_name(visible, "Living Room").map(|d| d.udn).as_deref(),
            Some("uuid:RINCON_BEAM")
        );
    }

    #[test]
    fn unknown_topology_keeps_every_player() {
        let devices = vec![device("uuid:RINCON_A", "Office"), device("uuid:RINCON_B", "Office")];
        assert_eq!(visible_only(devices.clone(), &HashSet::new()), devices);
    }
}
