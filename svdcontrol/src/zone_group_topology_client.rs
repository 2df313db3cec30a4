use std::collections::HashSet;
use std::time::Duration;

use anyhow::{Context, Result};
use ureq::Agent;
use xmltree::{Element, XMLNode};

use crate::soap_client::{action_response, extract_child_text, invoke_upnp_action, soap_agent};

#[derive(Debug, Clone)]
pub struct ZoneGroupTopologyClient {
    pub control_url: String,
    pub service_type: String,
    agent: Agent,
}

impl ZoneGroupTopologyClient {
    pub fn new(control_url: String, service_type: String, timeout: Duration) -> Self {
        Self {
            control_url,
            service_type,
            agent: soap_agent(timeout),
        }
    }

    /// ZoneGroupTopology:1 GetZoneGroupState, the unescaped state document
    pub fn get_zone_group_state(&self) -> Result<String> {
        let call_result = invoke_upnp_action(
            &self.agent,
            &self.control_url,
            &self.service_type,
            "GetZoneGroupState",
            &[],
        )?;

        let response = action_response("GetZoneGroupState", &call_result)?;
        extract_child_text(&response, "ZoneGroupState")
    }
}

/// UUIDs (`RINCON_...`, without the `uuid:` prefix) of the members flagged
/// `Invisible="1"` in a zone group state.
///
/// Satellites of a home theatre, subwoofers and the second speaker of a
/// stereo pair are invisible. Both the `<ZoneGroupState><ZoneGroups>` layout
/// and the older bare `<ZoneGroups>` one are accepted.
pub fn invisible_members(zone_group_state: &str) -> Result<HashSet<String>> {
    let root = Element::parse(zone_group_state.as_bytes())
        .context("ZoneGroupState is not valid XML")?;

    let mut invisible = HashSet::new();
    collect_invisible(&root, &mut invisible);
    Ok(invisible)
}

fn collect_invisible(element: &Element, out: &mut HashSet<String>) {
    if matches!(element.name.as_str(), "ZoneGroupMember" | "Satellite")
        && element.attributes.get("Invisible").map(String::as_str) == Some("1")
    {
        if let Some(uuid) = element.attributes.get("UUID") {
            out.insert(uuid.clone());
        }
    }

    for node in &element.children {
        if let XMLNode::Element(child) = node {
            collect_invisible(child, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soap_client::tests::{call_result, envelope_with};

    const STATE: &str = r#"<ZoneGroupState><ZoneGroups>
  <ZoneGroup Coordinator="RINCON_BEAM01400" ID="RINCON_BEAM01400:12">
    <ZoneGroupMember UUID="RINCON_BEAM01400" Location="http://10.0.0.10:1400/xml/device_description.xml" ZoneName="Living Room" HTSatChanMapSet="RINCON_BEAM01400:LF,RF;RINCON_SUB01400:SW">
      <Satellite UUID="RINCON_SUB01400" Location="http://10.0.0.11:1400/xml/device_description.xml" ZoneName="Living Room" Invisible="1"/>
    </ZoneGroupMember>
  </ZoneGroup>
  <ZoneGroup Coordinator="RINCON_LEFT01400" ID="RINCON_LEFT01400:3">
    <ZoneGroupMember UUID="RINCON_LEFT01400" ZoneName="Office" ChannelMapSet="RINCON_LEFT01400:LF,LF;RINCON_RIGHT01400:RF,RF"/>
    <ZoneGroupMember UUID="RINCON_RIGHT01400" ZoneName="Office" Invisible="1"/>
  </ZoneGroup>
  <ZoneGroup Coordinator="RINCON_KITCHEN01400" ID="RINCON_KITCHEN01400:7">
    <ZoneGroupMember UUID="RINCON_KITCHEN01400" ZoneName="Kitchen" Invisible="0"/>
  </ZoneGroup>
</ZoneGroups><VanishedDevices></VanishedDevices></ZoneGroupState>"#;

    #[test]
    fn satellites_and_paired_speakers_are_invisible() {
        let invisible = invisible_members(STATE).unwrap();

        let expected: HashSet<String> = ["RINCON_SUB01400", "RINCON_RIGHT01400"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(invisible, expected);
    }

    #[test]
    fn accepts_bare_zone_groups_root() {
        let xml = r#"<ZoneGroups><ZoneGroup Coordinator="RINCON_A" ID="RINCON_A:1">
            <ZoneGroupMember UUID="RINCON_A" ZoneName="Den"/>
            <ZoneGroupMember UUID="RINCON_B" ZoneName="Den" Invisible="1"/>
          </ZoneGroup></ZoneGroups>"#;

        let invisible = invisible_members(xml).unwrap();
        assert!(invisible.contains("RINCON_B"));
        assert_eq!(invisible.len(), 1);
    }

    #[test]
    fn rejects_broken_state() {
        assert!(invisible_members("<ZoneGroups><ZoneGroup>").is_err());
    }

    #[test]
    fn state_is_unescaped_from_the_response() {
        let escaped = STATE
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;");
        let body = envelope_with(&format!(
            r#"<u:GetZoneGroupStateResponse xmlns:u="urn:schemas-upnp-org:service:ZoneGroupTopology:1"><ZoneGroupState>{}</ZoneGroupState></u:GetZoneGroupStateResponse>"#,
            escaped
        ));
        let response = action_response("GetZoneGroupState", &call_result(200, &body)).unwrap();

        let state = extract_child_text(&response, "ZoneGroupState").unwrap();
        assert!(invisible_members(&state).unwrap().contains("RINCON_SUB01400"));
    }
}
