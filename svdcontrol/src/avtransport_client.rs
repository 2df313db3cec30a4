use std::time::Duration;

use anyhow::Result;
use ureq::Agent;
use xmltree::Element;

use crate::soap_client::{
    action_response, extract_child_text, invoke_upnp_action, optional_child_text, soap_agent,
};

#[derive(Debug, Clone)]
pub struct AvTransportClient {
    pub control_url: String,
    pub service_type: String,
    agent: Agent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportInfo {
    pub current_transport_state: String,
    /// Informational, `None` when missing or empty
    pub current_transport_status: Option<String>,
    pub current_speed: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionInfo {
    pub track: Option<u32>,
    pub track_duration: Option<String>,
    /// URI of the current track, empty when nothing is loaded
    pub track_uri: String,
    pub rel_time: Option<String>,
}

impl AvTransportClient {
    pub fn new(control_url: String, service_type: String, timeout: Duration) -> Self {
        Self {
            control_url,
            service_type,
            agent: soap_agent(timeout),
        }
    }

    /// AVTransport:1 GetTransportInfo
    pub fn get_transport_info(&self, instance_id: u32) -> Result<TransportInfo> {
        let response = self.call("GetTransportInfo", instance_id)?;
        parse_transport_info(&response)
    }

    /// AVTransport:1 GetPositionInfo
    pub fn get_position_info(&self, instance_id: u32) -> Result<PositionInfo> {
        let response = self.call("GetPositionInfo", instance_id)?;
        Ok(parse_position_info(&response))
    }

    fn call(&self, action: &str, instance_id: u32) -> Result<Element> {
        let instance_id_str = instance_id.to_string();
        let args = [("InstanceID", instance_id_str.as_str())];

        let call_result = invoke_upnp_action(
            &self.agent,
            &self.control_url,
            &self.service_type,
            action,
            &args,
        )?;

        action_response(action, &call_result)
    }
}

fn parse_transport_info(response: &Element) -> Result<TransportInfo> {
    let non_empty = |name: &str| optional_child_text(response, name).filter(|t| !t.is_empty());

    Ok(TransportInfo {
        current_transport_state: extract_child_text(response, "CurrentTransportState")?,
        current_transport_status: non_empty("CurrentTransportStatus"),
        current_speed: non_empty("CurrentSpeed"),
    })
}

fn parse_position_info(response: &Element) -> PositionInfo {
    let non_empty = |name: &str| optional_child_text(response, name).filter(|t| !t.is_empty());

    PositionInfo {
        track: non_empty("Track").and_then(|t| t.parse().ok()),
        track_duration: non_empty("TrackDuration"),
        track_uri: optional_child_text(response, "TrackURI").unwrap_or_default(),
        rel_time: non_empty("RelTime"),
    }
}
