use std::time::Duration;

use anyhow::Result;
use ureq::Agent;
use xmltree::Element;

use crate::errors::ControlPointError;
use crate::soap_client::{action_response, extract_child_text, invoke_upnp_action, soap_agent};

#[derive(Debug, Clone)]
pub struct RenderingControlClient {
    pub control_url: String,
    pub service_type: String,
    agent: Agent,
}

impl RenderingControlClient {
    pub fn new(control_url: String, service_type: String, timeout: Duration) -> Self {
        Self {
            control_url,
            service_type,
            agent: soap_agent(timeout),
        }
    }

    /// RenderingControl:1 GetVolume
    pub fn get_volume(&self, instance_id: u32, channel: &str) -> Result<u16> {
        let instance_id_str = instance_id.to_string();
        let args = [
            ("InstanceID", instance_id_str.as_str()),
            ("Channel", channel),
        ];

        let call_result = invoke_upnp_action(
            &self.agent,
            &self.control_url,
            &self.service_type,
            "GetVolume",
            &args,
        )?;

        let response = action_response("GetVolume", &call_result)?;
        parse_volume(&response)
    }
}

fn parse_volume(response: &Element) -> Result<u16> {
    let text = extract_child_text(response, "CurrentVolume")?;
    let volume = text
        .parse::<u16>()
        .map_err(|_| ControlPointError::upnp_bad_return_value("CurrentVolume", &text))?;

    Ok(volume)
}
