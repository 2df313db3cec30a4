use thiserror::Error;
use tracing::debug;
use ureq::Agent;
use xmltree::{Element, XMLNode};

use crate::model::{ServiceEndpoint, SonosDevice};

const AVTRANSPORT_URN: &str = "urn:schemas-upnp-org:service:avtransport:";
const RENDERING_CONTROL_URN: &str = "urn:schemas-upnp-org:service:renderingcontrol:";
const ZONE_GROUP_TOPOLOGY_URN: &str = "urn:schemas-upnp-org:service:zonegrouptopology:";

#[derive(Debug, Error)]
pub enum DescriptionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] ureq::Error),

    #[error("XML parsing error: {0}")]
    Xml(#[from] xmltree::ParseError),

    #[error("Missing required device element: {0}")]
    MissingField(&'static str),

    #[error("Device has no {0} service")]
    MissingService(&'static str),
}

/// GETs the description at `location` and parses it.
pub fn fetch_device_description(
    agent: &Agent,
    location: &str,
) -> Result<SonosDevice, DescriptionError> {
    debug!("Fetching description at {}", location);

    let mut response = agent.get(location).call()?;
    let xml = response.body_mut().read_to_string()?;

    parse_device_description(&xml, location)
}

/// Parses a zone player description.xml.
///
/// Sonos nests AVTransport and RenderingControl under an embedded
/// MediaRenderer device, so services are searched in the whole device tree
/// and the first match wins. Relative control URLs are resolved against
/// `location`. ZoneGroupTopology is optional.
pub fn parse_device_description(
    xml: &str,
    location: &str,
) -> Result<SonosDevice, DescriptionError> {
    let root = Element::parse(xml.as_bytes())?;
    let device = root
        .get_child("device")
        .ok_or(DescriptionError::MissingField("device"))?;

    let udn = child_text(device, "UDN").ok_or(DescriptionError::MissingField("UDN"))?;
    let room_name = child_text(device, "roomName")
        .or_else(|| child_text(device, "friendlyName"))
        .ok_or(DescriptionError::MissingField("roomName"))?;
    let model_name = child_text(device, "modelName").unwrap_or_default();

    let avtransport = find_service(device, AVTRANSPORT_URN, location)
        .ok_or(DescriptionError::MissingService("AVTransport"))?;
    let rendering_control = find_service(device, RENDERING_CONTROL_URN, location)
        .ok_or(DescriptionError::MissingService("RenderingControl"))?;
    let zone_group_topology = find_service(device, ZONE_GROUP_TOPOLOGY_URN, location);

    debug!(
        "Description of {} ({}): AVTransport={} RenderingControl={}",
        room_name, udn, avtransport.control_url, rendering_control.control_url
    );

    Ok(SonosDevice {
        udn,
        room_name,
        model_name,
        location: location.to_string(),
        avtransport,
        rendering_control,
        zone_group_topology,
    })
}

fn child_text(parent: &Element, name: &str) -> Option<String> {
    parent
        .get_child(name)
        .and_then(|e| e.get_text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn child_elements<'a>(parent: &'a Element, name: &'a str) -> impl Iterator<Item = &'a Element> {
    parent.children.iter().filter_map(move |node| match node {
        XMLNode::Element(elem) if elem.name == name => Some(elem),
        _ => None,
    })
}

/// Depth-first search of `device`, its serviceList and its embedded devices.
fn find_service(device: &Element, urn_prefix: &str, location: &str) -> Option<ServiceEndpoint> {
    if let Some(list) = device.get_child("serviceList") {
        for service in child_elements(list, "service") {
            let (Some(service_type), Some(control_url)) = (
                child_text(service, "serviceType"),
                child_text(service, "controlURL"),
            ) else {
                continue;
            };

            if service_type.to_ascii_lowercase().starts_with(urn_prefix) {
                return Some(ServiceEndpoint {
                    service_type,
                    control_url: resolve_control_url(location, &control_url),
                });
            }
        }
    }

    let embedded = device.get_child("deviceList")?;
    child_elements(embedded, "device").find_map(|d| find_service(d, urn_prefix, location))
}

/// Resolve a possibly relative controlURL against the description URL.
///
/// - If `control_url` is already absolute (starts with http:// or https://), it is returned as-is.
/// - Otherwise, it is resolved against the scheme://host:port of `description_url`.
fn resolve_control_url(description_url: &str, control_url: &str) -> String {
    if control_url.starts_with("http://") || control_url.starts_with("https://") {
        return control_url.to_string();
    }

    if let Some((scheme, rest)) = description_url.split_once("://") {
        let authority = rest.split('/').next().unwrap_or(rest);
        let base = format!("{}://{}", scheme, authority);

        if control_url.starts_with('/') {
            return format!("{}{}", base, control_url);
        } else {
            return format!("{}/{}", base, control_url);
        }
    }

    control_url.to_string()
}
