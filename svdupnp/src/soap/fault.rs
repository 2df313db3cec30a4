//! UPnP errors carried in SOAP faults

use super::{SoapEnvelope, find_child_with_suffix};

/// `UPnPError` detail of a SOAP fault
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpnpError {
    /// UPnP error code (e.g. 401, 501, 701)
    pub error_code: u32,

    /// Optional human readable description
    pub error_description: String,
}

/// Extracts `Fault/detail/UPnPError` from a response envelope, if any.
pub fn parse_upnp_error(envelope: &SoapEnvelope) -> Option<UpnpError> {
    let fault = find_child_with_suffix(&envelope.body.content, "Fault")?;
    let detail = find_child_with_suffix(fault, "detail")?;
    let upnp_error = find_child_with_suffix(detail, "UPnPError")?;

    let error_code = find_child_with_suffix(upnp_error, "errorCode")?
        .get_text()?
        .trim()
        .parse::<u32>()
        .ok()?;

    let error_description = find_child_with_suffix(upnp_error, "errorDescription")
        .and_then(|elem| elem.get_text())
        .map(|t| t.trim().to_string())
        .unwrap_or_default();

    Some(UpnpError {
        error_code,
        error_description,
    })
}
