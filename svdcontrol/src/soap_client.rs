use std::time::Duration;

use anyhow::{Context, Result};
use svdupnp::soap::{
    SoapEnvelope, build_soap_request, find_child_with_suffix, parse_soap_envelope,
    parse_upnp_error,
};
use tracing::trace;
use ureq::Agent;
use xmltree::Element;

use crate::errors::ControlPointError;

/// Result of a SOAP call:
/// - HTTP status code
/// - raw XML body (always)
/// - parsed SOAP envelope if parsing succeeded
pub struct SoapCallResult {
    pub status: ureq::http::StatusCode,
    pub raw_body: String,
    pub envelope: Option<SoapEnvelope>,
}

/// Builds the HTTP agent used for SOAP calls.
///
/// 4xx/5xx answers are *not* turned into transport errors: UPnP reports
/// faults with HTTP 500 and we want to read the body of those.
pub fn soap_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .http_status_as_error(false)
        .timeout_global(Some(timeout))
        .build()
        .into()
}

/// Invoke a UPnP SOAP action on a control URL.
///
/// - `control_url`: full HTTP URL of the service control endpoint
/// - `service_type`: service URN, e.g. "urn:schemas-upnp-org:service:AVTransport:1"
/// - `action`: action name, e.g. "GetTransportInfo"
/// - `args`: list of (name, value) pairs, e.g. &[("InstanceID", "0")]
pub fn invoke_upnp_action(
    agent: &Agent,
    control_url: &str,
    service_type: &str,
    action: &str,
    args: &[(&str, &str)],
) -> Result<SoapCallResult> {
    let body_xml = build_soap_request(service_type, action, args)
        .context("Failed to build SOAP request body")?;

    let soap_action_header = format!(r#""{}#{}""#, service_type, action);

    let mut response = agent
        .post(control_url)
        .header("Content-Type", r#"text/xml; charset="utf-8""#)
        .header("SOAPAction", &soap_action_header)
        .send(body_xml)
        .with_context(|| format!("HTTP error when sending {} to {}", action, control_url))?;

    let status = response.status();

    let raw_body = response
        .body_mut()
        .read_to_string()
        .context("Failed to read SOAP response body")?;

    trace!("{} answered HTTP {}: {}", action, status, raw_body);

    // A body that is not SOAP is not fatal here: the caller still gets
    // status + raw body and decides.
    let envelope = parse_soap_envelope(raw_body.as_bytes()).ok();

    Ok(SoapCallResult {
        status,
        raw_body,
        envelope,
    })
}

/// Checks a call result and returns the `<Action>Response` element.
///
/// UPnP faults take precedence over the HTTP status so that the error names
/// the UPnP error code.
pub(crate) fn action_response(action: &str, call_result: &SoapCallResult) -> Result<Element> {
    let status = call_result.status.as_u16();

    if let Some(env) = &call_result.envelope {
        if let Some(err) = parse_upnp_error(env) {
            return Err(ControlPointError::SoapUpnpError(
                action.to_string(),
                err.error_code,
                err.error_description,
                status,
            )
            .into());
        }
    }

    if !call_result.status.is_success() {
        return Err(ControlPointError::SoapActionWrongBody(
            action.to_string(),
            status,
            call_result.raw_body.clone(),
        )
        .into());
    }

    let envelope = call_result
        .envelope
        .as_ref()
        .ok_or_else(|| ControlPointError::SoapNoEnvelope(action.to_string()))?;

    let response_name = format!("{}Response", action);
    find_child_with_suffix(&envelope.body.content, &response_name)
        .cloned()
        .ok_or_else(|| ControlPointError::upnp_missing_return_value(&response_name).into())
}

/// Trimmed, non-empty text of a required child element.
pub(crate) fn extract_child_text(parent: &Element, suffix: &str) -> Result<String> {
    let text = optional_child_text(parent, suffix)
        .ok_or_else(|| ControlPointError::upnp_missing_return_value(suffix))?;

    if text.is_empty() {
        return Err(ControlPointError::upnp_bad_return_value(suffix, "").into());
    }
    Ok(text)
}

/// Trimmed text of a child element, empty when the element has no text,
/// `None` when the element is absent.
pub(crate) fn optional_child_text(parent: &Element, suffix: &str) -> Option<String> {
    let child = find_child_with_suffix(parent, suffix)?;
    Some(
        child
            .get_text()
            .map(|t| t.trim().to_string())
            .unwrap_or_default(),
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ureq::http::StatusCode;

    pub(crate) fn call_result(status: u16, body: &str) -> SoapCallResult {
        SoapCallResult {
            status: StatusCode::from_u16(status).unwrap(),
            raw_body: body.to_string(),
            envelope: parse_soap_envelope(body.as_bytes()).ok(),
        }
    }

    pub(crate) fn envelope_with(inner: &str) -> String {
        format!(
            r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">
  <s:Body>{}</s:Body>
</s:Envelope>"#,
            inner
        )
    }

    #[test]
    fn action_response_returns_response_element() {
        let body = envelope_with(
            r#"<u:GetVolumeResponse xmlns:u="urn:schemas-upnp-org:service:RenderingControl:1"><CurrentVolume>12</CurrentVolume></u:GetVolumeResponse>"#,
        );
        let response = action_response("GetVolume", &call_result(200, &body)).unwrap();
        assert_eq!(extract_child_text(&response, "CurrentVolume").unwrap(), "12");
    }

    #[test]
    fn action_response_reports_upnp_fault() {
        let body = envelope_with(
            r#"<s:Fault><faultcode>s:Client</faultcode><faultstring>UPnPError</faultstring>
            <detail><UPnPError xmlns="urn:schemas-upnp-org:control-1-0"><errorCode>402</errorCode>
            <errorDescription>Invalid Args</errorDescription></UPnPError></detail></s:Fault>"#,
        );
        let err = action_response("GetVolume", &call_result(500, &body)).unwrap_err();
        let err = err.downcast::<ControlPointError>().unwrap();
        assert!(matches!(
            err,
            ControlPointError::SoapUpnpError(ref action, 402, ref desc, 500)
                if action == "GetVolume" && desc == "Invalid Args"
        ));
    }

    #[test]
    fn action_response_reports_http_error_without_soap() {
        let err = action_response("GetVolume", &call_result(404, "Not Found")).unwrap_err();
        let err = err.downcast::<ControlPointError>().unwrap();
        assert!(matches!(err, ControlPointError::SoapActionWrongBody(_, 404, _)));
    }

    #[test]
    fn action_response_requires_envelope_and_response() {
        let err = action_response("GetVolume", &call_result(200, "garbage")).unwrap_err();
        assert!(matches!(
            err.downcast::<ControlPointError>().unwrap(),
            ControlPointError::SoapNoEnvelope(_)
        ));

        let body = envelope_with("<u:OtherResponse xmlns:u=\"urn:x\"/>");
        let err = action_response("GetVolume", &call_result(200, &body)).unwrap_err();
        assert!(matches!(
            err.downcast::<ControlPointError>().unwrap(),
            ControlPointError::UpnpMissingReturnValue(_)
        ));
    }

    #[test]
    fn child_text_helpers() {
        let body = envelope_with(
            r#"<u:GetPositionInfoResponse xmlns:u="urn:x"><Track>1</Track><TrackURI></TrackURI></u:GetPositionInfoResponse>"#,
        );
        let response = action_response("GetPositionInfo", &call_result(200, &body)).unwrap();

        assert_eq!(optional_child_text(&response, "TrackURI"), Some(String::new()));
        assert_eq!(optional_child_text(&response, "RelTime"), None);
        assert!(extract_child_text(&response, "TrackURI").is_err());
        assert_eq!(extract_child_text(&response, "Track").unwrap(), "1");
    }
}
