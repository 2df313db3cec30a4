use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControlPointError {
    #[error("Missing {0} element in SOAP body")]
    UpnpMissingReturnValue(String),
    #[error("Invalid {0} value: {1}")]
    UpnpBadReturnValue(String, String),
    #[error("{0} returned UPnP error {1}: {2} (HTTP status {3})")]
    SoapUpnpError(String, u32, String, u16),
    #[error("{0} failed with HTTP status {1} and body: {2}")]
    SoapActionWrongBody(String, u16, String),
    #[error("Soap Error: No envelope for action {0}")]
    SoapNoEnvelope(String),
    #[error("Discovery Error: {0}")]
    Discovery(String),
}

impl ControlPointError {
    pub fn upnp_missing_return_value(value: &str) -> Self {
        ControlPointError::UpnpMissingReturnValue(value.to_string())
    }

    pub fn upnp_bad_return_value(name: &str, value: &str) -> Self {
        ControlPointError::UpnpBadReturnValue(name.to_string(), value.to_string())
    }
}
