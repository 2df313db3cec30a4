//! # SOAP - Simple Object Access Protocol
//!
//! Client side SOAP support for UPnP action calls:
//!
//! - [`build_soap_request`]: builds the envelope for an action invocation
//! - [`parse_soap_envelope`]: parses a response envelope
//! - [`parse_upnp_error`]: extracts the `UPnPError` of a SOAP fault
//!
//! ```ignore
//! use svdupnp::soap::build_soap_request;
//!
//! let xml = build_soap_request(
//!     "urn:schemas-upnp-org:service:RenderingControl:1",
//!     "GetVolume",
//!     &[("InstanceID", "0"), ("Channel", "Master")],
//! )?;
//! ```

mod builder;
mod envelope;
mod fault;
mod parser;

pub use builder::build_soap_request;
pub use envelope::{SoapBody, SoapEnvelope};
pub use fault::{UpnpError, parse_upnp_error};
pub use parser::{SoapParseError, find_child_with_suffix, parse_soap_envelope};
