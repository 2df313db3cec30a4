//! Low level UPnP plumbing for the Sonos display.
//!
//! - [`ssdp`]: control-point side of SSDP (M-SEARCH and answer parsing)
//! - [`soap`]: SOAP request construction and envelope parsing

pub mod soap;
pub mod ssdp;
