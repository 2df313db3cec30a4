//! # SSDP - Simple Service Discovery Protocol
//!
//! Control-point side only: we send `M-SEARCH` requests and listen for the
//! unicast answers (and any `NOTIFY` seen on the multicast group).
//!
//! - **Multicast Address**: 239.255.255.250:1900

mod client;

pub use client::{SsdpClient, SsdpEvent};

/// SSDP multicast address
pub const SSDP_MULTICAST_ADDR: &str = "239.255.255.250";

/// SSDP port
pub const SSDP_PORT: u16 = 1900;
