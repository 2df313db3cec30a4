/*!
The SSDP client is a *control point*. It must **not** bind to UDP port 1900.

If a client and a device-side server both bind 1900 (even with SO_REUSEPORT) the
kernel load-balances incoming datagrams between the sockets and answers get lost.
The client binds an ephemeral port, sends M-SEARCH to the multicast group and
receives the unicast HTTP/200 replies on that port.

Hosts with several interfaces (eth0 + wlan0, docker bridges) only reach the
players through some of them, so the search is sent out of every IPv4
interface, a few times each since it is plain UDP.
*/

use super::{SSDP_MULTICAST_ADDR, SSDP_PORT};
use socket2::{Domain, Protocol, SockRef, Socket, Type};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// How long a single `recv_from` may block while collecting answers.
const RECV_SLICE: Duration = Duration::from_millis(200);

/// Number of times each M-SEARCH is sent per interface.
const MSEARCH_REPEAT: usize = 3;

/// SSDP messages a control point cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SsdpEvent {
    Alive {
        usn: String,
        nt: String,
        location: String,
        server: String,
        from: SocketAddr,
    },
    ByeBye {
        usn: String,
        nt: String,
        from: SocketAddr,
    },
    SearchResponse {
        usn: String,
        st: String,
        location: String,
        server: String,
        from: SocketAddr,
    },
}

impl SsdpEvent {
    /// Unique service name carried by the message.
    pub fn usn(&self) -> &str {
        match self {
            SsdpEvent::Alive { usn, .. }
            | SsdpEvent::ByeBye { usn, .. }
            | SsdpEvent::SearchResponse { usn, .. } => usn,
        }
    }

    /// Notification or search type (NT for NOTIFY, ST for answers).
    pub fn device_type(&self) -> &str {
        match self {
            SsdpEvent::Alive { nt, .. } | SsdpEvent::ByeBye { nt, .. } => nt,
            SsdpEvent::SearchResponse { st, .. } => st,
        }
    }

    /// Description URL, absent for byebye messages.
    pub fn location(&self) -> Option<&str> {
        match self {
            SsdpEvent::Alive { location, .. } | SsdpEvent::SearchResponse { location, .. } => {
                Some(location)
            }
            SsdpEvent::ByeBye { .. } => None,
        }
    }

    /// SERVER header, "Unknown" when the device sent none. Absent for byebye.
    pub fn server(&self) -> Option<&str> {
        match self {
            SsdpEvent::Alive { server, .. } | SsdpEvent::SearchResponse { server, .. } => {
                Some(server)
            }
            SsdpEvent::ByeBye { .. } => None,
        }
    }
}

fn multicast_group() -> SocketAddrV4 {
    SocketAddrV4::new(Ipv4Addr::new(239, 255, 255, 250), SSDP_PORT)
}

/// SSDP client sending M-SEARCH and collecting answers
pub struct SsdpClient {
    socket: UdpSocket,
    /// Interfaces that joined the multicast group
    interfaces: Vec<Ipv4Addr>,
}

impl SsdpClient {
    /// Creates a client bound to an ephemeral port
    pub fn new() -> std::io::Result<Self> {
        let socket2 = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket2.set_reuse_address(true)?;

        let bind_addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0));
        socket2.bind(&bind_addr.into())?;

        let socket: UdpSocket = socket2.into();
        socket.set_read_timeout(Some(RECV_SLICE))?;
        socket.set_multicast_loop_v4(true)?;

        let group = *multicast_group().ip();
        let candidates = get_if_addrs::get_if_addrs()?.into_iter().map(|iface| iface.ip());
        let mut interfaces = Vec::new();
        for ipv4 in multicast_interfaces(candidates) {
            match socket.join_multicast_v4(&group, &ipv4) {
                Ok(()) => {
                    debug!("SSDP: joined {} on {}", SSDP_MULTICAST_ADDR, ipv4);
                    interfaces.push(ipv4);
                }
                Err(e) => warn!(
                    "SSDP: failed to join {} on {}: {}",
                    SSDP_MULTICAST_ADDR, ipv4, e
                ),
            }
        }

        info!(
            "SSDP client ready on {} ({} interfaces)",
            socket.local_addr()?,
            interfaces.len()
        );

        Ok(Self { socket, interfaces })
    }

    /// Sends an M-SEARCH for the given search target out of every interface.
    ///
    /// Fails only when no copy of the request could be sent.
    pub fn send_msearch(&self, st: &str, mx: u32) -> std::io::Result<()> {
        let msg = build_msearch(st, mx);
        let sock = SockRef::from(&self.socket);

        let sent = send_rounds(&self.interfaces, MSEARCH_REPEAT, |iface| {
            if let Some(addr) = iface {
                sock.set_multicast_if_v4(&addr)?;
            }
            self.socket
                .send_to(msg.as_bytes(), multicast_group())
                .map(|_| ())
        });

        match sent {
            Ok(count) => {
                info!("M-SEARCH sent {} times (ST={}, MX={})", count, st, mx.max(1));
                debug!("M-SEARCH payload\n{}", msg);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to send M-SEARCH: {}", e);
                Err(e)
            }
        }
    }

    /// Receives and parses SSDP messages until `window` has elapsed.
    pub fn collect_events(&self, window: Duration) -> std::io::Result<Vec<SsdpEvent>> {
        let deadline = Instant::now() + window;
        let mut buf = [0u8; 8192];
        let mut events = Vec::new();

        while Instant::now() < deadline {
            match self.socket.recv_from(&mut buf) {
                Ok((n, from)) => {
                    let data = String::from_utf8_lossy(&buf[..n]);
                    if let Some(event) = parse_message(&data, from) {
                        debug!("SSDP event from {}: {:?}", from, event);
                        events.push(event);
                    }
                }
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    continue;
                }
                Err(e) => {
                    warn!("SSDP client read error: {}", e);
                    return Err(e);
                }
            }
        }

        Ok(events)
    }
}

/// Non-loopback IPv4 addresses, each once.
fn multicast_interfaces<I>(addrs: I) -> Vec<Ipv4Addr>
where
    I: IntoIterator<Item = IpAddr>,
{
    let mut out = Vec::new();
    for addr in addrs {
        if let IpAddr::V4(ipv4) = addr {
            if !ipv4.is_loopback() && !out.contains(&ipv4) {
                out.push(ipv4);
            }
        }
    }
    out
}

/// Calls `send` `repeat` times for every interface, round by round.
/// `None` stands for the default multicast route when there is no interface.
///
/// Returns how many sends succeeded, or the last error when none did.
fn send_rounds<F>(interfaces: &[Ipv4Addr], repeat: usize, mut send: F) -> std::io::Result<usize>
where
    F: FnMut(Option<Ipv4Addr>) -> std::io::Result<()>,
{
    let targets: Vec<Option<Ipv4Addr>> = if interfaces.is_empty() {
        vec![None]
    } else {
        interfaces.iter().copied().map(Some).collect()
    };

    let mut sent = 0;
    let mut last_error = None;
    for _ in 0..repeat.max(1) {
        for &target in &targets {
            match send(target) {
                Ok(()) => sent += 1,
                Err(e) => {
                    debug!("M-SEARCH via {:?} failed: {}", target, e);
                    last_error = Some(e);
                }
            }
        }
    }

    match last_error {
        Some(e) if sent == 0 => Err(e),
        _ => Ok(sent),
    }
}

fn build_msearch(st: &str, mx: u32) -> String {
    let mx = mx.max(1);
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: {}:{}\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: {}\r\n\
         ST: {}\r\n\
         USER-AGENT: SonosDisplay SSDP Client\r\n\
         \r\n",
        SSDP_MULTICAST_ADDR, SSDP_PORT, mx, st
    )
}

pub(crate) fn parse_message(data: &str, from: SocketAddr) -> Option<SsdpEvent> {
    let mut lines = data.lines();
    let first_line = lines.next()?.trim();
    let upper = first_line.to_ascii_uppercase();
    let headers = parse_headers(lines);

    let result = if upper.starts_with("NOTIFY ") {
        handle_notify(&headers, from)
    } else if upper.starts_with("HTTP/") && upper.contains(" 200 ") {
        handle_search_response(&headers, from)
    } else if upper.starts_with("M-SEARCH ") {
        // Another control point searching; we are not a device.
        None
    } else {
        trace!("Unknown SSDP message type from {}: {}", from, first_line);
        None
    };

    if result.is_none() {
        trace!("SSDP message from {} ignored:\n{}", from, data);
    }

    result
}

fn handle_notify(headers: &HashMap<String, String>, from: SocketAddr) -> Option<SsdpEvent> {
    let nts = headers.get("NTS")?.to_ascii_lowercase();
    let nt = headers.get("NT")?.to_string();
    let usn = headers.get("USN")?.to_string();

    match nts.as_str() {
        "ssdp:alive" => {
            let Some(location) = headers.get("LOCATION") else {
                trace!("NOTIFY ssdp:alive from {} without LOCATION, ignoring", from);
                return None;
            };

            Some(SsdpEvent::Alive {
                usn,
                nt,
                location: location.to_string(),
                server: server_header(headers),
                from,
            })
        }
        "ssdp:byebye" => Some(SsdpEvent::ByeBye { usn, nt, from }),
        _ => {
            trace!("Unknown NTS value from {}: {}", from, nts);
            None
        }
    }
}

fn handle_search_response(
    headers: &HashMap<String, String>,
    from: SocketAddr,
) -> Option<SsdpEvent> {
    let (Some(st), Some(usn), Some(location)) = (
        headers.get("ST"),
        headers.get("USN"),
        headers.get("LOCATION"),
    ) else {
        trace!(
            "M-SEARCH response from {} lacks ST, USN or LOCATION, ignoring",
            from
        );
        return None;
    };

    Some(SsdpEvent::SearchResponse {
        usn: usn.to_string(),
        st: st.to_string(),
        location: location.to_string(),
        server: server_header(headers),
        from,
    })
}

fn server_header(headers: &HashMap<String, String>) -> String {
    headers
        .get("SERVER")
        .cloned()
        .unwrap_or_else(|| "Unknown".to_string())
}

fn parse_headers<'a, I>(lines: I) -> HashMap<String, String>
where
    I: Iterator<Item = &'a str>,
{
    let mut headers = HashMap::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }

        // Split on the first ':' only, values may contain more.
        match line.split_once(':') {
            Some((name, value)) => {
                let name = name.trim().to_ascii_uppercase();
                let value = value.trim();
                if !name.is_empty() && !value.is_empty() {
                    headers.insert(name, value.to_string());
                } else {
                    trace!("Skipping malformed header: '{}'", line);
                }
            }
            None => trace!("Skipping line without colon: '{}'", line),
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from() -> SocketAddr {
        "192.168.1.20:1400".parse().unwrap()
    }

    #[test]
    fn parses_search_response_from_zone_player() {
        let data = "HTTP/1.1 200 OK\r\n\
                    CACHE-CONTROL: max-age = 1800\r\n\
                    EXT:\r\n\
                    LOCATION: http://192.168.1.20:1400/xml/device_description.xml\r\n\
                    SERVER: Linux UPnP/1.0 Sonos/70.3-88200 (ZPS1)\r\n\
                    ST: urn:schemas-upnp-org:device:ZonePlayer:1\r\n\
                    USN: uuid:RINCON_000E58A0B1C201400::urn:schemas-upnp-org:device:ZonePlayer:1\r\n\
                    \r\n";

        let event = parse_message(data, from()).unwrap();
        match event {
            SsdpEvent::SearchResponse {
                st,
                location,
                server,
                ..
            } => {
                assert_eq!(st, "urn:schemas-upnp-org:device:ZonePlayer:1");
                assert_eq!(
                    location,
                    "http://192.168.1.20:1400/xml/device_description.xml"
                );
                assert!(server.contains("Sonos"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn parses_notify_alive_and_byebye() {
        let alive = "NOTIFY * HTTP/1.1\r\n\
                     HOST: 239.255.255.250:1900\r\n\
                     CACHE-CONTROL: max-age=900\r\n\
                     location: http://192.168.1.21:1400/xml/device_description.xml\r\n\
                     nt: urn:schemas-upnp-org:device:ZonePlayer:1\r\n\
                     NTS: ssdp:alive\r\n\
                     USN: uuid:RINCON_B8E937000000::urn:schemas-upnp-org:device:ZonePlayer:1\r\n\
                     \r\n";
        let event = parse_message(alive, from()).unwrap();
        assert!(matches!(&event, SsdpEvent::Alive { .. }));
        assert_eq!(event.server(), Some("Unknown"));
        assert_eq!(
            event.location(),
            Some("http://192.168.1.21:1400/xml/device_description.xml")
        );
        assert_eq!(event.device_type(), "urn:schemas-upnp-org:device:ZonePlayer:1");

        let byebye = "NOTIFY * HTTP/1.1\r\n\
                      NT: urn:schemas-upnp-org:device:ZonePlayer:1\r\n\
                      NTS: ssdp:byebye\r\n\
                      USN: uuid:RINCON_B8E937000000\r\n\
                      \r\n";
        let event = parse_message(byebye, from()).unwrap();
        assert!(matches!(event, SsdpEvent::ByeBye { .. }));
        assert_eq!(event.location(), None);
        assert_eq!(event.server(), None);
        assert_eq!(event.usn(), "uuid:RINCON_B8E937000000");
    }

    #[test]
    fn ignores_incomplete_or_foreign_messages() {
        let missing_location = "HTTP/1.1 200 OK\r\n\
                                ST: upnp:rootdevice\r\n\
                                USN: uuid:abc\r\n\r\n";
        assert!(parse_message(missing_location, from()).is_none());

        let msearch = "M-SEARCH * HTTP/1.1\r\nST: ssdp:all\r\n\r\n";
        assert!(parse_message(msearch, from()).is_none());

        assert!(parse_message("", from()).is_none());
    }

    #[test]
    fn msearch_clamps_mx() {
        let msg = build_msearch("urn:schemas-upnp-org:device:ZonePlayer:1", 0);
        assert!(msg.starts_with("M-SEARCH * HTTP/1.1\r\n"));
        assert!(msg.contains("MX: 1\r\n"));
        assert!(msg.contains("MAN: \"ssdp:discover\"\r\n"));
        assert!(msg.ends_with("\r\n\r\n"));
    }

    #[test]
    fn msearch_is_repeated_on_every_interface() {
        let eth = Ipv4Addr::new(192, 168, 1, 5);
        let wlan = Ipv4Addr::new(10, 0, 0, 7);
        let mut calls = Vec::new();

        let sent = send_rounds(&[eth, wlan], 3, |iface| {
            calls.push(iface);
            Ok(())
        })
        .unwrap();

        assert_eq!(sent, 6);
        assert_eq!(
            calls,
            vec![Some(eth), Some(wlan), Some(eth), Some(wlan), Some(eth), Some(wlan)]
        );
    }

    #[test]
    fn failing_interface_does_not_stop_the_search() {
        let eth = Ipv4Addr::new(192, 168, 1, 5);
        let docker = Ipv4Addr::new(172, 17, 0, 1);

        let sent = send_rounds(&[docker, eth], 3, |iface| {
            if iface == Some(docker) {
                Err(std::io::Error::other("unreachable"))
            } else {
                Ok(())
            }
        })
        .unwrap();

        assert_eq!(sent, 3);
    }

    #[test]
    fn search_fails_when_nothing_was_sent() {
        let err = send_rounds(&[Ipv4Addr::new(192, 168, 1, 5)], 2, |_| {
            Err(std::io::Error::new(ErrorKind::PermissionDenied, "denied"))
        })
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }

    #[test]
    fn without_interfaces_the_default_route_is_used() {
        let mut calls = Vec::new();
        send_rounds(&[], 3, |iface| {
            calls.push(iface);
            Ok(())
        })
        .unwrap();

        assert_eq!(calls, vec![None, None, None]);
    }

    #[test]
    fn multicast_interfaces_are_ipv4_and_not_loopback() {
        let addrs: Vec<IpAddr> = vec![
            "127.0.0.1".parse().unwrap(),
            "192.168.1.5".parse().unwrap(),
            "fe80::1".parse().unwrap(),
            "10.0.0.7".parse().unwrap(),
            "192.168.1.5".parse().unwrap(),
        ];

        assert_eq!(
            multicast_interfaces(addrs),
            vec![Ipv4Addr::new(192, 168, 1, 5), Ipv4Addr::new(10, 0, 0, 7)]
        );
    }
}
