use std::net::{IpAddr, SocketAddr};

/// Reported in place of the peer when its address family is neither IPv4 nor IPv6.
pub const UNKNOWN_PEER: &str = "X.X.X.X";

/// Longest textual form of an IPv6 address (`INET6_ADDRSTRLEN` without the NUL).
pub const MAX_PEER_ADDRESS_LEN: usize = 45;

/// The remote end of an accepted connection.
///
/// Only the IP address matters for reporting; transports without one return `None`.
pub trait PeerAddress {
    fn ip(&self) -> Option<IpAddr>;
}

impl PeerAddress for SocketAddr {
    fn ip(&self) -> Option<IpAddr> {
        Some(SocketAddr::ip(self))
    }
}

impl PeerAddress for IpAddr {
    fn ip(&self) -> Option<IpAddr> {
        Some(*self)
    }
}

impl PeerAddress for tokio::net::unix::SocketAddr {
    fn ip(&self) -> Option<IpAddr> {
        None
    }
}

impl<P: PeerAddress> PeerAddress for Option<P> {
    fn ip(&self) -> Option<IpAddr> {
        self.as_ref().and_then(PeerAddress::ip)
    }
}

/// Printable form of a peer address, or [`UNKNOWN_PEER`].
///
/// IPv4-mapped IPv6 peers (an IPv4 client on a dual-stack listener) keep their
/// `::ffff:a.b.c.d` form.
pub fn peer_address<P: PeerAddress + ?Sized>(peer: &P) -> String {
    match peer.ip() {
        Some(ip) => {
            let text = ip.to_string();
            debug_assert!(text.len() <= MAX_PEER_ADDRESS_LEN);
            text
        }
        None => UNKNOWN_PEER.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn ipv4_peer() {
        let peer: SocketAddr = "192.168.1.20:51000".parse().unwrap();
        assert_eq!(peer_address(&peer), "192.168.1.20");
    }

    #[test]
    fn ipv6_peer() {
        let peer: SocketAddr = "[2001:db8::42]:51000".parse().unwrap();
        assert_eq!(peer_address(&peer), "2001:db8::42");
    }

    #[test]
    fn ipv4_mapped_peer() {
        let ip = IpAddr::V6(Ipv4Addr::LOCALHOST.to_ipv6_mapped());
        assert_eq!(peer_address(&ip), "::ffff:127.0.0.1");
    }

    #[test]
    fn longest_ipv6_form_fits() {
        let ip: Ipv6Addr = "ffff:ffff:ffff:ffff:ffff:ffff:255.255.255.255".parse().unwrap();
        let text = peer_address(&IpAddr::V6(ip));
        assert!(text.len() <= MAX_PEER_ADDRESS_LEN, "{}", text);
    }

    #[test]
    fn missing_address_is_unknown() {
        let peer: Option<SocketAddr> = None;
        assert_eq!(peer_address(&peer), UNKNOWN_PEER);
    }

    #[tokio::test]
    async fn unix_peer_is_unknown() {
        let (left, _right) = tokio::net::UnixStream::pair().unwrap();
        let peer = left.peer_addr().unwrap();
        assert_eq!(peer_address(&peer), "X.X.X.X");
    }
}
