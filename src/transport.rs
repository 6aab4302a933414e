//! Blocking UDP transport: unicast request/response with timeout and retry,
//! broadcast socket construction and local-IP selection.

use crate::error::{BroadlinkError, Result};
use log::{debug, warn};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::Duration;

/// Default time to wait for a response datagram.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of retries after a receive timeout.
pub const DEFAULT_RETRIES: u32 = 2;

/// Send a packet and wait for a single response datagram.
///
/// A fresh socket on an ephemeral port is used per request. Each attempt
/// waits up to `timeout`; after `retries` additional attempts the call
/// fails with [`BroadlinkError::NetworkTimeout`].
pub fn request(
    host: SocketAddrV4,
    packet: &[u8],
    timeout: Duration,
    retries: u32,
) -> Result<Vec<u8>> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    socket.set_read_timeout(Some(timeout))?;

    let attempts = retries + 1;
    let mut buf = [0u8; 2048];
    for attempt in 1..=attempts {
        socket.send_to(packet, host)?;
        debug!("{} bytes sent to {host} (attempt {attempt}/{attempts})", packet.len());

        match socket.recv_from(&mut buf) {
            Ok((len, src)) => {
                debug!("{len} bytes received from {src}");
                return Ok(buf[..len].to_vec());
            }
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(e) => return Err(e.into()),
        }
    }

    warn!("no response from {host} after {attempts} attempts");
    Err(BroadlinkError::NetworkTimeout)
}

/// Send a packet without waiting for a response.
pub fn send_only(host: SocketAddrV4, packet: &[u8]) -> Result<()> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    socket.send_to(packet, host)?;
    debug!("{} bytes sent to {host} (no response expected)", packet.len());
    Ok(())
}

/// Create a UDP socket configured for broadcast, bound to `(bind_ip, 0)`.
pub fn broadcast_socket(bind_ip: Ipv4Addr) -> Result<UdpSocket> {
    let addr = SocketAddr::V4(SocketAddrV4::new(bind_ip, 0));
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_broadcast(true)?;
    socket.bind(&SockAddr::from(addr))?;
    Ok(socket.into())
}

/// Pick the local IPv4 address the default route would use.
///
/// The socket is never actually written to; connecting a datagram socket is
/// enough to resolve the source address.
pub fn local_ip() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    match socket.local_addr().ok()? {
        SocketAddr::V4(addr) => Some(*addr.ip()),
        SocketAddr::V6(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn request_returns_first_response() {
        let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
        let peer_addr = match peer.local_addr().unwrap() {
            SocketAddr::V4(a) => a,
            SocketAddr::V6(_) => unreachable!(),
        };

        let handle = thread::spawn(move || {
            let mut buf = [0u8; 64];
            let (len, src) = peer.recv_from(&mut buf).unwrap();
            peer.send_to(&buf[..len], src).unwrap();
        });

        let reply = request(peer_addr, b"ping", Duration::from_secs(2), 0).unwrap();
        assert_eq!(reply, b"ping");
        handle.join().unwrap();
    }

    #[test]
    fn request_times_out_against_silent_peer() {
        let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
        let peer_addr = match peer.local_addr().unwrap() {
            SocketAddr::V4(a) => a,
            SocketAddr::V6(_) => unreachable!(),
        };

        let result = request(peer_addr, b"ping", Duration::from_millis(50), 1);
        assert!(matches!(result, Err(BroadlinkError::NetworkTimeout)));
    }

    #[test]
    fn broadcast_socket_binds_ephemeral_port() {
        let socket = broadcast_socket(Ipv4Addr::LOCALHOST).unwrap();
        assert!(socket.local_addr().unwrap().port() != 0);
    }
}
