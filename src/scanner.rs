//! UDP-based device discovery and provisioning.
//! Broadcasts the discovery probe and decodes device responses.

use crate::device::Device;
use crate::error::Result;
use crate::protocol::{self, DEVICE_PORT};
use crate::transport;
use log::{debug, info, warn};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

/// Scanner discovers Broadlink devices on the local network using UDP
/// broadcast.
///
/// Devices in "locked" mode ignore the broadcast probe; reach those with
/// [`hello`] instead.
pub struct Scanner {
    /// Timeout for discovery
    pub timeout: Duration,
    /// Local address to bind to; auto-detected when `None`
    pub local_ip: Option<Ipv4Addr>,
    /// Probe destination, normally the limited broadcast address
    pub target_ip: Ipv4Addr,
    /// Probe destination port
    pub target_port: u16,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner {
    /// Create a new Scanner with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            timeout: transport::DEFAULT_TIMEOUT,
            local_ip: None,
            target_ip: Ipv4Addr::BROADCAST,
            target_port: DEVICE_PORT,
        }
    }

    /// Set discovery timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Bind to a specific local address.
    #[must_use]
    pub fn with_local_ip(mut self, local_ip: Ipv4Addr) -> Self {
        self.local_ip = Some(local_ip);
        self
    }

    /// Probe a different destination (e.g. a directed broadcast address).
    #[must_use]
    pub fn with_target(mut self, ip: Ipv4Addr, port: u16) -> Self {
        self.target_ip = ip;
        self.target_port = port;
        self
    }

    /// Broadcast probes and hand each unique responder to `found`, until
    /// the timeout elapses. Receive timeouts are not errors; partial
    /// results stand.
    fn run<F: FnMut(Device)>(&self, mut found: F) -> Result<()> {
        let bind_ip = self
            .local_ip
            .or_else(transport::local_ip)
            .unwrap_or(Ipv4Addr::UNSPECIFIED);
        let socket = transport::broadcast_socket(bind_ip)?;
        let local_port = socket.local_addr()?.port();
        let source = (bind_ip != Ipv4Addr::UNSPECIFIED).then_some((bind_ip, local_port));

        let packet = protocol::pack_discovery(source);
        let target = SocketAddrV4::new(self.target_ip, self.target_port);
        info!("scanning for devices via {target} (source port {local_port})");

        let start = Instant::now();
        let mut seen: Vec<(SocketAddrV4, [u8; 6], u16)> = Vec::new();
        let mut buf = [0u8; 1024];

        loop {
            let remaining = self.timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                break;
            }
            socket.set_read_timeout(Some(remaining.min(Duration::from_secs(1))))?;
            socket.send_to(&packet, target)?;
            debug!("discovery probe sent to {target}");

            loop {
                match socket.recv_from(&mut buf) {
                    Ok((len, SocketAddr::V4(host))) => {
                        match protocol::unpack_discovery(&buf[..len]) {
                            Ok(resp) => {
                                let key = (host, resp.mac, resp.devtype);
                                if seen.contains(&key) {
                                    continue;
                                }
                                seen.push(key);

                                let device = Device::from_discovery(&resp, host);
                                info!("found {device}");
                                found(device);
                            }
                            Err(e) => debug!("ignoring malformed response from {host}: {e}"),
                        }
                    }
                    Ok((_, SocketAddr::V6(host))) => {
                        debug!("ignoring response from IPv6 source {host}");
                    }
                    Err(e)
                        if e.kind() == std::io::ErrorKind::WouldBlock
                            || e.kind() == std::io::ErrorKind::TimedOut =>
                    {
                        break;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        info!("scan finished, {} device(s) found", seen.len());
        Ok(())
    }

    /// Scan the local network, returning every device found within the
    /// timeout.
    pub fn scan(&self) -> Result<Vec<Device>> {
        let mut devices = Vec::new();
        self.run(|device| devices.push(device))?;
        Ok(devices)
    }

    /// Scan the local network, yielding each device as soon as its
    /// response arrives. The receiver acts as a blocking iterator and
    /// disconnects when the scan is over.
    #[must_use]
    pub fn scan_stream(self) -> mpsc::Receiver<Device> {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            if let Err(e) = self.run(|device| {
                let _ = tx.send(device);
            }) {
                warn!("discovery scan failed: {e}");
            }
        });
        rx
    }
}

/// Discover devices connected to the local network.
pub fn discover(
    timeout: Duration,
    local_ip: Option<Ipv4Addr>,
    broadcast_ip: Option<Ipv4Addr>,
) -> Result<Vec<Device>> {
    let mut scanner = Scanner::new().with_timeout(timeout);
    if let Some(ip) = local_ip {
        scanner = scanner.with_local_ip(ip);
    }
    if let Some(ip) = broadcast_ip {
        scanner = scanner.with_target(ip, DEVICE_PORT);
    }
    scanner.scan()
}

/// Discover devices, yielding each one the moment it responds.
#[must_use]
pub fn xdiscover(
    timeout: Duration,
    local_ip: Option<Ipv4Addr>,
    broadcast_ip: Option<Ipv4Addr>,
) -> mpsc::Receiver<Device> {
    let mut scanner = Scanner::new().with_timeout(timeout);
    if let Some(ip) = local_ip {
        scanner = scanner.with_local_ip(ip);
    }
    if let Some(ip) = broadcast_ip {
        scanner = scanner.with_target(ip, DEVICE_PORT);
    }
    scanner.scan_stream()
}

/// Direct device discovery: probe a single address and build a handle from
/// its response. Works for devices in "locked" mode that ignore the
/// broadcast probe.
pub fn hello(ip: Ipv4Addr, timeout: Duration) -> Result<Device> {
    hello_port(ip, DEVICE_PORT, timeout)
}

/// [`hello`] against a non-default port.
pub fn hello_port(ip: Ipv4Addr, port: u16, timeout: Duration) -> Result<Device> {
    let host = SocketAddrV4::new(ip, port);
    let packet = protocol::pack_discovery(None);
    let response = transport::request(host, &packet, timeout, 0)?;
    let resp = protocol::unpack_discovery(&response)?;

    let device = Device::from_discovery(&resp, host);
    info!("hello: {device}");
    Ok(device)
}

/// Set up a new device in AP mode: broadcast the Wi-Fi credentials. The
/// device does not respond.
///
/// Security mode: 0 none, 1 WEP, 2 WPA1, 3 WPA2, 4 WPA1/2.
pub fn setup(ssid: &str, password: &str, security_mode: u8) -> Result<()> {
    let packet = protocol::pack_provisioning(ssid, password, security_mode)?;
    let socket = transport::broadcast_socket(Ipv4Addr::UNSPECIFIED)?;
    socket.send_to(&packet, (Ipv4Addr::BROADCAST, DEVICE_PORT))?;
    info!("provisioning frame broadcast for SSID {ssid:?}");
    Ok(())
}
