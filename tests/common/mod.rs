//! In-process mock device: binds a loopback UDP socket and speaks the
//! device side of the protocol (discovery, key exchange, commands).
#![allow(dead_code)]

use byteorder::{ByteOrder, LittleEndian};
use rustlink::crypto::BroadlinkCipher;
use rustlink::protocol::{self, FrameHeader, MAGIC};
use std::net::{SocketAddr, SocketAddrV4, UdpSocket};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Scripted reply to one generic command.
pub enum CommandReply {
    /// Respond with this plaintext payload and a zero error code
    Payload(Vec<u8>),
    /// Respond with an empty payload and this firmware error code
    Error(u16),
    /// Do not respond at all
    Silent,
}

/// Identity and behavior of the simulated device.
pub struct MockBehavior {
    pub devtype: u16,
    pub mac: [u8; 6],
    pub name: &'static str,
    pub is_locked: bool,
    pub device_id: [u8; 4],
    pub session_key: [u8; 16],
    /// Datagrams sent per discovery probe (duplicates exercise dedup).
    pub discovery_replies: u8,
    /// Called with the decrypted payload of every non-auth command.
    pub on_command: Box<dyn FnMut(&[u8]) -> CommandReply + Send>,
}

impl MockBehavior {
    pub fn new(devtype: u16) -> Self {
        Self {
            devtype,
            mac: [0x01, 0x02, 0x03, 0x04, 0x05, 0x06],
            name: "mock device",
            is_locked: false,
            device_id: [0x11, 0x22, 0x33, 0x44],
            session_key: [0x5A; 16],
            discovery_replies: 1,
            on_command: Box::new(|_| CommandReply::Error(0xFFFC)),
        }
    }
}

/// Handle to a running mock device.
pub struct MockDevice {
    pub addr: SocketAddrV4,
    /// Packet counters observed in command frames, in arrival order.
    pub counts: Arc<Mutex<Vec<u16>>>,
}

impl MockDevice {
    pub fn spawn(mut behavior: MockBehavior) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").expect("bind mock socket");
        socket
            .set_read_timeout(Some(Duration::from_secs(3)))
            .expect("set mock timeout");
        let addr = match socket.local_addr().expect("mock local addr") {
            SocketAddr::V4(a) => a,
            SocketAddr::V6(_) => unreachable!(),
        };

        let counts = Arc::new(Mutex::new(Vec::new()));
        let seen_counts = counts.clone();

        thread::spawn(move || {
            let mut authenticated = false;
            let mut buf = [0u8; 2048];

            while let Ok((len, src)) = socket.recv_from(&mut buf) {
                let data = &buf[..len];

                // Discovery / hello probe.
                if len == 0x30 && data[0x26] == 0x06 {
                    let resp = discovery_response(&behavior);
                    for _ in 0..behavior.discovery_replies {
                        let _ = socket.send_to(&resp, src);
                    }
                    continue;
                }

                if len < 0x38 || data[0x00..0x08] != MAGIC {
                    continue;
                }

                let command = LittleEndian::read_u16(&data[0x26..0x28]);
                let count = LittleEndian::read_u16(&data[0x28..0x2A]);
                seen_counts.lock().unwrap().push(count);

                if command == protocol::CMD_AUTH {
                    // Key exchange is always under the bootstrap key.
                    authenticated = true;
                    let mut payload = vec![0u8; 0x14];
                    payload[0x00..0x04].copy_from_slice(&behavior.device_id);
                    payload[0x04..0x14].copy_from_slice(&behavior.session_key);
                    let frame =
                        reply_frame(&behavior, command, count, &payload, 0, &BroadlinkCipher::bootstrap());
                    let _ = socket.send_to(&frame, src);
                    continue;
                }

                let cipher = if authenticated {
                    BroadlinkCipher::new(behavior.session_key)
                } else {
                    BroadlinkCipher::bootstrap()
                };
                let plain = match cipher.decrypt(&data[0x38..]) {
                    Ok(p) => p,
                    Err(_) => continue,
                };

                match (behavior.on_command)(&plain) {
                    CommandReply::Payload(payload) => {
                        let frame = reply_frame(&behavior, command, count, &payload, 0, &cipher);
                        let _ = socket.send_to(&frame, src);
                    }
                    CommandReply::Error(code) => {
                        let frame = reply_frame(&behavior, command, count, &[], code, &cipher);
                        let _ = socket.send_to(&frame, src);
                    }
                    CommandReply::Silent => {}
                }
            }
        });

        Self { addr, counts }
    }
}

fn reply_frame(
    behavior: &MockBehavior,
    command: u16,
    count: u16,
    payload: &[u8],
    error: u16,
    cipher: &BroadlinkCipher,
) -> Vec<u8> {
    let header = FrameHeader {
        devtype: behavior.devtype,
        command: command | 0x0380,
        count,
        local_mac: behavior.mac,
        device_id: behavior.device_id,
    };
    let mut frame = protocol::pack_command(&header, payload, cipher);
    LittleEndian::write_u16(&mut frame[0x22..0x24], error);
    frame
}

fn discovery_response(behavior: &MockBehavior) -> Vec<u8> {
    let mut resp = vec![0u8; 0x80];
    LittleEndian::write_u16(&mut resp[0x34..0x36], behavior.devtype);
    resp[0x3A..0x40].copy_from_slice(&behavior.mac);
    resp[0x40..0x40 + behavior.name.len()].copy_from_slice(behavior.name.as_bytes());
    resp[0x7F] = u8::from(behavior.is_locked);
    resp
}
