//! Broadlink wire protocol implementation.
//! Handles command-frame framing, discovery/provisioning frames and the
//! additive checksum pair.

use crate::crypto::BroadlinkCipher;
use crate::error::{self, BroadlinkError, Result};
use byteorder::{ByteOrder, LittleEndian};
use chrono::{DateTime, Datelike, Local, Timelike};
use std::net::Ipv4Addr;

/// Magic prefix marking a valid command frame.
pub const MAGIC: [u8; 8] = [0x5A, 0xA5, 0xAA, 0x55, 0x5A, 0xA5, 0xAA, 0x55];

/// Seed for the additive checksum.
pub const CHECKSUM_SEED: u16 = 0xBEAF;

/// Length of the command-frame header; the encrypted payload follows.
pub const HEADER_LEN: usize = 0x38;

/// UDP port the devices listen on.
pub const DEVICE_PORT: u16 = 80;

/// Client Hello, sent unencrypted to a single address.
pub const CMD_HELLO: u16 = 0x0006;
/// Key exchange.
pub const CMD_AUTH: u16 = 0x0065;
/// SP1 power switch.
pub const CMD_SP1_POWER: u16 = 0x0066;
/// Generic encrypted command; the payload selects the operation.
pub const CMD_COMMAND: u16 = 0x006A;

/// Additive checksum with an explicit seed: (seed + Σ bytes) mod 0x10000.
#[must_use]
pub fn checksum_seeded(seed: u16, data: &[u8]) -> u16 {
    data.iter()
        .fold(u32::from(seed), |acc, &b| (acc + u32::from(b)) & 0xFFFF) as u16
}

/// Frame checksum with the standard seed.
#[must_use]
pub fn checksum(data: &[u8]) -> u16 {
    checksum_seeded(CHECKSUM_SEED, data)
}

/// Addressing and session fields of an outbound command frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameHeader {
    /// Device-type code, echoed back by the device
    pub devtype: u16,
    /// Command code (e.g. [`CMD_COMMAND`])
    pub command: u16,
    /// Per-session packet counter
    pub count: u16,
    /// Caller-chosen local MAC
    pub local_mac: [u8; 6],
    /// Device id assigned by the key exchange; zero before it
    pub device_id: [u8; 4],
}

/// A parsed command response.
#[derive(Debug, Clone)]
pub struct CommandResponse {
    /// Device-type code from the frame header
    pub devtype: u16,
    /// Command code from the frame header
    pub command: u16,
    /// Packet counter echoed by the device
    pub count: u16,
    /// Decrypted payload, trailing pad zeros included
    pub payload: Vec<u8>,
}

/// Pack a command frame: 56-byte header followed by the encrypted payload.
///
/// The plaintext checksum is written at 0x34 before encryption; the
/// whole-frame checksum is computed last, with its own field still zero.
#[must_use]
pub fn pack_command(header: &FrameHeader, payload: &[u8], cipher: &BroadlinkCipher) -> Vec<u8> {
    let mut packet = vec![0u8; HEADER_LEN];
    packet[0x00..0x08].copy_from_slice(&MAGIC);
    LittleEndian::write_u16(&mut packet[0x24..0x26], header.devtype);
    LittleEndian::write_u16(&mut packet[0x26..0x28], header.command);
    LittleEndian::write_u16(&mut packet[0x28..0x2A], header.count);
    packet[0x2A..0x30].copy_from_slice(&header.local_mac);
    packet[0x30..0x34].copy_from_slice(&header.device_id);
    LittleEndian::write_u16(&mut packet[0x34..0x36], checksum(payload));

    packet.extend_from_slice(&cipher.encrypt(payload));

    let frame_checksum = checksum(&packet);
    LittleEndian::write_u16(&mut packet[0x20..0x22], frame_checksum);
    packet
}

/// Parse a command response frame.
///
/// Verifies the magic, maps a non-zero firmware error code, decrypts the
/// payload and verifies it against the plaintext-checksum field.
pub fn unpack_command(data: &[u8], cipher: &BroadlinkCipher) -> Result<CommandResponse> {
    if data.len() < HEADER_LEN {
        return Err(BroadlinkError::BadFrame("truncated response"));
    }
    if data[0x00..0x08] != MAGIC {
        return Err(BroadlinkError::BadFrame("magic mismatch"));
    }

    error::check_firmware_code(LittleEndian::read_u16(&data[0x22..0x24]))?;

    let devtype = LittleEndian::read_u16(&data[0x24..0x26]);
    let command = LittleEndian::read_u16(&data[0x26..0x28]);
    let count = LittleEndian::read_u16(&data[0x28..0x2A]);

    let payload = cipher.decrypt(&data[HEADER_LEN..])?;
    if !payload.is_empty() {
        let nominal = LittleEndian::read_u16(&data[0x34..0x36]);
        if checksum(&payload) != nominal {
            return Err(BroadlinkError::BadFrame("payload checksum mismatch"));
        }
    }

    Ok(CommandResponse {
        devtype,
        command,
        count,
        payload,
    })
}

/// Write the local-time fields used by the discovery frame: GMT offset
/// (signed, hours), year, minute, hour, two-digit year, ISO weekday, day,
/// month.
fn pack_datetime(buf: &mut [u8], now: &DateTime<Local>) {
    let utcoffset = now.offset().local_minus_utc() / 3600;
    LittleEndian::write_i32(&mut buf[0x00..0x04], utcoffset);
    LittleEndian::write_u16(&mut buf[0x04..0x06], now.year() as u16);
    buf[0x06] = now.minute() as u8;
    buf[0x07] = now.hour() as u8;
    buf[0x08] = (now.year() % 100) as u8;
    buf[0x09] = now.weekday().number_from_monday() as u8;
    buf[0x0A] = now.day() as u8;
    buf[0x0B] = now.month() as u8;
}

/// Pack a 48-byte discovery probe for an explicit timestamp.
///
/// `source` is the local address the responses should come back to; its IP
/// is written octet-reversed at 0x18–0x1B and the port at 0x1C–0x1D.
#[must_use]
pub fn pack_discovery_with(now: &DateTime<Local>, source: Option<(Ipv4Addr, u16)>) -> Vec<u8> {
    let mut packet = vec![0u8; 0x30];
    pack_datetime(&mut packet[0x08..0x14], now);

    if let Some((ip, port)) = source {
        let mut octets = ip.octets();
        octets.reverse();
        packet[0x18..0x1C].copy_from_slice(&octets);
        LittleEndian::write_u16(&mut packet[0x1C..0x1E], port);
    }

    packet[0x26] = CMD_HELLO as u8;
    let frame_checksum = checksum(&packet);
    LittleEndian::write_u16(&mut packet[0x20..0x22], frame_checksum);
    packet
}

/// Pack a discovery probe stamped with the current local time.
#[must_use]
pub fn pack_discovery(source: Option<(Ipv4Addr, u16)>) -> Vec<u8> {
    pack_discovery_with(&Local::now(), source)
}

/// Pack the unencrypted ping announcement. The device does not respond.
#[must_use]
pub fn pack_ping() -> Vec<u8> {
    let mut packet = vec![0u8; 0x30];
    packet[0x26] = 0x01;
    let frame_checksum = checksum(&packet);
    LittleEndian::write_u16(&mut packet[0x20..0x22], frame_checksum);
    packet
}

/// Device identity reported by a discovery (or hello) response.
#[derive(Debug, Clone)]
pub struct DiscoveryInfo {
    /// 16-bit device-type code
    pub devtype: u16,
    /// MAC in wire order (reversed relative to canonical display)
    pub mac: [u8; 6],
    /// Device name, as configured in the app
    pub name: String,
    /// Whether the device ignores broadcast discovery
    pub is_locked: bool,
}

/// Parse a discovery response datagram.
pub fn unpack_discovery(data: &[u8]) -> Result<DiscoveryInfo> {
    if data.len() < 0x40 {
        return Err(BroadlinkError::BadFrame("truncated discovery response"));
    }

    let devtype = LittleEndian::read_u16(&data[0x34..0x36]);
    let mut mac = [0u8; 6];
    mac.copy_from_slice(&data[0x3A..0x40]);

    let name_field = &data[0x40..];
    let name_len = name_field
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(name_field.len());
    let name = String::from_utf8_lossy(&name_field[..name_len]).into_owned();

    let is_locked = data.get(0x7F).is_some_and(|&b| b != 0);

    Ok(DiscoveryInfo {
        devtype,
        mac,
        name,
        is_locked,
    })
}

/// Pack a 136-byte AP-mode provisioning frame.
///
/// Security mode: 0 none, 1 WEP, 2 WPA1, 3 WPA2, 4 WPA1/2.
pub fn pack_provisioning(ssid: &str, password: &str, security_mode: u8) -> Result<Vec<u8>> {
    if ssid.len() > 0x20 {
        return Err(BroadlinkError::InvalidArgument(format!(
            "SSID longer than 32 bytes: {}",
            ssid.len()
        )));
    }
    if password.len() > 0x20 {
        return Err(BroadlinkError::InvalidArgument(format!(
            "password longer than 32 bytes: {}",
            password.len()
        )));
    }
    if security_mode > 4 {
        return Err(BroadlinkError::InvalidArgument(format!(
            "security mode out of range: {security_mode}"
        )));
    }

    let mut packet = vec![0u8; 0x88];
    packet[0x26] = 0x14;
    packet[0x44..0x44 + ssid.len()].copy_from_slice(ssid.as_bytes());
    packet[0x64..0x64 + password.len()].copy_from_slice(password.as_bytes());
    packet[0x84] = ssid.len() as u8;
    packet[0x85] = password.len() as u8;
    packet[0x86] = security_mode;

    let frame_checksum = checksum(&packet);
    LittleEndian::write_u16(&mut packet[0x20..0x22], frame_checksum);
    Ok(packet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn header() -> FrameHeader {
        FrameHeader {
            devtype: 0x2712,
            command: CMD_COMMAND,
            count: 0x8001,
            local_mac: [0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x01],
            device_id: [0x22, 0x00, 0x00, 0x00],
        }
    }

    #[test]
    fn checksum_of_magic_and_zeros() {
        let mut data = MAGIC.to_vec();
        data.extend_from_slice(&[0u8; 48]);
        let expected = (0xBEAFu32
            + MAGIC.iter().map(|&b| u32::from(b)).sum::<u32>())
            & 0xFFFF;
        assert_eq!(u32::from(checksum(&data)), expected);
        assert_eq!(checksum(&data), 0xC2AB);
    }

    #[test]
    fn checksum_wraps_modulo_16_bits() {
        let data = vec![0xFFu8; 1024];
        let expected = (0xBEAFu32 + 1024 * 0xFF) % 0x10000;
        assert_eq!(u32::from(checksum(&data)), expected);
    }

    #[test]
    fn command_frame_round_trip() {
        let cipher = BroadlinkCipher::bootstrap();
        let payload = b"\x01\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00";
        let packet = pack_command(&header(), payload, &cipher);

        assert_eq!(&packet[0x00..0x08], &MAGIC);
        assert_eq!(packet.len(), HEADER_LEN + 16);
        // Both checksum fields validate.
        let mut zeroed = packet.clone();
        zeroed[0x20] = 0;
        zeroed[0x21] = 0;
        assert_eq!(LittleEndian::read_u16(&packet[0x20..0x22]), checksum(&zeroed));
        assert_eq!(LittleEndian::read_u16(&packet[0x34..0x36]), checksum(payload));

        let parsed = unpack_command(&packet, &cipher).unwrap();
        assert_eq!(parsed.devtype, 0x2712);
        assert_eq!(parsed.command, CMD_COMMAND);
        assert_eq!(parsed.count, 0x8001);
        assert_eq!(parsed.payload, payload);
    }

    #[test]
    fn unaligned_payload_survives_round_trip() {
        let cipher = BroadlinkCipher::new([7u8; 16]);
        let payload = b"\x02\x00\x00\x00\x26\x00\x04\x00\x12\x24\x12\x48\x0d\x05";
        let packet = pack_command(&header(), payload, &cipher);
        let parsed = unpack_command(&packet, &cipher).unwrap();
        assert_eq!(&parsed.payload[..payload.len()], payload);
        assert!(parsed.payload[payload.len()..].iter().all(|&b| b == 0));
    }

    #[test]
    fn firmware_error_code_is_reported() {
        let cipher = BroadlinkCipher::bootstrap();
        let mut packet = pack_command(&header(), &[0x01; 16], &cipher);
        LittleEndian::write_u16(&mut packet[0x22..0x24], 0xFFF6);
        assert!(matches!(
            unpack_command(&packet, &cipher),
            Err(BroadlinkError::NotReady)
        ));

        LittleEndian::write_u16(&mut packet[0x22..0x24], 0xFFFD);
        assert!(matches!(
            unpack_command(&packet, &cipher),
            Err(BroadlinkError::Device { code: 0xFFFD })
        ));
    }

    #[test]
    fn bad_magic_and_truncation_are_rejected() {
        let cipher = BroadlinkCipher::bootstrap();
        let packet = pack_command(&header(), &[0x01; 16], &cipher);

        let mut corrupted = packet.clone();
        corrupted[0x00] = 0x00;
        assert!(matches!(
            unpack_command(&corrupted, &cipher),
            Err(BroadlinkError::BadFrame("magic mismatch"))
        ));

        assert!(matches!(
            unpack_command(&packet[..0x20], &cipher),
            Err(BroadlinkError::BadFrame("truncated response"))
        ));
    }

    #[test]
    fn tampered_payload_fails_checksum() {
        let cipher = BroadlinkCipher::bootstrap();
        let mut packet = pack_command(&header(), &[0x01; 16], &cipher);
        let last = packet.len() - 1;
        packet[last] ^= 0xFF;
        assert!(matches!(
            unpack_command(&packet, &cipher),
            Err(BroadlinkError::BadFrame("payload checksum mismatch"))
        ));
    }

    #[test]
    fn discovery_frame_encodes_reversed_ip_and_port() {
        let now = Local.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap();
        let packet = pack_discovery_with(&now, Some((Ipv4Addr::new(192, 168, 0, 42), 33210)));

        assert_eq!(packet.len(), 0x30);
        assert_eq!(&packet[0x18..0x1C], &[42, 0, 168, 192]);
        assert_eq!(LittleEndian::read_u16(&packet[0x1C..0x1E]), 33210);
        assert_eq!(packet[0x26], 0x06);

        // Date fields: 2024-03-05 is a Tuesday.
        assert_eq!(LittleEndian::read_u16(&packet[0x0C..0x0E]), 2024);
        assert_eq!(packet[0x0E], 30);
        assert_eq!(packet[0x0F], 14);
        assert_eq!(packet[0x10], 24);
        assert_eq!(packet[0x11], 2);
        assert_eq!(packet[0x12], 5);
        assert_eq!(packet[0x13], 3);

        let mut zeroed = packet.clone();
        zeroed[0x20] = 0;
        zeroed[0x21] = 0;
        assert_eq!(LittleEndian::read_u16(&packet[0x20..0x22]), checksum(&zeroed));
    }

    #[test]
    fn discovery_response_parses_identity() {
        let mut resp = vec![0u8; 0x80];
        resp[0x34] = 0x12;
        resp[0x35] = 0x27;
        resp[0x3A..0x40].copy_from_slice(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
        resp[0x40..0x47].copy_from_slice(b"Bedroom");
        resp[0x7F] = 1;

        let info = unpack_discovery(&resp).unwrap();
        assert_eq!(info.devtype, 0x2712);
        assert_eq!(info.mac, [0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
        assert_eq!(info.name, "Bedroom");
        assert!(info.is_locked);

        assert!(unpack_discovery(&resp[..0x20]).is_err());
    }

    #[test]
    fn provisioning_frame_layout() {
        let packet = pack_provisioning("myssid", "secretpw", 3).unwrap();
        assert_eq!(packet.len(), 0x88);
        assert_eq!(packet[0x26], 0x14);
        assert_eq!(&packet[0x44..0x4A], b"myssid");
        assert_eq!(&packet[0x64..0x6C], b"secretpw");
        assert_eq!(packet[0x84], 6);
        assert_eq!(packet[0x85], 8);
        assert_eq!(packet[0x86], 3);

        let mut zeroed = packet.clone();
        zeroed[0x20] = 0;
        zeroed[0x21] = 0;
        assert_eq!(LittleEndian::read_u16(&packet[0x20..0x22]), checksum(&zeroed));
    }

    #[test]
    fn provisioning_rejects_oversized_credentials() {
        let long = "x".repeat(33);
        assert!(matches!(
            pack_provisioning(&long, "pw", 3),
            Err(BroadlinkError::InvalidArgument(_))
        ));
        assert!(matches!(
            pack_provisioning("ssid", &long, 3),
            Err(BroadlinkError::InvalidArgument(_))
        ));
        assert!(matches!(
            pack_provisioning("ssid", "pw", 9),
            Err(BroadlinkError::InvalidArgument(_))
        ));
    }
}
