//! LB-family bulb dialect: a JSON state object wrapped in a small binary
//! header, plus the typed state record with range validation.

use crate::error::{BroadlinkError, Result};
use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

/// Read the current state.
pub const FLAG_READ: u8 = 1;
/// Write the fields present in the request.
pub const FLAG_WRITE: u8 = 2;

/// Checksum seed for the JSON packet family.
pub const JSON_CHECKSUM_SEED: u16 = 0xC0AD;

/// Bulb state, both as reported and as requested. Absent fields are left
/// untouched by a write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulbState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pwr: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bulb_colormode: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub red: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub green: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blue: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hue: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saturation: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colortemp: Option<u16>,
}

impl BulbState {
    /// Reject values the firmware would silently misinterpret.
    pub fn validate(&self) -> Result<()> {
        fn check(name: &str, value: Option<u16>, max: u16) -> Result<()> {
            match value {
                Some(v) if v > max => Err(BroadlinkError::InvalidArgument(format!(
                    "{name} out of range: {v} (max {max})"
                ))),
                _ => Ok(()),
            }
        }

        check("pwr", self.pwr.map(u16::from), 1)?;
        check("brightness", self.brightness.map(u16::from), 100)?;
        check("bulb_colormode", self.bulb_colormode.map(u16::from), 1)?;
        check("hue", self.hue, 360)?;
        check("saturation", self.saturation.map(u16::from), 100)?;
        Ok(())
    }
}

/// Pack a bulb request: u16 packet length, `A5A5 5A5A`, checksum, flag,
/// `0x0B`, u32 JSON length, then the JSON document.
pub fn pack_state(flag: u8, state: &BulbState) -> Result<Vec<u8>> {
    state.validate()?;
    let data = serde_json::to_vec(state)?;

    let mut packet = vec![0u8; 0x0E];
    LittleEndian::write_u16(&mut packet[0x00..0x02], (12 + data.len()) as u16);
    LittleEndian::write_u16(&mut packet[0x02..0x04], 0xA5A5);
    LittleEndian::write_u16(&mut packet[0x04..0x06], 0x5A5A);
    packet[0x08] = flag;
    packet[0x09] = 0x0B;
    LittleEndian::write_u32(&mut packet[0x0A..0x0E], data.len() as u32);
    packet.extend_from_slice(&data);

    let checksum = crate::protocol::checksum_seeded(JSON_CHECKSUM_SEED, &packet[0x08..]);
    LittleEndian::write_u16(&mut packet[0x06..0x08], checksum);
    Ok(packet)
}

/// Unpack a bulb response: JSON length at 0x0A, document at 0x0E.
pub fn unpack_state(payload: &[u8]) -> Result<BulbState> {
    if payload.len() < 0x0E {
        return Err(BroadlinkError::BadFrame("short bulb response"));
    }
    let js_len = LittleEndian::read_u32(&payload[0x0A..0x0E]) as usize;
    let body = payload
        .get(0x0E..0x0E + js_len)
        .ok_or(BroadlinkError::BadFrame("bulb response length mismatch"))?;
    Ok(serde_json::from_slice(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_layout_and_checksum() {
        let state = BulbState {
            pwr: Some(1),
            brightness: Some(75),
            ..Default::default()
        };
        let packet = pack_state(FLAG_WRITE, &state).unwrap();

        let data_len = packet.len() - 0x0E;
        assert_eq!(
            LittleEndian::read_u16(&packet[0x00..0x02]) as usize,
            12 + data_len
        );
        assert_eq!(LittleEndian::read_u16(&packet[0x02..0x04]), 0xA5A5);
        assert_eq!(LittleEndian::read_u16(&packet[0x04..0x06]), 0x5A5A);
        assert_eq!(packet[0x08], FLAG_WRITE);
        assert_eq!(packet[0x09], 0x0B);
        assert_eq!(
            LittleEndian::read_u32(&packet[0x0A..0x0E]) as usize,
            data_len
        );
        assert_eq!(
            LittleEndian::read_u16(&packet[0x06..0x08]),
            crate::protocol::checksum_seeded(JSON_CHECKSUM_SEED, &packet[0x08..])
        );
        assert_eq!(&packet[0x0E..], br#"{"pwr":1,"brightness":75}"#);
    }

    #[test]
    fn read_request_is_empty_object() {
        let packet = pack_state(FLAG_READ, &BulbState::default()).unwrap();
        assert_eq!(&packet[0x0E..], b"{}");
        assert_eq!(packet[0x08], FLAG_READ);
    }

    #[test]
    fn response_round_trip() {
        let state = BulbState {
            pwr: Some(1),
            brightness: Some(40),
            bulb_colormode: Some(0),
            red: Some(255),
            green: Some(128),
            blue: Some(0),
            hue: Some(30),
            saturation: Some(100),
            colortemp: Some(2700),
        };
        let packet = pack_state(FLAG_WRITE, &state).unwrap();
        assert_eq!(unpack_state(&packet).unwrap(), state);
    }

    #[test]
    fn unknown_response_fields_are_ignored() {
        let mut packet = vec![0u8; 0x0E];
        let body = br#"{"pwr":0,"transitionduration":1500,"bulb_sceneidx":255}"#;
        LittleEndian::write_u32(&mut packet[0x0A..0x0E], body.len() as u32);
        packet.extend_from_slice(body);
        let state = unpack_state(&packet).unwrap();
        assert_eq!(state.pwr, Some(0));
        assert_eq!(state.brightness, None);
    }

    #[test]
    fn out_of_range_fields_are_rejected() {
        for state in [
            BulbState {
                pwr: Some(2),
                ..Default::default()
            },
            BulbState {
                brightness: Some(101),
                ..Default::default()
            },
            BulbState {
                bulb_colormode: Some(3),
                ..Default::default()
            },
            BulbState {
                hue: Some(400),
                ..Default::default()
            },
            BulbState {
                saturation: Some(150),
                ..Default::default()
            },
        ] {
            assert!(matches!(
                pack_state(FLAG_WRITE, &state),
                Err(BroadlinkError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn truncated_response_is_rejected() {
        assert!(unpack_state(&[0u8; 4]).is_err());

        let mut packet = vec![0u8; 0x0E];
        LittleEndian::write_u32(&mut packet[0x0A..0x0E], 10);
        packet.extend_from_slice(b"{}");
        assert!(matches!(
            unpack_state(&packet),
            Err(BroadlinkError::BadFrame(_))
        ));
    }
}
