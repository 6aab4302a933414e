//! S3 hub dialect: JSON requests addressed to sub-devices behind the hub,
//! each keyed by a 32-hex-character DID.

use crate::error::{BroadlinkError, Result};
use crate::protocol::{CHECKSUM_SEED, checksum_seeded};
use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Read request flag.
pub const FLAG_READ: u8 = 1;
/// Write request flag.
pub const FLAG_WRITE: u8 = 2;

/// Sub-devices fetched per enumeration page.
pub const SUBDEVICE_PAGE: u32 = 5;

/// Writable state of a hub sub-device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubdeviceState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pwr: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pwr1: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pwr2: Option<u8>,
}

impl SubdeviceState {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("pwr", self.pwr), ("pwr1", self.pwr1), ("pwr2", self.pwr2)] {
            if let Some(v) = value {
                if v > 1 {
                    return Err(BroadlinkError::InvalidArgument(format!(
                        "{name} out of range: {v}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Validate a sub-device identifier: 32 hex characters.
pub fn check_did(did: &str) -> Result<()> {
    if did.len() == 32 && did.bytes().all(|b| b.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(BroadlinkError::InvalidArgument(format!(
            "malformed DID: {did:?}"
        )))
    }
}

/// Request object for one page of the sub-device listing.
#[must_use]
pub fn page_request(index: u32) -> Value {
    json!({ "count": SUBDEVICE_PAGE, "index": index })
}

/// DIDs contained in one listing-response page.
#[must_use]
pub fn dids_from_page(page: &Value) -> Vec<String> {
    page.get("list")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| e.get("did").and_then(Value::as_str))
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

/// Pack a hub request: `A5A5 5A5A`, checksum, flag, `0x0B`, u32 JSON
/// length, then the JSON document. The checksum is seeded like the frame
/// checksum and covers the packet with its own field zero.
pub fn pack_request(flag: u8, state: &Value) -> Result<Vec<u8>> {
    let data = serde_json::to_vec(state)?;

    let mut packet = vec![0u8; 0x0C];
    LittleEndian::write_u16(&mut packet[0x00..0x02], 0xA5A5);
    LittleEndian::write_u16(&mut packet[0x02..0x04], 0x5A5A);
    packet[0x06] = flag;
    packet[0x07] = 0x0B;
    LittleEndian::write_u32(&mut packet[0x08..0x0C], data.len() as u32);
    packet.extend_from_slice(&data);

    let checksum = checksum_seeded(CHECKSUM_SEED, &packet);
    LittleEndian::write_u16(&mut packet[0x04..0x06], checksum);
    Ok(packet)
}

/// Unpack a hub response: JSON length at 0x08, document at 0x0C.
pub fn unpack_response(payload: &[u8]) -> Result<Value> {
    if payload.len() < 0x0C {
        return Err(BroadlinkError::BadFrame("short hub response"));
    }
    let js_len = LittleEndian::read_u32(&payload[0x08..0x0C]) as usize;
    let body = payload
        .get(0x0C..0x0C + js_len)
        .ok_or(BroadlinkError::BadFrame("hub response length mismatch"))?;
    Ok(serde_json::from_slice(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_layout_and_checksum() {
        let packet = pack_request(FLAG_READ, &json!({})).unwrap();
        assert_eq!(LittleEndian::read_u16(&packet[0x00..0x02]), 0xA5A5);
        assert_eq!(LittleEndian::read_u16(&packet[0x02..0x04]), 0x5A5A);
        assert_eq!(packet[0x06], FLAG_READ);
        assert_eq!(packet[0x07], 0x0B);
        assert_eq!(LittleEndian::read_u32(&packet[0x08..0x0C]), 2);
        assert_eq!(&packet[0x0C..], b"{}");

        let mut zeroed = packet.clone();
        zeroed[0x04] = 0;
        zeroed[0x05] = 0;
        assert_eq!(
            LittleEndian::read_u16(&packet[0x04..0x06]),
            checksum_seeded(CHECKSUM_SEED, &zeroed)
        );
    }

    #[test]
    fn response_round_trip() {
        let state = json!({ "did": "00000000000000000000595f35663135", "pwr1": 1 });
        let packet = pack_request(FLAG_WRITE, &state).unwrap();
        assert_eq!(unpack_response(&packet).unwrap(), state);
    }

    #[test]
    fn did_listing_pages() {
        assert_eq!(page_request(10), json!({ "count": 5, "index": 10 }));

        let page = json!({
            "total": 2,
            "list": [
                { "did": "00000000000000000000595f35663135" },
                { "did": "00000000000000000000a1b2c3d4e5f6", "name": "relay" },
                { "name": "no did here" },
            ]
        });
        assert_eq!(
            dids_from_page(&page),
            vec![
                "00000000000000000000595f35663135".to_string(),
                "00000000000000000000a1b2c3d4e5f6".to_string(),
            ]
        );
        assert!(dids_from_page(&json!({})).is_empty());
    }

    #[test]
    fn did_validation() {
        assert!(check_did("00000000000000000000595f35663135").is_ok());
        assert!(check_did("xyz").is_err());
        assert!(check_did("g0000000000000000000595f35663135").is_err());
    }

    #[test]
    fn subdevice_state_validation() {
        assert!(SubdeviceState::default().validate().is_ok());
        let bad = SubdeviceState {
            pwr1: Some(2),
            ..Default::default()
        };
        assert!(matches!(
            bad.validate(),
            Err(BroadlinkError::InvalidArgument(_))
        ));
    }

    #[test]
    fn truncated_response_is_rejected() {
        assert!(unpack_response(&[0u8; 4]).is_err());
        let mut packet = vec![0u8; 0x0C];
        LittleEndian::write_u32(&mut packet[0x08..0x0C], 99);
        assert!(matches!(
            unpack_response(&packet),
            Err(BroadlinkError::BadFrame(_))
        ));
    }
}
