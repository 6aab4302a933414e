//! Per-device session state: encryption key, device id and packet counter,
//! plus the key-exchange payload codec.

use crate::crypto::{BroadlinkCipher, INIT_KEY};
use crate::error::{BroadlinkError, Result};
use rand::Rng;

/// Identifier sent in the key exchange. It does not have to be unique, but
/// it must stay stable for the lifetime of the pairing.
pub const CLIENT_ID: &[u8; 15] = b"527067592375216";

/// Client name reported to the device during the key exchange.
pub const CLIENT_NAME: &str = "rustlink";

/// Authenticated context of one device handle.
///
/// Created with the bootstrap key and a zero device id; both are replaced
/// when the key exchange succeeds. The packet counter starts at a random
/// value and increments once per outbound command, wrapping at 0xFFFF.
#[derive(Debug, Clone)]
pub struct Session {
    /// Current AES key (bootstrap until authenticated)
    pub key: [u8; 16],
    /// Device id assigned by the key exchange
    pub id: [u8; 4],
    /// Packet counter for the next outbound frame
    pub count: u16,
    /// Caller-chosen local MAC written into every frame
    pub local_mac: [u8; 6],
}

impl Session {
    /// Fresh unauthenticated session.
    #[must_use]
    pub fn new(local_mac: [u8; 6]) -> Self {
        Self {
            key: INIT_KEY,
            id: [0; 4],
            count: rand::rng().random(),
            local_mac,
        }
    }

    /// Drop back to the bootstrap key and a zero id, keeping the counter.
    pub fn reset(&mut self) {
        self.key = INIT_KEY;
        self.id = [0; 4];
    }

    /// Advance the packet counter and return the value for the next frame.
    pub fn next_count(&mut self) -> u16 {
        self.count = self.count.wrapping_add(1);
        self.count
    }

    /// Cipher for the session's current key.
    #[must_use]
    pub fn cipher(&self) -> BroadlinkCipher {
        BroadlinkCipher::new(self.key)
    }

    /// Whether the key exchange has completed since the last reset.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.id != [0; 4]
    }

    /// Absorb a decrypted key-exchange response: device id at 0x00–0x03,
    /// session key at 0x04–0x13.
    pub fn apply_auth(&mut self, payload: &[u8]) -> Result<()> {
        if payload.len() < 0x14 {
            return Err(BroadlinkError::BadFrame("short key-exchange response"));
        }

        let mut id = [0u8; 4];
        id.copy_from_slice(&payload[0x00..0x04]);
        let mut key = [0u8; 16];
        key.copy_from_slice(&payload[0x04..0x14]);

        if id == [0; 4] || key == [0; 16] {
            return Err(BroadlinkError::Authentication);
        }

        self.id = id;
        self.key = key;
        Ok(())
    }
}

/// Build the 80-byte key-exchange payload.
///
/// Layout: client id at 0x04–0x12, `0x01` at 0x13 and 0x2D, NUL-terminated
/// client name from 0x30. Everything else is zero.
#[must_use]
pub fn auth_payload(client_id: &[u8], name: &str) -> Vec<u8> {
    let mut payload = vec![0u8; 0x50];

    let id_len = client_id.len().min(0x0F);
    payload[0x04..0x04 + id_len].copy_from_slice(&client_id[..id_len]);
    payload[0x13] = 0x01;
    payload[0x2D] = 0x01;

    // Leave at least one trailing NUL for the name.
    let name_len = name.len().min(0x1F);
    payload[0x30..0x30 + name_len].copy_from_slice(&name.as_bytes()[..name_len]);

    payload
}
