//! Broadlink payload encryption and decryption logic.
//! AES-128-CBC with the fixed bootstrap key/IV and zero padding.

use crate::error::{BroadlinkError, Result};
use aes::Aes128;
use cbc::{Decryptor, Encryptor};
use cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

/// Bootstrap AES key, shared by every unauthenticated device.
/// Replaced by a per-session key after the key exchange.
pub const INIT_KEY: [u8; 16] = [
    0x09, 0x76, 0x28, 0x34, 0x3f, 0xe9, 0x9e, 0x23, 0x76, 0x5c, 0x15, 0x13, 0xac, 0xcf, 0x8b, 0x02,
];

/// Bootstrap AES IV. The protocol reuses it for every frame of a session;
/// it is never rotated.
pub const INIT_VECTOR: [u8; 16] = [
    0x56, 0x2e, 0x17, 0x99, 0x6d, 0x09, 0x3d, 0x28, 0xdd, 0xb3, 0xba, 0x69, 0x5a, 0x2e, 0x6f, 0x58,
];

/// BroadlinkCipher provides AES-128 encryption and decryption in CBC mode.
///
/// Plaintext is zero-padded to a 16-byte multiple before encryption; there
/// is no padding marker, so decryption keeps the trailing zeros for the
/// family decoders to interpret.
pub struct BroadlinkCipher {
    /// 16-byte encryption key
    key: [u8; 16],
    /// 16-byte IV, fixed for the session
    iv: [u8; 16],
}

impl BroadlinkCipher {
    /// Create a cipher for a session key. The IV is always the bootstrap IV.
    #[must_use]
    pub fn new(key: [u8; 16]) -> Self {
        Self {
            key,
            iv: INIT_VECTOR,
        }
    }

    /// Cipher for the pre-authentication bootstrap key.
    #[must_use]
    pub fn bootstrap() -> Self {
        Self::new(INIT_KEY)
    }

    /// Encrypt data, zero-padding it to the block size first.
    #[must_use]
    pub fn encrypt(&self, data: &[u8]) -> Vec<u8> {
        let mut buf = data.to_vec();
        let remainder = buf.len() % 16;
        if remainder != 0 {
            buf.resize(buf.len() + 16 - remainder, 0);
        }

        let mut encryptor = Encryptor::<Aes128>::new(&self.key.into(), &self.iv.into());
        for chunk in buf.chunks_mut(16) {
            let block = cipher::generic_array::GenericArray::from_mut_slice(chunk);
            encryptor.encrypt_block_mut(block);
        }

        buf
    }

    /// Decrypt data. Output length equals input length; trailing pad zeros
    /// are retained.
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() % 16 != 0 {
            return Err(BroadlinkError::BadFrame(
                "ciphertext length is not a block multiple",
            ));
        }

        let mut buf = data.to_vec();
        let mut decryptor = Decryptor::<Aes128>::new(&self.key.into(), &self.iv.into());
        for chunk in buf.chunks_mut(16) {
            let block = cipher::generic_array::GenericArray::from_mut_slice(chunk);
            decryptor.decrypt_block_mut(block);
        }

        Ok(buf)
    }
}
