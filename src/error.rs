//! Error types and result definitions for the rustlink crate.
//! Includes Broadlink firmware error codes and conversion from standard IO/JSON errors.

use thiserror::Error;

/// Represents all possible errors that can occur when communicating with a Broadlink device.
#[derive(Error, Debug, Clone)]
pub enum BroadlinkError {
    /// Standard IO error (socket creation, send, bind, etc.)
    #[error("IO error: {0}")]
    Io(String),

    /// No datagram arrived within the timeout, across all retries
    #[error("Timeout waiting for device")]
    NetworkTimeout,

    /// The response frame was malformed (bad magic, checksum or length)
    #[error("Bad frame: {0}")]
    BadFrame(&'static str),

    /// The key exchange failed or returned unusable key material
    #[error("Authentication failed")]
    Authentication,

    /// The device reported a firmware error code
    #[error("Device error {code:#06x}: {}", firmware_error_message(*code))]
    Device {
        /// Error code from bytes 0x22–0x23 of the response frame
        code: u16,
    },

    /// The device has nothing to report yet; poll again later
    #[error("Device not ready")]
    NotReady,

    /// The dispatch table has no command dialect for this device type
    #[error("Unsupported device type {0:#06x}")]
    UnsupportedDevice(u16),

    /// Learning-mode polling exhausted its budget without a capture
    #[error("Learning timed out without a capture")]
    LearnTimeout,

    /// A caller-supplied value was rejected before hitting the wire
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// JSON serialization or deserialization error
    #[error("JSON error: {0}")]
    Json(String),
}

/// A specialized Result type for Broadlink operations.
pub type Result<T> = std::result::Result<T, BroadlinkError>;

impl From<std::io::Error> for BroadlinkError {
    fn from(err: std::io::Error) -> Self {
        BroadlinkError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BroadlinkError {
    fn from(err: serde_json::Error) -> Self {
        BroadlinkError::Json(err.to_string())
    }
}

/// Map a firmware error code to a result.
///
/// `0xFFF6` is the soft "nothing captured yet" signal emitted during
/// learning-mode polls and surfaces as [`BroadlinkError::NotReady`].
pub fn check_firmware_code(code: u16) -> Result<()> {
    match code {
        0 => Ok(()),
        READ_ERROR => Err(BroadlinkError::NotReady),
        code => Err(BroadlinkError::Device { code }),
    }
}

// Firmware error responses, as reported at bytes 0x22-0x23 of a frame.
define_firmware_errors! {
    AUTHENTICATION_FAILED = 0xFFFF => "Authentication failed",
    LOGGED_OUT = 0xFFFE => "You have been logged out",
    DEVICE_OFFLINE = 0xFFFD => "The device is offline",
    COMMAND_NOT_SUPPORTED = 0xFFFC => "Command not supported",
    STORAGE_FULL = 0xFFFB => "The device storage is full",
    STRUCTURE_ABNORMAL = 0xFFFA => "Structure is abnormal",
    AUTHORIZATION_EXPIRED = 0xFFF9 => "Control key is expired",
    SEND_ERROR = 0xFFF8 => "Send error",
    WRITE_ERROR = 0xFFF7 => "Write error",
    READ_ERROR = 0xFFF6 => "Read error",
    SSID_NOT_FOUND = 0xFFF5 => "SSID could not be found in AP configuration",
}
