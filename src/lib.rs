//! # Rustlink
//!
//! Synchronous Broadlink Local API implementation for local control and
//! monitoring of Broadlink-compatible devices without cloud dependencies:
//! universal IR/RF remotes, smart plugs, power strips, environment sensors,
//! light bulbs, hubs, thermostats and curtain motors.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! # fn main() -> rustlink::Result<()> {
//! for device in rustlink::discover(Duration::from_secs(5), None, None)? {
//!     println!("{device}");
//!     device.auth()?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! All I/O is blocking; each handle serializes its own traffic. Learning
//! IR/RF codes is a polling flow, packaged in [`learning`].
//!
#[macro_use]
pub mod macros;
pub mod climate;
pub mod cover;
pub mod crypto;
pub mod device;
pub mod error;
pub mod family;
pub mod hub;
pub mod learning;
pub mod light;
pub mod protocol;
pub mod remote;
pub mod scanner;
pub mod sensor;
pub mod session;
pub mod switch;
pub mod transport;

pub use device::{Device, DeviceBuilder, gendevice};
pub use error::{BroadlinkError, Result};
pub use family::Family;
pub use learning::{LearnPhase, learn_ir, learn_rf};
pub use scanner::{Scanner, discover, hello, setup, xdiscover};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[must_use]
pub fn version() -> &'static str {
    VERSION
}
