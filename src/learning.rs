//! Learning-mode state machine and blocking capture helpers.
//!
//! The phase machine is advisory: the device itself enforces ordering and
//! answers premature polls with the not-ready code. Tracking the phase
//! client-side keeps the two-step RF flow honest and gives callers a
//! hook for progress reporting.

use crate::device::Device;
use crate::error::{BroadlinkError, Result};
use log::{debug, info};
use std::thread;
use std::time::{Duration, Instant};

/// Default budget for one learning flow.
pub const DEFAULT_LEARN_TIMEOUT: Duration = Duration::from_secs(30);

/// Default cadence of the capture polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Client-side view of the device's learning mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearnPhase {
    Idle,
    IrArmed,
    IrCaptured,
    RfSweeping,
    RfLocked,
    RfArmed,
    RfCaptured,
}

impl LearnPhase {
    fn step(self, to: LearnPhase, ok: bool) -> Result<LearnPhase> {
        if ok {
            Ok(to)
        } else {
            Err(BroadlinkError::InvalidArgument(format!(
                "learning step out of order: {self:?} -> {to:?}"
            )))
        }
    }

    /// Enter IR learning.
    pub fn arm_ir(self) -> Result<Self> {
        self.step(LearnPhase::IrArmed, self == LearnPhase::Idle)
    }

    /// Start the RF frequency sweep.
    pub fn start_sweep(self) -> Result<Self> {
        self.step(LearnPhase::RfSweeping, self == LearnPhase::Idle)
    }

    /// The sweep locked onto a carrier frequency.
    pub fn lock_frequency(self) -> Result<Self> {
        self.step(LearnPhase::RfLocked, self == LearnPhase::RfSweeping)
    }

    /// Arm RF packet capture on the locked frequency.
    pub fn arm_rf(self) -> Result<Self> {
        self.step(LearnPhase::RfArmed, self == LearnPhase::RfLocked)
    }

    /// A code was captured.
    pub fn capture(self) -> Result<Self> {
        match self {
            LearnPhase::IrArmed => Ok(LearnPhase::IrCaptured),
            LearnPhase::RfArmed => Ok(LearnPhase::RfCaptured),
            other => other.step(LearnPhase::IrCaptured, false),
        }
    }

    /// Abort an RF flow.
    pub fn cancel(self) -> Result<Self> {
        self.step(LearnPhase::Idle, self == LearnPhase::Idle || self.is_rf())
    }

    /// Whether this is one of the RF-side phases.
    #[must_use]
    pub fn is_rf(&self) -> bool {
        matches!(
            self,
            LearnPhase::RfSweeping
                | LearnPhase::RfLocked
                | LearnPhase::RfArmed
                | LearnPhase::RfCaptured
        )
    }
}

/// Poll for a captured code until the deadline.
fn poll_capture(device: &Device, deadline: Instant, interval: Duration) -> Result<Vec<u8>> {
    loop {
        thread::sleep(interval);
        match device.check_data() {
            Ok(data) => return Ok(data),
            Err(BroadlinkError::NotReady) => {
                debug!("nothing captured yet");
                if Instant::now() >= deadline {
                    return Err(BroadlinkError::LearnTimeout);
                }
            }
            Err(e) => return Err(e),
        }
    }
}

/// Capture one IR code: arm the device, then poll until a code arrives or
/// the budget runs out.
pub fn learn_ir(device: &Device, timeout: Duration) -> Result<Vec<u8>> {
    learn_ir_every(device, timeout, POLL_INTERVAL)
}

/// [`learn_ir`] with an explicit poll cadence.
pub fn learn_ir_every(device: &Device, timeout: Duration, interval: Duration) -> Result<Vec<u8>> {
    let mut phase = LearnPhase::Idle;
    device.enter_learning()?;
    phase = phase.arm_ir()?;
    info!("IR learning armed; point the remote and press a button");

    let data = poll_capture(device, Instant::now() + timeout, interval)?;
    phase.capture()?;
    info!("captured {} byte IR code", data.len());
    Ok(data)
}

/// Capture one RF code: sweep for the carrier while the user holds the
/// button, then capture the packet on a short press. The budget covers the
/// whole flow; on timeout or error the sweep is cancelled.
pub fn learn_rf(device: &Device, timeout: Duration) -> Result<Vec<u8>> {
    learn_rf_every(device, timeout, POLL_INTERVAL)
}

/// [`learn_rf`] with an explicit poll cadence.
pub fn learn_rf_every(device: &Device, timeout: Duration, interval: Duration) -> Result<Vec<u8>> {
    let deadline = Instant::now() + timeout;

    let mut phase = LearnPhase::Idle;
    device.sweep_frequency()?;
    phase = phase.start_sweep()?;
    info!("sweeping for RF frequency; hold the remote button down");

    loop {
        thread::sleep(interval);
        match device.check_frequency() {
            Ok(true) => break,
            Ok(false) => {
                if Instant::now() >= deadline {
                    let _ = device.cancel_sweep_frequency();
                    phase.cancel()?;
                    return Err(BroadlinkError::LearnTimeout);
                }
            }
            Err(e) => {
                let _ = device.cancel_sweep_frequency();
                return Err(e);
            }
        }
    }
    phase = phase.lock_frequency()?;
    info!("frequency locked");

    device.find_rf_packet()?;
    phase = phase.arm_rf()?;
    info!("RF capture armed; press the remote button briefly");

    match poll_capture(device, deadline, interval) {
        Ok(data) => {
            phase.capture()?;
            info!("captured {} byte RF code", data.len());
            Ok(data)
        }
        Err(e) => {
            let _ = device.cancel_sweep_frequency();
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ir_path() {
        let phase = LearnPhase::Idle.arm_ir().unwrap();
        assert_eq!(phase, LearnPhase::IrArmed);
        assert_eq!(phase.capture().unwrap(), LearnPhase::IrCaptured);
    }

    #[test]
    fn rf_path_passes_every_gate() {
        let phase = LearnPhase::Idle
            .start_sweep()
            .unwrap()
            .lock_frequency()
            .unwrap()
            .arm_rf()
            .unwrap()
            .capture()
            .unwrap();
        assert_eq!(phase, LearnPhase::RfCaptured);
    }

    #[test]
    fn rf_capture_cannot_skip_states() {
        assert!(LearnPhase::Idle.capture().is_err());
        assert!(LearnPhase::Idle.arm_rf().is_err());
        assert!(LearnPhase::Idle.lock_frequency().is_err());
        assert!(LearnPhase::RfSweeping.capture().is_err());
        assert!(LearnPhase::RfSweeping.arm_rf().is_err());
        assert!(LearnPhase::RfLocked.capture().is_err());
    }

    #[test]
    fn cancel_returns_to_idle_from_any_rf_state() {
        for phase in [
            LearnPhase::RfSweeping,
            LearnPhase::RfLocked,
            LearnPhase::RfArmed,
            LearnPhase::RfCaptured,
        ] {
            assert_eq!(phase.cancel().unwrap(), LearnPhase::Idle);
        }
        assert_eq!(LearnPhase::Idle.cancel().unwrap(), LearnPhase::Idle);
        assert!(LearnPhase::IrArmed.cancel().is_err());
    }

    #[test]
    fn sweeping_cannot_restart() {
        assert!(LearnPhase::RfSweeping.start_sweep().is_err());
        assert!(LearnPhase::IrArmed.arm_ir().is_err());
    }
}
