//! RM-family payload dialect: learning-mode commands, code transmission,
//! pulse conversion and sensor decoding.
//!
//! RM4-generation devices speak the same dialect behind a two-byte request
//! prefix, which also shifts every response offset.

use crate::error::{BroadlinkError, Result};
use crate::family::Family;
use crate::sensor::SensorReading;

/// IR transmission.
pub const MODALITY_IR: u8 = 0x26;
/// 433 MHz radio.
pub const MODALITY_RF433: u8 = 0xB2;
/// 315 MHz radio.
pub const MODALITY_RF315: u8 = 0xD7;

/// Device ticks per microsecond, as a ratio.
const TICK_NUM: u64 = 269;
const TICK_DEN: u64 = 8192;

pub const ENTER_LEARNING: u8 = 0x03;
pub const CHECK_DATA: u8 = 0x04;
pub const SWEEP_FREQUENCY: u8 = 0x19;
pub const CHECK_FREQUENCY: u8 = 0x1A;
pub const FIND_RF_PACKET: u8 = 0x1B;
pub const CANCEL_SWEEP: u8 = 0x1E;

/// Generation-specific framing of the shared remote dialect.
#[derive(Debug, Clone, Copy)]
pub struct RmProfile {
    /// Prefix for request payloads
    pub request_prefix: &'static [u8],
    /// Prefix for code-sending payloads
    pub send_prefix: &'static [u8],
    /// Command byte of the sensor query
    pub sensor_command: u8,
    /// Divisor for the fractional sensor byte
    pub sensor_divisor: f64,
}

const RM: RmProfile = RmProfile {
    request_prefix: &[],
    send_prefix: &[],
    sensor_command: 0x01,
    sensor_divisor: 10.0,
};

const RM4: RmProfile = RmProfile {
    request_prefix: &[0x04, 0x00],
    send_prefix: &[0xDA, 0x00],
    sensor_command: 0x24,
    sensor_divisor: 100.0,
};

/// Profile for a remote-capable family.
#[must_use]
pub fn profile(family: Family) -> Option<&'static RmProfile> {
    match family {
        Family::Rm => Some(&RM),
        Family::Rm4 => Some(&RM4),
        _ => None,
    }
}

impl RmProfile {
    /// Offset of response data past the prefix and the 4-byte command echo.
    #[must_use]
    pub fn data_offset(&self) -> usize {
        self.request_prefix.len() + 4
    }

    /// 16-byte request payload: prefix, command byte, zero fill.
    #[must_use]
    pub fn command_payload(&self, command: u8) -> Vec<u8> {
        let mut payload = vec![0u8; 16];
        payload[..self.request_prefix.len()].copy_from_slice(self.request_prefix);
        payload[self.request_prefix.len()] = command;
        payload
    }

    /// Payload transmitting a device-native code: prefix, `02 00 00 00`,
    /// then the raw code.
    #[must_use]
    pub fn send_data_payload(&self, data: &[u8]) -> Vec<u8> {
        let mut payload =
            Vec::with_capacity(self.send_prefix.len() + 4 + data.len());
        payload.extend_from_slice(self.send_prefix);
        payload.extend_from_slice(&[0x02, 0x00, 0x00, 0x00]);
        payload.extend_from_slice(data);
        payload
    }

    /// Extract the captured code from a learning-poll response.
    pub fn captured_data(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let offset = self.data_offset();
        if payload.len() <= offset {
            return Err(BroadlinkError::BadFrame("short learning response"));
        }
        Ok(payload[offset..].to_vec())
    }

    /// Decode a boolean poll response (frequency lock, RF armed).
    pub fn flag_response(&self, payload: &[u8]) -> Result<bool> {
        let offset = self.data_offset();
        payload
            .get(offset)
            .map(|&b| b == 1)
            .ok_or(BroadlinkError::BadFrame("short flag response"))
    }

    /// Decode a sensor query response. Temperature and humidity carry the
    /// integer part and a fractional byte; light, air quality and noise
    /// follow where the hardware has the sensors.
    pub fn sensors_from(&self, payload: &[u8]) -> Result<SensorReading> {
        let offset = self.data_offset();
        if payload.len() < offset + 4 {
            return Err(BroadlinkError::BadFrame("short sensor response"));
        }
        let data = &payload[offset..];
        Ok(SensorReading {
            temperature: f64::from(data[0]) + f64::from(data[1]) / self.sensor_divisor,
            humidity: f64::from(data[2]) + f64::from(data[3]) / self.sensor_divisor,
            light: data.get(4).copied().unwrap_or(0),
            air_quality: data.get(5).copied().unwrap_or(0),
            noise: data.get(6).copied().unwrap_or(0),
        })
    }
}

/// Convert microsecond pulse lengths into a device-native code.
///
/// Header: modality, repeat count, little-endian length of the pulse
/// section. Each pulse becomes one byte of device ticks; values of 256 or
/// more are escaped with a leading zero and written big-endian.
pub fn pulses_to_data(pulses: &[u32], modality: u8, repeat: u8) -> Result<Vec<u8>> {
    let mut data = vec![modality, repeat, 0, 0];
    for &pulse in pulses {
        let ticks = u64::from(pulse) * TICK_NUM / TICK_DEN;
        if ticks > 0xFFFF {
            return Err(BroadlinkError::InvalidArgument(format!(
                "pulse of {pulse} us does not fit in a packet"
            )));
        }
        if ticks >= 0x100 {
            data.push(0x00);
            data.push((ticks >> 8) as u8);
        }
        data.push(ticks as u8);
    }

    let section_len = data.len() - 4;
    data[0x02] = section_len as u8;
    data[0x03] = (section_len >> 8) as u8;
    Ok(data)
}

/// Convert a device-native code back into microsecond pulse lengths.
///
/// Only the length-counted pulse section is decoded; captured IR codes end
/// with the `0D 05` sentinel past it.
pub fn data_to_pulses(data: &[u8]) -> Result<Vec<u32>> {
    if data.len() < 4 {
        return Err(BroadlinkError::BadFrame("short pulse data"));
    }
    let section_len = usize::from(data[0x02]) | usize::from(data[0x03]) << 8;
    let end = (4 + section_len).min(data.len());

    let mut pulses = Vec::new();
    let mut index = 4;
    while index < end {
        let mut ticks = u64::from(data[index]);
        index += 1;
        if ticks == 0 {
            if index + 1 >= end {
                return Err(BroadlinkError::BadFrame("dangling pulse escape"));
            }
            ticks = u64::from(data[index]) << 8 | u64::from(data[index + 1]);
            index += 2;
        }
        pulses.push((ticks * TICK_DEN / TICK_NUM) as u32);
    }
    Ok(pulses)
}
