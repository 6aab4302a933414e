//! A1 environment-sensor dialect and the shared sensor reading type.

use crate::error::{BroadlinkError, Result};

/// Sensor query command byte.
pub const CHECK_SENSORS: u8 = 0x01;

/// One reading of the environment sensors. Remotes with a temperature
/// probe fill a subset; the A1 reports all five channels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub temperature: f64,
    pub humidity: f64,
    /// Raw light level (0 dark … 3 bright)
    pub light: u8,
    /// Raw air quality (0 excellent … 3 bad)
    pub air_quality: u8,
    /// Raw noise level (0 quiet … 2 noisy)
    pub noise: u8,
}

const LIGHT_LEVELS: [&str; 4] = ["dark", "dim", "normal", "bright"];
const AIR_LEVELS: [&str; 4] = ["excellent", "good", "normal", "bad"];
const NOISE_LEVELS: [&str; 3] = ["quiet", "normal", "noisy"];

fn level(levels: &'static [&'static str], value: u8) -> &'static str {
    levels.get(usize::from(value)).copied().unwrap_or("unknown")
}

impl SensorReading {
    /// Categorical light level.
    #[must_use]
    pub fn light_level(&self) -> &'static str {
        level(&LIGHT_LEVELS, self.light)
    }

    /// Categorical air quality.
    #[must_use]
    pub fn air_quality_level(&self) -> &'static str {
        level(&AIR_LEVELS, self.air_quality)
    }

    /// Categorical noise level.
    #[must_use]
    pub fn noise_level(&self) -> &'static str {
        level(&NOISE_LEVELS, self.noise)
    }
}

/// 16-byte sensor query payload.
#[must_use]
pub fn query_payload() -> Vec<u8> {
    let mut payload = vec![0u8; 16];
    payload[0] = CHECK_SENSORS;
    payload
}

/// Decode an A1 sensor response. The categorical channels sit at every
/// other byte past the temperature/humidity pairs.
pub fn reading_from(payload: &[u8]) -> Result<SensorReading> {
    if payload.len() < 0x08 {
        return Err(BroadlinkError::BadFrame("short sensor response"));
    }
    let data = &payload[0x04..];
    Ok(SensorReading {
        temperature: f64::from(data[0]) + f64::from(data[1]) / 10.0,
        humidity: f64::from(data[2]) + f64::from(data[3]) / 10.0,
        light: data.get(4).copied().unwrap_or(0),
        air_quality: data.get(6).copied().unwrap_or(0),
        noise: data.get(8).copied().unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_payload_is_command_plus_zeros() {
        let payload = query_payload();
        assert_eq!(payload.len(), 16);
        assert_eq!(payload[0], 0x01);
        assert!(payload[1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn full_reading_decodes_all_channels() {
        let payload = [
            0x01, 0x00, 0x00, 0x00, // command echo
            0x15, 0x07, // 21.7 C
            0x2E, 0x02, // 46.2 %
            0x02, 0x00, // light
            0x01, 0x00, // air quality
            0x02, 0x00, // noise
        ];
        let reading = reading_from(&payload).unwrap();
        assert!((reading.temperature - 21.7).abs() < 1e-9);
        assert!((reading.humidity - 46.2).abs() < 1e-9);
        assert_eq!(reading.light_level(), "normal");
        assert_eq!(reading.air_quality_level(), "good");
        assert_eq!(reading.noise_level(), "noisy");
    }

    #[test]
    fn out_of_range_levels_read_unknown() {
        let reading = SensorReading {
            temperature: 0.0,
            humidity: 0.0,
            light: 9,
            air_quality: 9,
            noise: 9,
        };
        assert_eq!(reading.light_level(), "unknown");
        assert_eq!(reading.air_quality_level(), "unknown");
        assert_eq!(reading.noise_level(), "unknown");
    }

    #[test]
    fn short_response_is_rejected() {
        assert!(reading_from(&[0x01, 0x00, 0x00]).is_err());
    }
}
