//! Hysen-family thermostat dialect. Commands are Modbus-style bodies
//! wrapped in a little-endian length and a CRC-16/MODBUS trailer, carried
//! inside the generic encrypted command.

use crate::error::{BroadlinkError, Result};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use crc::Crc;

const CRC16: Crc<u16> = Crc::<u16>::new(&crc::CRC_16_MODBUS);

/// One schedule entry: the temperature that becomes effective at the start
/// time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HysenPeriod {
    pub start_hour: u8,
    pub start_minute: u8,
    pub temp: f64,
}

/// Decoded thermostat status, timer schedule included.
#[derive(Debug, Clone, PartialEq)]
pub struct HysenStatus {
    pub remote_lock: bool,
    pub power: bool,
    pub active: bool,
    pub temp_manual: bool,
    pub room_temp: f64,
    pub thermostat_temp: f64,
    pub auto_mode: u8,
    pub loop_mode: u8,
    pub sensor: u8,
    pub osv: u8,
    pub dif: u8,
    pub svh: u8,
    pub svl: u8,
    pub room_temp_adj: f64,
    pub fre: u8,
    pub poweron: u8,
    pub external_temp: f64,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub dayofweek: u8,
    pub weekday: Vec<HysenPeriod>,
    pub weekend: Vec<HysenPeriod>,
}

/// Wrap a request body: u16 length (body + CRC), body, CRC-16/MODBUS.
#[must_use]
pub fn wrap_request(body: &[u8]) -> Vec<u8> {
    let mut packet = Vec::with_capacity(body.len() + 4);
    let mut len = [0u8; 2];
    LittleEndian::write_u16(&mut len, (body.len() + 2) as u16);
    packet.extend_from_slice(&len);
    packet.extend_from_slice(body);
    let mut crc = [0u8; 2];
    LittleEndian::write_u16(&mut crc, CRC16.checksum(body));
    packet.extend_from_slice(&crc);
    packet
}

/// Unwrap a response: length-check, CRC-check, return the body.
pub fn unwrap_response(payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() < 4 {
        return Err(BroadlinkError::BadFrame("short thermostat response"));
    }
    let p_len = usize::from(LittleEndian::read_u16(&payload[0x00..0x02]));
    if p_len + 2 > payload.len() || p_len < 2 {
        return Err(BroadlinkError::BadFrame("thermostat length mismatch"));
    }

    let body = &payload[0x02..p_len];
    let nominal = LittleEndian::read_u16(&payload[p_len..p_len + 2]);
    if CRC16.checksum(body) != nominal {
        return Err(BroadlinkError::BadFrame("thermostat CRC mismatch"));
    }
    Ok(body.to_vec())
}

/// Read `regs` holding registers starting at 0.
#[must_use]
pub fn status_request(regs: u8) -> Vec<u8> {
    vec![0x01, 0x03, 0x00, 0x00, 0x00, regs]
}

/// Target temperature for manual mode (also activates manual mode).
#[must_use]
pub fn set_temp_request(temp: f64) -> Vec<u8> {
    vec![0x01, 0x06, 0x00, 0x01, 0x00, (temp * 2.0) as u8]
}

/// Power and remote-lock flags.
#[must_use]
pub fn set_power_request(power: bool, remote_lock: bool) -> Vec<u8> {
    vec![0x01, 0x06, 0x00, 0x00, u8::from(remote_lock), u8::from(power)]
}

/// Scheduling mode. `loop_mode` selects the weekday/weekend split,
/// `auto_mode` 1 runs the schedule, 0 holds the last manual temperature.
#[must_use]
pub fn set_mode_request(auto_mode: u8, loop_mode: u8, sensor: u8) -> Vec<u8> {
    let mode_byte = ((loop_mode + 1) << 4) + auto_mode;
    vec![0x01, 0x06, 0x00, 0x02, mode_byte, sensor]
}

/// Device clock. `day` is ISO: 1 Monday … 7 Sunday.
#[must_use]
pub fn set_time_request(hour: u8, minute: u8, second: u8, day: u8) -> Vec<u8> {
    vec![
        0x01, 0x10, 0x00, 0x08, 0x00, 0x02, 0x04, hour, minute, second, day,
    ]
}

/// Room temperature from a short status body.
pub fn room_temp_from(body: &[u8]) -> Result<f64> {
    body.get(0x05)
        .map(|&b| f64::from(b) / 2.0)
        .ok_or(BroadlinkError::BadFrame("short thermostat status"))
}

/// External-sensor temperature from a short status body.
pub fn external_temp_from(body: &[u8]) -> Result<f64> {
    body.get(18)
        .map(|&b| f64::from(b) / 2.0)
        .ok_or(BroadlinkError::BadFrame("short thermostat status"))
}

impl HysenStatus {
    /// Decode a full (22-register) status body.
    pub fn parse(body: &[u8]) -> Result<Self> {
        if body.len() < 47 {
            return Err(BroadlinkError::BadFrame("short thermostat status"));
        }

        let period = |i: usize| HysenPeriod {
            start_hour: body[2 * i + 23],
            start_minute: body[2 * i + 24],
            temp: f64::from(body[i + 39]) / 2.0,
        };

        Ok(Self {
            remote_lock: body[3] & 1 != 0,
            power: body[4] & 1 != 0,
            active: (body[4] >> 4) & 1 != 0,
            temp_manual: (body[4] >> 6) & 1 != 0,
            room_temp: f64::from(body[5]) / 2.0,
            thermostat_temp: f64::from(body[6]) / 2.0,
            auto_mode: body[7] & 0x0F,
            loop_mode: body[7] >> 4,
            sensor: body[8],
            osv: body[9],
            dif: body[10],
            svh: body[11],
            svl: body[12],
            room_temp_adj: f64::from(BigEndian::read_i16(&body[13..15])) / 10.0,
            fre: body[15],
            poweron: body[16],
            external_temp: f64::from(body[18]) / 2.0,
            hour: body[19],
            minute: body[20],
            second: body[21],
            dayofweek: body[22],
            weekday: (0..6).map(period).collect(),
            weekend: (6..8).map(period).collect(),
        })
    }
}
