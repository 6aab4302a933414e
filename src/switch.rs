//! Smart-plug and power-strip dialects: SP1, SP2/SP3/SP4 and the MP1
//! four-socket strip.

use crate::error::{BroadlinkError, Result};

/// SP1 payload: the state byte followed by three zeros, sent under the
/// dedicated power command code.
#[must_use]
pub fn sp1_power_payload(state: bool) -> [u8; 4] {
    [u8::from(state), 0, 0, 0]
}

/// SP2 set-power payload.
#[must_use]
pub fn sp2_power_payload(state: bool) -> [u8; 16] {
    let mut payload = [0u8; 16];
    payload[0] = 0x02;
    payload[4] = u8::from(state);
    payload
}

/// SP2 set payload carrying both the nightlight and power bits; models
/// without a nightlight ignore bit 1.
#[must_use]
pub fn sp2_state_payload(power: bool, nightlight: bool) -> [u8; 16] {
    let mut payload = [0u8; 16];
    payload[0] = 0x02;
    payload[4] = u8::from(nightlight) << 1 | u8::from(power);
    payload
}

/// SP2 state query payload.
#[must_use]
pub fn sp2_query_payload() -> [u8; 16] {
    let mut payload = [0u8; 16];
    payload[0] = 0x01;
    payload
}

/// Relay state from an SP2 query response: bit 0 of the first data byte.
pub fn sp2_power_from(payload: &[u8]) -> Result<bool> {
    payload
        .get(0x04)
        .map(|&b| b & 1 != 0)
        .ok_or(BroadlinkError::BadFrame("short power response"))
}

/// Nightlight state from an SP2 query response: bit 1.
pub fn sp2_nightlight_from(payload: &[u8]) -> Result<bool> {
    payload
        .get(0x04)
        .map(|&b| b & 2 != 0)
        .ok_or(BroadlinkError::BadFrame("short power response"))
}

/// Energy-meter query payload for metering-capable plugs.
#[must_use]
pub fn sp2_energy_payload() -> [u8; 10] {
    [0x08, 0x00, 0xFE, 0x01, 0x05, 0x01, 0x00, 0x00, 0x00, 0x2D]
}

fn bcd(byte: u8) -> Result<u32> {
    let high = byte >> 4;
    let low = byte & 0x0F;
    if high > 9 || low > 9 {
        return Err(BroadlinkError::BadFrame("invalid BCD digit"));
    }
    Ok(u32::from(high) * 10 + u32::from(low))
}

/// Decode the meter reading in kWh: three BCD bytes, least significant
/// first, scaled by 100.
pub fn sp2_energy_from(payload: &[u8]) -> Result<f64> {
    if payload.len() < 0x0A {
        return Err(BroadlinkError::BadFrame("short energy response"));
    }
    let hundredths = bcd(payload[0x09])? * 10_000 + bcd(payload[0x08])? * 100 + bcd(payload[0x07])?;
    Ok(f64::from(hundredths) / 100.0)
}

/// MP1 socket bitmask: socket 1 is bit 0.
pub fn mp1_socket_mask(socket: u8) -> Result<u8> {
    if !(1..=4).contains(&socket) {
        return Err(BroadlinkError::InvalidArgument(format!(
            "socket index out of range: {socket}"
        )));
    }
    Ok(1 << (socket - 1))
}

/// MP1 set-power payload for a socket mask.
#[must_use]
pub fn mp1_power_payload(mask: u8, state: bool) -> [u8; 16] {
    let mut payload = [0u8; 16];
    payload[0x00] = 0x0D;
    payload[0x02] = 0xA5;
    payload[0x03] = 0xA5;
    payload[0x04] = 0x5A;
    payload[0x05] = 0x5A;
    payload[0x06] = 0xB2;
    payload[0x07] = 0xC0;
    payload[0x08] = 0x02;
    payload[0x0A] = 0x03;
    payload[0x0D] = mask;
    payload[0x0E] = if state { mask } else { 0 };
    payload
}

/// MP1 state query payload.
#[must_use]
pub fn mp1_query_payload() -> [u8; 16] {
    let mut payload = [0u8; 16];
    payload[0x00] = 0x0A;
    payload[0x02] = 0xA5;
    payload[0x03] = 0xA5;
    payload[0x04] = 0x5A;
    payload[0x05] = 0x5A;
    payload[0x06] = 0xAE;
    payload[0x07] = 0xC0;
    payload[0x08] = 0x01;
    payload[0x0A] = 0x03;
    payload
}

/// Socket bitmap from an MP1 query response.
pub fn mp1_states_from(payload: &[u8]) -> Result<[bool; 4]> {
    let bitmap = payload
        .get(0x0E)
        .copied()
        .ok_or(BroadlinkError::BadFrame("short strip response"))?;
    Ok([
        bitmap & 0x01 != 0,
        bitmap & 0x02 != 0,
        bitmap & 0x04 != 0,
        bitmap & 0x08 != 0,
    ])
}
