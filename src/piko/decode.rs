//! Offset-based field extraction. Responses arrive over a flaky serial
//! bridge, so every read is bounds-checked and fails closed; nothing in
//! this module panics on a truncated or garbled buffer.

use crate::piko::model::{ChannelMeasurement, InverterIdentity, OperatingStatus, TelemetryReading};
use crate::piko::units;
use crate::prelude::*;

/// Where each field sits inside a validated response. These are fixed
/// protocol knowledge; the payload of every response starts at byte 5.
pub(crate) mod offsets {
    /// `(start, end)` byte range of the model string in a DeviceInfo
    /// response.
    pub const MODEL: (usize, usize) = (5, 16);
    pub const STRING_COUNT: usize = 21;
    pub const PHASE_COUNT: usize = 28;

    pub const NAME: (usize, usize) = (5, 20);
    pub const SERIAL: (usize, usize) = (5, 18);

    /// The three firmware version words in a Version response.
    pub const VERSION_WORDS: [usize; 3] = [5, 7, 9];

    pub const STATUS: usize = 5;
    pub const ERROR_FLAG: usize = 6;
    pub const ERROR_CODE: usize = 7;

    /// Base offset of each DC string block in a Telemetry response.
    /// Within a block: volts at +0, amps at +2, watts at +4, thermal
    /// register at +6, all u16.
    pub const DC_STRING_BASE: [usize; 3] = [5, 15, 25];
    /// Base offset of each AC phase block; same internal layout.
    pub const AC_PHASE_BASE: [usize; 3] = [35, 43, 51];

    /// The single u32 counter in TotalEnergy/DailyEnergy/TotalHours
    /// responses.
    pub const COUNTER: usize = 5;
}

pub fn read_u8(buf: &[u8], offset: usize) -> Result<u8> {
    buf.get(offset).copied().ok_or(Error::OutOfBounds {
        offset,
        width: 1,
        len: buf.len(),
    })
}

/// Reads an unsigned 16-bit little-endian integer at `offset`.
pub fn read_u16_le(buf: &[u8], offset: usize) -> Result<u16> {
    match buf.get(offset..offset + 2) {
        Some(bytes) => Ok(u16::from_le_bytes([bytes[0], bytes[1]])),
        None => Err(Error::OutOfBounds {
            offset,
            width: 2,
            len: buf.len(),
        }),
    }
}

/// Reads an unsigned 32-bit little-endian integer at `offset`.
pub fn read_u32_le(buf: &[u8], offset: usize) -> Result<u32> {
    match buf.get(offset..offset + 4) {
        Some(bytes) => Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
        None => Err(Error::OutOfBounds {
            offset,
            width: 4,
            len: buf.len(),
        }),
    }
}

/// Extracts a printable string from a byte range. The inverter pads its
/// strings with NULs and spaces.
fn read_str(buf: &[u8], range: (usize, usize)) -> Result<String> {
    let (start, end) = range;
    match buf.get(start..end) {
        Some(bytes) => Ok(String::from_utf8_lossy(bytes)
            .trim_matches(|c: char| c == '\0' || c.is_whitespace())
            .to_string()),
        None => Err(Error::OutOfBounds {
            offset: start,
            width: end - start,
            len: buf.len(),
        }),
    }
}

pub fn decode_model(response: &[u8]) -> Result<(String, u8, u8)> {
    let model = read_str(response, offsets::MODEL)?;
    let string_count = read_u8(response, offsets::STRING_COUNT)?;
    let phase_count = read_u8(response, offsets::PHASE_COUNT)?;
    Ok((model, string_count, phase_count))
}

pub fn decode_name(response: &[u8]) -> Result<String> {
    read_str(response, offsets::NAME)
}

pub fn decode_serial(response: &[u8]) -> Result<String> {
    read_str(response, offsets::SERIAL)
}

/// Renders the three firmware words the way the vendor tooling does:
/// a hex word, then two dotted major.minor pairs.
pub fn decode_version(response: &[u8]) -> Result<String> {
    let [o1, o2, o3] = offsets::VERSION_WORDS;
    let part1 = read_u16_le(response, o1)?;
    let part2 = read_u16_le(response, o2)?;
    let part3 = read_u16_le(response, o3)?;
    Ok(format!(
        "{:04x} {:02x}.{:02x} {:02x}.{:02x}",
        part1,
        part2 >> 8,
        part2 & 0xff,
        part3 >> 8,
        part3 & 0xff
    ))
}

/// One volts/amps/watts/temperature block at `base`, scaled to physical
/// units.
fn decode_channel(response: &[u8], base: usize) -> Result<ChannelMeasurement> {
    Ok(ChannelMeasurement {
        volts: units::scale_voltage(read_u16_le(response, base)?),
        amps: units::scale_current(read_u16_le(response, base + 2)?),
        watts: units::scale_power(read_u16_le(response, base + 4)?),
        temperature: units::thermal_register_to_celsius(read_u16_le(response, base + 6)?),
    })
}

/// Builds one immutable reading from the five validated responses of a
/// runtime poll. Nothing is accumulated across calls, so a failed attempt
/// can never leak partial state into the next one.
pub fn decode_telemetry(
    status: &[u8],
    bulk: &[u8],
    total_energy: &[u8],
    daily_energy: &[u8],
    total_hours: &[u8],
) -> Result<TelemetryReading> {
    let status_raw = read_u8(status, offsets::STATUS)?;
    let error_flag = read_u8(status, offsets::ERROR_FLAG)?;
    let error_code = read_u16_le(status, offsets::ERROR_CODE)?;

    let dc_strings = [
        decode_channel(bulk, offsets::DC_STRING_BASE[0])?,
        decode_channel(bulk, offsets::DC_STRING_BASE[1])?,
        decode_channel(bulk, offsets::DC_STRING_BASE[2])?,
    ];
    let ac_phases = [
        decode_channel(bulk, offsets::AC_PHASE_BASE[0])?,
        decode_channel(bulk, offsets::AC_PHASE_BASE[1])?,
        decode_channel(bulk, offsets::AC_PHASE_BASE[2])?,
    ];

    let dc_power = dc_strings.iter().map(|c| c.watts).sum();
    let ac_power = ac_phases.iter().map(|c| c.watts).sum();

    Ok(TelemetryReading {
        dc_strings,
        ac_phases,
        dc_power,
        ac_power,
        total_energy_wh: read_u32_le(total_energy, offsets::COUNTER)?,
        daily_energy_wh: read_u32_le(daily_energy, offsets::COUNTER)?,
        total_hours: units::seconds_to_hours(read_u32_le(total_hours, offsets::COUNTER)?),
        status: OperatingStatus::try_from(status_raw).ok(),
        error_flag,
        error_code,
    })
}

/// Assembles an identity from whichever metadata sub-responses survived
/// validation. `None` entries leave the field at its default and clear the
/// `complete` flag; decode failures inside a present response do the same.
pub fn assemble_identity(
    device_info: Option<&[u8]>,
    name: Option<&[u8]>,
    serial: Option<&[u8]>,
    version: Option<&[u8]>,
) -> InverterIdentity {
    let mut identity = InverterIdentity::default();
    let mut complete = true;

    match device_info.map(decode_model) {
        Some(Ok((model, string_count, phase_count))) => {
            identity.model = model;
            identity.string_count = string_count;
            identity.phase_count = phase_count;
        }
        _ => complete = false,
    }
    match name.map(decode_name) {
        Some(Ok(name)) => identity.name = name,
        _ => complete = false,
    }
    match serial.map(decode_serial) {
        Some(Ok(serial)) => identity.serial = serial,
        _ => complete = false,
    }
    match version.map(decode_version) {
        Some(Ok(version)) => identity.version = version,
        _ => complete = false,
    }

    identity.complete = complete;
    identity
}
