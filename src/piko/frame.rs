use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Register blocks the inverter knows how to serve. The discriminants are
/// the wire command codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Command {
    /// Model string, string count and phase count.
    DeviceInfo = 0x90,
    /// Operator-assigned inverter name.
    Name = 0x44,
    /// Serial number.
    SerialNumber = 0x50,
    /// Firmware version, three words.
    Version = 0x8a,
    /// Operating status, error flag and error code.
    Status = 0x57,
    /// Bulk block: per-string and per-phase volts/amps/watts/temperature.
    Telemetry = 0x43,
    /// Cumulative energy counter, Wh.
    TotalEnergy = 0x45,
    /// Energy produced today, Wh.
    DailyEnergy = 0x9d,
    /// Cumulative operating time, seconds on the wire.
    TotalHours = 0x46,
}

impl Command {
    /// Shortest response (including the checksum/terminator trailer) that
    /// can carry every field this command is decoded for. Anything shorter
    /// is rejected before decoding starts.
    pub fn min_response_len(self) -> usize {
        match self {
            Command::DeviceInfo => 28,
            Command::Name => 20,
            Command::SerialNumber => 20,
            Command::Version => 13,
            Command::Status => 9,
            Command::Telemetry => 65,
            Command::TotalEnergy => 9,
            Command::DailyEnergy => 9,
            Command::TotalHours => 9,
        }
    }
}

pub const START: u8 = 0x62;
pub const MODE: u8 = 0x03;
pub const TERMINATOR: u8 = 0x00;
pub const REQUEST_LEN: usize = 8;

/// Rolling subtraction checksum: the value that makes the covered bytes
/// plus the checksum itself sum to 0 mod 256.
fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, b| acc.wrapping_sub(*b))
}

/// Builds the fixed 8-byte request frame:
/// `0x62, addr, 0x03, addr, 0x00, command, checksum, 0x00`.
///
/// Address 0 is not a valid bus address; passing one is a caller bug, not
/// a runtime condition.
pub fn build_request(command: Command, address: u8) -> [u8; REQUEST_LEN] {
    debug_assert_ne!(address, 0, "bus addresses start at 1");

    let mut frame = [
        START,
        address,
        MODE,
        address,
        0x00,
        command.into(),
        0x00,
        TERMINATOR,
    ];
    frame[6] = checksum(&frame[..6]);
    frame
}

/// Pure predicate: does the response carry a valid checksum?
///
/// The last two bytes are `[checksum, terminator]`; the checksum covers
/// everything before them. Buffers shorter than the trailer are corrupt by
/// definition. Never panics, whatever the input.
pub fn verify_checksum(response: &[u8]) -> bool {
    match response.len().checked_sub(2) {
        Some(covered) => checksum(&response[..covered]) == response[covered],
        None => false,
    }
}

/// Test helper: wrap a payload in a valid `[checksum, terminator]` trailer,
/// the way the inverter frames its responses.
#[cfg(test)]
pub(crate) fn frame_response(payload: &[u8]) -> Vec<u8> {
    let mut out = payload.to_vec();
    out.push(checksum(payload));
    out.push(TERMINATOR);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_layout_matches_the_wire_format() {
        let frame = build_request(Command::Telemetry, 1);
        assert_eq!(frame[..6], [0x62, 0x01, 0x03, 0x01, 0x00, 0x43]);
        assert_eq!(frame[7], TERMINATOR);
    }

    #[test]
    fn request_sums_to_zero_mod_256() {
        for address in [1u8, 2, 17, 254, 255] {
            for command in [
                Command::DeviceInfo,
                Command::Name,
                Command::SerialNumber,
                Command::Version,
                Command::Status,
                Command::Telemetry,
                Command::TotalEnergy,
                Command::DailyEnergy,
                Command::TotalHours,
            ] {
                let frame = build_request(command, address);
                let sum = frame[..7].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
                assert_eq!(sum, 0, "{command:?} to {address} does not sum to zero");
                // A request is itself a validly framed buffer.
                assert!(verify_checksum(&frame));
            }
        }
    }

    #[test]
    fn undersized_buffers_are_rejected() {
        assert!(!verify_checksum(&[]));
        assert!(!verify_checksum(&[0x00]));
    }

    #[test]
    fn tampering_is_detected() {
        let mut frame = frame_response(&[0x01, 0x02, 0x03, 0x04]);
        assert!(verify_checksum(&frame));

        frame[1] ^= 0xff;
        assert!(!verify_checksum(&frame));
    }

    #[test]
    fn tampered_checksum_byte_is_detected() {
        let mut frame = frame_response(&[0xaa, 0xbb]);
        let checksum_at = frame.len() - 2;
        frame[checksum_at] = frame[checksum_at].wrapping_add(1);
        assert!(!verify_checksum(&frame));
    }
}
