use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Operating states from the vendor manual. A closed table: raw bytes
/// outside 0..=5 are reported with an empty label, never as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum OperatingStatus {
    Off = 0,
    Standby = 1,
    Starting = 2,
    FeedInMpp = 3,
    FeedInRegulated = 4,
    FeedIn = 5,
}

impl OperatingStatus {
    pub fn label(self) -> &'static str {
        match self {
            OperatingStatus::Off => "Off",
            OperatingStatus::Standby => "Standby",
            OperatingStatus::Starting => "Starting",
            OperatingStatus::FeedInMpp => "Feed-in (MPP)",
            OperatingStatus::FeedInRegulated => "Feed-in regulated",
            OperatingStatus::FeedIn => "Feed-in",
        }
    }
}

/// One DC string or AC phase, already scaled to physical units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChannelMeasurement {
    pub volts: f64,
    pub amps: f64,
    pub watts: f64,
    pub temperature: f64,
}

/// Everything a runtime poll of one address yields. Built whole by the
/// decoder, never mutated afterwards, handed to the sink and dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryReading {
    pub dc_strings: [ChannelMeasurement; 3],
    pub ac_phases: [ChannelMeasurement; 3],
    /// Sum of the per-string powers.
    pub dc_power: f64,
    /// Sum of the per-phase powers.
    pub ac_power: f64,
    pub total_energy_wh: u32,
    pub daily_energy_wh: u32,
    /// Whole operating hours, truncated from the wire-level seconds.
    pub total_hours: u32,
    pub status: Option<OperatingStatus>,
    pub error_flag: u8,
    pub error_code: u16,
}

impl TelemetryReading {
    pub fn status_label(&self) -> &'static str {
        self.status.map(OperatingStatus::label).unwrap_or("")
    }
}

/// What a discovery probe learns about one address. `complete` is set only
/// when all four metadata sub-probes validated and decoded.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InverterIdentity {
    pub model: String,
    pub string_count: u8,
    pub phase_count: u8,
    pub name: String,
    pub serial: String,
    pub version: String,
    pub complete: bool,
}

impl std::fmt::Display for InverterIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Model: {}; String: {}; Phase: {}; Serial: {}; Version: {}",
            self.model, self.string_count, self.phase_count, self.serial, self.version
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_table_is_closed() {
        assert_eq!(OperatingStatus::try_from(3u8), Ok(OperatingStatus::FeedInMpp));
        assert_eq!(OperatingStatus::FeedInMpp.label(), "Feed-in (MPP)");
        assert!(OperatingStatus::try_from(6u8).is_err());
        assert!(OperatingStatus::try_from(255u8).is_err());
    }

    #[test]
    fn identity_display_matches_discovery_output() {
        let identity = InverterIdentity {
            model: "PIKO 5.5".into(),
            string_count: 2,
            phase_count: 3,
            name: "roof-west".into(),
            serial: "90342IK055".into(),
            version: "0102 03.04 05.06".into(),
            complete: true,
        };
        assert_eq!(
            identity.to_string(),
            "Model: PIKO 5.5; String: 2; Phase: 3; Serial: 90342IK055; Version: 0102 03.04 05.06"
        );
    }
}
