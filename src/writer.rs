//! The reading sink: one subdirectory per inverter address, one CSV file
//! per calendar day, plus a `latest.csv` refreshed after every write so
//! downstream collectors always have a stable path to point at.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;

use anyhow::Context;
use chrono::Local;
use serde::{Serialize, Serializer};

use crate::piko::model::TelemetryReading;
use crate::prelude::*;
use crate::query::ReadingSink;

/// All measurement columns carry two decimals.
fn two_dp<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{value:.2}"))
}

/// One CSV line. The column names are the file's header row and match the
/// schema the original collector shipped, so existing ingest keeps working.
#[derive(Serialize)]
struct CsvRow<'a> {
    #[serde(rename = "Datetime")]
    datetime: String,
    #[serde(rename = "String 1 Volts (V)", serialize_with = "two_dp")]
    dc_string1_volts: f64,
    #[serde(rename = "String 2 Volts (V)", serialize_with = "two_dp")]
    dc_string2_volts: f64,
    #[serde(rename = "String 3 Volts (V)", serialize_with = "two_dp")]
    dc_string3_volts: f64,
    #[serde(rename = "String 1 Current (A)", serialize_with = "two_dp")]
    dc_string1_current: f64,
    #[serde(rename = "String 2 Current (A)", serialize_with = "two_dp")]
    dc_string2_current: f64,
    #[serde(rename = "String 3 Current (A)", serialize_with = "two_dp")]
    dc_string3_current: f64,
    #[serde(rename = "String 1 Power (W)", serialize_with = "two_dp")]
    dc_string1_power: f64,
    #[serde(rename = "String 2 Power (W)", serialize_with = "two_dp")]
    dc_string2_power: f64,
    #[serde(rename = "String 3 Power (W)", serialize_with = "two_dp")]
    dc_string3_power: f64,
    #[serde(rename = "String 1 Temp (C)", serialize_with = "two_dp")]
    dc_string1_temperature: f64,
    #[serde(rename = "String 2 Temp (C)", serialize_with = "two_dp")]
    dc_string2_temperature: f64,
    #[serde(rename = "String 3 Temp (C)", serialize_with = "two_dp")]
    dc_string3_temperature: f64,
    #[serde(rename = "AC Phase 1 Volts (V)", serialize_with = "two_dp")]
    ac_phase1_volts: f64,
    #[serde(rename = "AC Phase 2 Volts (V)", serialize_with = "two_dp")]
    ac_phase2_volts: f64,
    #[serde(rename = "AC Phase 3 Volts (V)", serialize_with = "two_dp")]
    ac_phase3_volts: f64,
    #[serde(rename = "AC Phase 1 Current (A)", serialize_with = "two_dp")]
    ac_phase1_current: f64,
    #[serde(rename = "AC Phase 2 Current (A)", serialize_with = "two_dp")]
    ac_phase2_current: f64,
    #[serde(rename = "AC Phase 3 Current (A)", serialize_with = "two_dp")]
    ac_phase3_current: f64,
    #[serde(rename = "AC Phase 1 Power (W)", serialize_with = "two_dp")]
    ac_phase1_power: f64,
    #[serde(rename = "AC Phase 2 Power (W)", serialize_with = "two_dp")]
    ac_phase2_power: f64,
    #[serde(rename = "AC Phase 3 Power (W)", serialize_with = "two_dp")]
    ac_phase3_power: f64,
    #[serde(rename = "AC Phase 1 Temp (C)", serialize_with = "two_dp")]
    ac_phase1_temperature: f64,
    #[serde(rename = "AC Phase 2 Temp (C)", serialize_with = "two_dp")]
    ac_phase2_temperature: f64,
    #[serde(rename = "AC Phase 3 Temp (C)", serialize_with = "two_dp")]
    ac_phase3_temperature: f64,
    #[serde(rename = "DC Power (W)", serialize_with = "two_dp")]
    dc_power: f64,
    #[serde(rename = "AC Power (W)", serialize_with = "two_dp")]
    ac_power: f64,
    #[serde(rename = "Total Energy (Wh)")]
    total_energy_wh: u32,
    #[serde(rename = "Daily Energy (Wh)")]
    daily_energy_wh: u32,
    #[serde(rename = "Total Hours (h)")]
    total_hours: u32,
    #[serde(rename = "Status")]
    status: &'a str,
    #[serde(rename = "Error")]
    error: u8,
    #[serde(rename = "Error Code")]
    error_code: u16,
}

impl<'a> CsvRow<'a> {
    fn new(datetime: String, reading: &'a TelemetryReading) -> Self {
        let [dc1, dc2, dc3] = &reading.dc_strings;
        let [ac1, ac2, ac3] = &reading.ac_phases;
        Self {
            datetime,
            dc_string1_volts: dc1.volts,
            dc_string2_volts: dc2.volts,
            dc_string3_volts: dc3.volts,
            dc_string1_current: dc1.amps,
            dc_string2_current: dc2.amps,
            dc_string3_current: dc3.amps,
            dc_string1_power: dc1.watts,
            dc_string2_power: dc2.watts,
            dc_string3_power: dc3.watts,
            dc_string1_temperature: dc1.temperature,
            dc_string2_temperature: dc2.temperature,
            dc_string3_temperature: dc3.temperature,
            ac_phase1_volts: ac1.volts,
            ac_phase2_volts: ac2.volts,
            ac_phase3_volts: ac3.volts,
            ac_phase1_current: ac1.amps,
            ac_phase2_current: ac2.amps,
            ac_phase3_current: ac3.amps,
            ac_phase1_power: ac1.watts,
            ac_phase2_power: ac2.watts,
            ac_phase3_power: ac3.watts,
            ac_phase1_temperature: ac1.temperature,
            ac_phase2_temperature: ac2.temperature,
            ac_phase3_temperature: ac3.temperature,
            dc_power: reading.dc_power,
            ac_power: reading.ac_power,
            total_energy_wh: reading.total_energy_wh,
            daily_energy_wh: reading.daily_energy_wh,
            total_hours: reading.total_hours,
            status: reading.status_label(),
            error: reading.error_flag,
            error_code: reading.error_code,
        }
    }
}

pub struct CsvWriter {
    base_dir: PathBuf,
}

impl CsvWriter {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Appends one row to the address's daily file, writing the header
    /// only when the file is first created, then refreshes `latest.csv`.
    fn append_row(&self, address: u8, row: &CsvRow<'_>) -> anyhow::Result<()> {
        let dir = self.base_dir.join(address.to_string());
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating log directory {}", dir.display()))?;

        let daily = dir.join(format!("{}.csv", Local::now().format("%d-%b-%Y")));
        let write_header = !daily.exists();

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&daily)
            .with_context(|| format!("opening {}", daily.display()))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(write_header)
            .from_writer(file);
        writer.serialize(row)?;
        writer.flush()?;
        drop(writer);

        let latest = dir.join("latest.csv");
        fs::copy(&daily, &latest)
            .with_context(|| format!("refreshing {}", latest.display()))?;

        debug!("address {address}: appended to {}", daily.display());
        Ok(())
    }
}

impl ReadingSink for CsvWriter {
    fn write_reading(&mut self, address: u8, reading: &TelemetryReading) -> anyhow::Result<()> {
        let datetime = Local::now().format("%Y-%m-%dT%H:%M:%S").to_string();
        self.append_row(address, &CsvRow::new(datetime, reading))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piko::model::{ChannelMeasurement, OperatingStatus};

    fn sample_reading() -> TelemetryReading {
        let dc1 = ChannelMeasurement {
            volts: 450.7,
            amps: 8.15,
            watts: 3672.0,
            temperature: 22.0,
        };
        TelemetryReading {
            dc_strings: [dc1, Default::default(), Default::default()],
            ac_phases: [Default::default(); 3],
            dc_power: 3672.0,
            ac_power: 0.0,
            total_energy_wh: 1_234_567,
            daily_energy_wh: 8_042,
            total_hours: 10,
            status: Some(OperatingStatus::FeedInMpp),
            error_flag: 0,
            error_code: 0,
        }
    }

    fn daily_file(dir: &std::path::Path) -> PathBuf {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .find(|p| p.file_name().unwrap() != "latest.csv")
            .expect("daily csv missing")
    }

    #[test]
    fn header_once_then_rows_and_latest_refresh() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let mut writer = CsvWriter::new(tmp.path());
        let reading = sample_reading();

        writer.write_reading(3, &reading)?;
        writer.write_reading(3, &reading)?;

        let address_dir = tmp.path().join("3");
        let daily = daily_file(&address_dir);
        let contents = fs::read_to_string(&daily)?;
        let lines: Vec<&str> = contents.lines().collect();

        assert_eq!(lines.len(), 3, "header plus two data rows");
        assert!(lines[0].starts_with("Datetime,String 1 Volts (V),String 2 Volts (V)"));
        assert!(lines[0].ends_with("Status,Error,Error Code"));
        assert!(lines[1].contains("450.70"));
        assert!(lines[1].contains("8.15"));
        assert!(lines[1].contains("3672.00"));
        assert!(lines[1].contains("1234567"));
        assert!(lines[1].contains("Feed-in (MPP)"));

        let latest = fs::read_to_string(address_dir.join("latest.csv"))?;
        assert_eq!(latest, contents);
        Ok(())
    }

    #[test]
    fn addresses_get_their_own_directories() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let mut writer = CsvWriter::new(tmp.path());
        let reading = sample_reading();

        writer.write_reading(1, &reading)?;
        writer.write_reading(254, &reading)?;

        assert!(tmp.path().join("1").join("latest.csv").exists());
        assert!(tmp.path().join("254").join("latest.csv").exists());
        Ok(())
    }
}
