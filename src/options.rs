use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "UPPER")]
pub enum Mode {
    /// Probe addresses 1-254 for inverter identities.
    Discovery,
    /// Collect telemetry for the given address range and log it to CSV.
    Runtime,
}

/// Polls Kostal PIKO inverters behind a TCP serial gateway.
#[derive(Debug, Parser)]
#[clap(author, version)]
pub struct Options {
    /// IP address or hostname of the inverter gateway
    pub host: String,

    /// First bus address to query (1-255)
    #[clap(value_parser = clap::value_parser!(u8).range(1..))]
    pub start_address: u8,

    /// Last bus address to query (1-255)
    #[clap(value_parser = clap::value_parser!(u8).range(1..))]
    pub end_address: u8,

    /// Directory the CSV logs are written under
    pub log_dir: PathBuf,

    /// Query mode
    #[clap(value_enum, ignore_case = true)]
    pub mode: Mode,

    /// 0 = errors only, 1 = progress, 2 = protocol detail and frame dumps
    #[clap(default_value_t = 0)]
    pub verbosity: u8,
}

impl Options {
    pub fn new() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_original_argument_order() {
        let options = Options::try_parse_from([
            "piko-poll",
            "192.168.1.3",
            "1",
            "4",
            "/opt/logging",
            "RUNTIME",
            "2",
        ])
        .unwrap();
        assert_eq!(options.host, "192.168.1.3");
        assert_eq!(options.start_address, 1);
        assert_eq!(options.end_address, 4);
        assert_eq!(options.log_dir, PathBuf::from("/opt/logging"));
        assert_eq!(options.mode, Mode::Runtime);
        assert_eq!(options.verbosity, 2);
    }

    #[test]
    fn verbosity_defaults_to_quiet() {
        let options =
            Options::try_parse_from(["piko-poll", "host", "1", "1", "/tmp/x", "DISCOVERY"])
                .unwrap();
        assert_eq!(options.verbosity, 0);
        assert_eq!(options.mode, Mode::Discovery);
    }

    #[test]
    fn address_zero_is_rejected_at_the_parser() {
        assert!(
            Options::try_parse_from(["piko-poll", "host", "0", "4", "/tmp/x", "RUNTIME"]).is_err()
        );
    }
}
