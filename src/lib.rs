pub mod error; // Error taxonomy and exit-code mapping
pub mod options; // Command line options parsing
pub mod pidfile; // Process-singleton lock
pub mod piko; // PIKO protocol: frames, field offsets, unit scaling
pub mod prelude; // Common imports and types
pub mod query; // Discovery and runtime query engine
pub mod transport; // The TCP connection to the gateway
pub mod writer; // CSV reading sink

use std::io::Write as _;
use std::path::Path;
use std::time::Instant;

use crate::options::{Mode, Options};
use crate::pidfile::PidFile;
use crate::prelude::*;
use crate::query::{AddressOutcome, QueryEngine};
use crate::transport::TcpTransport;
use crate::writer::CsvWriter;

const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

const PIDFILE_NAME: &str = "piko-poll.pid";

/// Maps the CLI verbosity level onto a log filter and installs the
/// timestamped logger. Level 2 includes raw frame dumps.
pub fn init_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.module_path().unwrap_or(""),
                record.args()
            )
        })
        .write_style(env_logger::WriteStyle::Never)
        .init();
}

/// Runs one poll: preconditions, one connection, one pass over the
/// address range in the requested mode.
pub async fn app(options: Options) -> Result<()> {
    info!("piko-poll {CARGO_PKG_VERSION} starting, mode {:?}", options.mode);

    if options.start_address > options.end_address {
        return Err(Error::AddressRange {
            start: options.start_address,
            end: options.end_address,
        });
    }

    prepare_log_dir(&options.log_dir)?;
    let _pidfile = PidFile::acquire(&options.log_dir.join(PIDFILE_NAME))?;

    let started = Instant::now();
    let transport = TcpTransport::connect(&options.host).await?;
    let mut engine = QueryEngine::new(transport);

    match options.mode {
        Mode::Runtime => {
            let mut sink = CsvWriter::new(&options.log_dir);
            let outcomes = engine
                .poll_runtime(options.start_address, options.end_address, &mut sink)
                .await?;
            let succeeded = outcomes
                .iter()
                .filter(|(_, outcome)| *outcome == AddressOutcome::Succeeded)
                .count();
            info!(
                "runtime poll complete: {succeeded}/{} addresses logged",
                outcomes.len()
            );
        }
        Mode::Discovery => {
            let found = engine.discover().await;
            for (address, identity) in &found {
                println!("Address: {address}; {identity}");
            }
            info!("discovery complete: {} inverters found", found.len());
        }
    }

    engine.into_transport().close().await;
    info!("this request took {:.2?}", started.elapsed());
    Ok(())
}

/// Creates the log directory if needed. A permission failure here is the
/// condition the original tool's root check guarded against, and keeps
/// its exit code.
fn prepare_log_dir(dir: &Path) -> Result<()> {
    match std::fs::create_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => Err(Error::Privilege {
            path: dir.display().to_string(),
        }),
        Err(e) => Err(Error::Io(e)),
    }
}
