use std::time::Duration;

/// Everything that can go wrong between building a request and handing a
/// decoded reading to the sink, plus the precondition failures checked
/// before any network activity.
///
/// Frame and decode errors are always recoverable: the engine treats the
/// affected sub-response as missing and either degrades the probe or burns
/// a retry attempt. Transport errors are recoverable at per-address
/// granularity. The remaining variants are fatal preconditions surfaced
/// before the poll loop starts.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Response failed checksum validation or is shorter than the minimum
    /// length for the command that requested it.
    #[error("bad frame: checksum mismatch or undersized response ({len} bytes)")]
    BadFrame { len: usize },

    /// A field read would run past the end of the response buffer.
    #[error("decode out of bounds: {width} bytes at offset {offset} in {len}-byte response")]
    OutOfBounds {
        offset: usize,
        width: usize,
        len: usize,
    },

    /// I/O failure on an established connection.
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    /// The gateway did not answer within the read timeout.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// Could not establish a connection to the gateway at all.
    #[error("could not connect to {host}:{port}: {reason}")]
    Connect {
        host: String,
        port: u16,
        reason: String,
    },

    #[error("invalid address range {start}..={end}")]
    AddressRange { start: u8, end: u8 },

    #[error("another instance is already running (pid {pid})")]
    AlreadyRunning { pid: u32 },

    #[error("insufficient privileges for log directory {path}")]
    Privilege { path: String },
}

impl Error {
    /// Process exit code for this failure. The numbering matches the
    /// original tool so wrapper scripts keep working.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Privilege { .. } => 1,
            Error::AlreadyRunning { .. } => 4,
            Error::AddressRange { .. } => 6,
            Error::Connect { .. } => 7,
            _ => 1,
        }
    }
}
