pub use crate::error::Error;
pub use log::{debug, error, info, trace, warn};

/// Result alias used throughout the protocol layer.
pub type Result<T, E = Error> = std::result::Result<T, E>;
