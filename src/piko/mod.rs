//! The Kostal PIKO serial-over-TCP protocol: frame layout, field offsets
//! and unit scaling. Everything in here is pure; the socket lives in
//! [`crate::transport`] and the polling logic in [`crate::query`].

pub mod decode;
pub mod frame;
pub mod model;
pub mod units;

/// The gateway always listens on this port; it is part of the protocol,
/// not configuration.
pub const PORT: u16 = 81;
