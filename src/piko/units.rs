//! Raw register values to physical units. The scaling factors and the
//! thermal transform are fixed protocol knowledge taken from the vendor's
//! register documentation, not tunables.

/// Voltages are transmitted in tenths of a volt.
pub fn scale_voltage(raw: u16) -> f64 {
    f64::from(raw) / 10.0
}

/// Currents are transmitted in hundredths of an ampere.
pub fn scale_current(raw: u16) -> f64 {
    f64::from(raw) / 100.0
}

/// Powers are plain watts on the wire.
pub fn scale_power(raw: u16) -> f64 {
    f64::from(raw)
}

/// The operating-time counter is transmitted in seconds; the tool reports
/// whole hours, truncated.
pub fn seconds_to_hours(raw_seconds: u32) -> u32 {
    raw_seconds / 3600
}

/// Empirical transform for the proprietary thermal register. Zero (and the
/// register never legitimately reads zero while the sensor works) means
/// "no measurement" and maps to 0.0 rather than a bogus 136 C.
pub fn thermal_register_to_celsius(raw: u16) -> f64 {
    if raw == 0 {
        return 0.0;
    }
    const T_REF: f64 = 51200.0;
    (T_REF - f64::from(raw)) / 448.0 + 22.0
}
