//! Tolerance constants for parameter and metering tests.

/// Calibrated amplitude reads are computed in f64 from an f32 detector value.
pub const AMPLITUDE_EPSILON: f64 = 1e-9;

/// Engine-side parameters are f32; node fields are f64.
pub const PARAMETER_EPSILON: f32 = 1e-6;
