//! Depth and pressure conversion.

use serde::{Deserialize, Serialize};

/// Default surface pressure (bar).
pub const SURFACE_PRESSURE: f64 = 1.01325;

/// Pressure change per metre of sea water (bar/m).
pub const METER_TO_BAR: f64 = 0.09985;

/// Depth increment between decompression stops (m).
pub const STOP_QUANTUM: f64 = 3.0;

/// Numeric tolerance used for depth and pressure comparisons.
pub const EPSILON: f64 = 1e-10;

/// Round to 10 decimal places.
pub fn round_scale(v: f64) -> f64 {
    (v * 1e10).round() / 1e10
}

/// Conversion between depth, absolute pressure and ascent/descent time.
///
/// Rates are expressed in m/min, times in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthScale {
    pub surface_pressure: f64,
    pub meter_to_bar: f64,
}

impl Default for DepthScale {
    fn default() -> Self {
        Self {
            surface_pressure: SURFACE_PRESSURE,
            meter_to_bar: METER_TO_BAR,
        }
    }
}

impl DepthScale {
    pub fn new(surface_pressure: f64, meter_to_bar: f64) -> Self {
        Self {
            surface_pressure,
            meter_to_bar,
        }
    }

    /// Absolute pressure (bar) at depth (m).
    pub fn to_pressure(&self, depth: f64) -> f64 {
        depth * self.meter_to_bar + self.surface_pressure
    }

    /// Depth (m) of an absolute pressure (bar).
    pub fn to_depth(&self, pressure: f64) -> f64 {
        round_scale((pressure - self.surface_pressure) / self.meter_to_bar)
    }

    /// Pressure change (bar) after `time` seconds at `rate` m/min.
    pub fn time_to_pressure(&self, time: f64, rate: f64) -> f64 {
        time / 60.0 * rate * self.meter_to_bar
    }

    /// Time (s) needed to change pressure by `pressure` bar at `rate` m/min.
    pub fn pressure_to_time(&self, pressure: f64, rate: f64) -> f64 {
        pressure / rate / self.meter_to_bar * 60.0
    }

    /// Pressure change rate (bar/min) for a depth rate (m/min).
    pub fn pressure_rate(&self, rate: f64) -> f64 {
        rate * self.meter_to_bar
    }

    /// Pressure difference of one stop quantum.
    pub fn quantum_pressure(&self) -> f64 {
        STOP_QUANTUM * self.meter_to_bar
    }
}

/// Time (s) to travel `distance` metres at `rate` m/min.
pub fn travel_time(distance: f64, rate: f64) -> f64 {
    distance / rate * 60.0
}

/// True if depth lies on a stop quantum boundary.
pub fn is_quantum_aligned(depth: f64) -> bool {
    let q = depth / STOP_QUANTUM;
    (q - q.round()).abs() < 1e-6
}

/// Shallowest quantum-aligned depth at or below `depth`, i.e. `depth`
/// floored to a multiple of the stop quantum.
pub fn floor_to_quantum(depth: f64) -> f64 {
    (depth / STOP_QUANTUM + 1e-9).floor() * STOP_QUANTUM
}
