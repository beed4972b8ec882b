//! Bühlmann ZH-L16 tissue model with gradient factors.
//!
//! The model tracks nitrogen and helium pressure in 16 tissue compartments.
//! Loading uses the Schreiner equation
//!
//! ```text
//! P = Palv + R * (t - 1/k) - (Palv - Pi - R/k) * e^(-k * t)
//! ```
//!
//! where `Palv = F_gas * (P_abs - P_wvp)` is inspired inert gas pressure,
//! `R = F_gas * P_rate` is the rate of its change and `k = ln(2) / T_hl`.
//! With `R = 0` the equation reduces to plain exponential loading.
//!
//! The ascent ceiling of a compartment is the Bühlmann limit extended with
//! gradient factors by Erik Baker
//!
//! ```text
//! P_l = (P - A * gf) / (gf / B + 1 - gf)
//! ```
//!
//! with `A` and `B` weighted by the N2 and He pressures for trimix.
//!
//! The first stop search relies on the ceiling check being monotone along
//! an ascent: once ascending further breaches the ceiling, ascending even
//! further must breach it too. Both variants below satisfy this.

use std::f64::consts::LN_2;

use serde::{Deserialize, Serialize};

use super::gas::GasMix;

/// Water vapour pressure in the lungs (bar).
pub const WATER_VAPOUR_PRESSURE: f64 = 0.0627;

/// Fraction of N2 in tissues at the surface.
pub const START_N2_FRACTION: f64 = 0.7902;

/// Number of tissue compartments of the ZH-L16 models.
pub const NUM_COMPARTMENTS: usize = 16;

/// Inert gas pressure in a single tissue compartment (bar).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Compartment {
    pub n2: f64,
    pub he: f64,
}

impl Compartment {
    pub fn pressure(&self) -> f64 {
        self.n2 + self.he
    }
}

/// Tissue loading, one entry per compartment.
pub type Tissues = Vec<Compartment>;

/// Compartment constants of a model variant.
#[derive(Debug)]
struct Coefficients {
    n2_a: [f64; NUM_COMPARTMENTS],
    n2_b: [f64; NUM_COMPARTMENTS],
    he_a: [f64; NUM_COMPARTMENTS],
    he_b: [f64; NUM_COMPARTMENTS],
    n2_half_life: [f64; NUM_COMPARTMENTS],
    he_half_life: [f64; NUM_COMPARTMENTS],
}

/// ZH-L16B, used for dive table calculations. Source: gfdeco.f by Baker.
static ZH_L16B: Coefficients = Coefficients {
    n2_a: [
        1.1696, 1.0000, 0.8618, 0.7562, 0.6667, 0.5600, 0.4947, 0.4500, 0.4187, 0.3798, 0.3497,
        0.3223, 0.2850, 0.2737, 0.2523, 0.2327,
    ],
    n2_b: [
        0.5578, 0.6514, 0.7222, 0.7825, 0.8126, 0.8434, 0.8693, 0.8910, 0.9092, 0.9222, 0.9319,
        0.9403, 0.9477, 0.9544, 0.9602, 0.9653,
    ],
    he_a: [
        1.6189, 1.3830, 1.1919, 1.0458, 0.9220, 0.8205, 0.7305, 0.6502, 0.5950, 0.5545, 0.5333,
        0.5189, 0.5181, 0.5176, 0.5172, 0.5119,
    ],
    he_b: [
        0.4770, 0.5747, 0.6527, 0.7223, 0.7582, 0.7957, 0.8279, 0.8553, 0.8757, 0.8903, 0.8997,
        0.9073, 0.9122, 0.9171, 0.9217, 0.9267,
    ],
    n2_half_life: [
        5.0, 8.0, 12.5, 18.5, 27.0, 38.3, 54.3, 77.0, 109.0, 146.0, 187.0, 239.0, 305.0, 390.0,
        498.0, 635.0,
    ],
    he_half_life: [
        1.88, 3.02, 4.72, 6.99, 10.21, 14.48, 20.53, 29.11, 41.20, 55.19, 70.69, 90.34, 115.29,
        147.42, 188.24, 240.03,
    ],
};

/// ZH-L16C, used by dive computers. Source: OSTC firmware.
static ZH_L16C: Coefficients = Coefficients {
    n2_a: [
        1.2599, 1.0000, 0.8618, 0.7562, 0.6200, 0.5043, 0.4410, 0.4000, 0.3750, 0.3500, 0.3295,
        0.3065, 0.2835, 0.2610, 0.2480, 0.2327,
    ],
    n2_b: [
        0.5050, 0.6514, 0.7222, 0.7825, 0.8126, 0.8434, 0.8693, 0.8910, 0.9092, 0.9222, 0.9319,
        0.9403, 0.9477, 0.9544, 0.9602, 0.9653,
    ],
    he_a: [
        1.7424, 1.3830, 1.1919, 1.0458, 0.9220, 0.8205, 0.7305, 0.6502, 0.5950, 0.5545, 0.5333,
        0.5189, 0.5181, 0.5176, 0.5172, 0.5119,
    ],
    he_b: [
        0.4245, 0.5747, 0.6527, 0.7223, 0.7582, 0.7957, 0.8279, 0.8553, 0.8757, 0.8903, 0.8997,
        0.9073, 0.9122, 0.9171, 0.9217, 0.9267,
    ],
    n2_half_life: [
        4.0, 8.0, 12.5, 18.5, 27.0, 38.3, 54.3, 77.0, 109.0, 146.0, 187.0, 239.0, 305.0, 390.0,
        498.0, 635.0,
    ],
    he_half_life: [
        1.51, 3.02, 4.72, 6.99, 10.21, 14.48, 20.53, 29.11, 41.20, 55.19, 70.69, 90.34, 115.29,
        147.42, 188.24, 240.03,
    ],
};

/// Decompression model variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TissueModel {
    #[default]
    #[serde(alias = "zhl16b")]
    ZhL16bGf,
    #[serde(alias = "zhl16c")]
    ZhL16cGf,
}

impl TissueModel {
    pub fn name(&self) -> &'static str {
        match self {
            TissueModel::ZhL16bGf => "ZH-L16B-GF",
            TissueModel::ZhL16cGf => "ZH-L16C-GF",
        }
    }

    /// Parse a model name as used in configuration, i.e. `zh-l16c-gf`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().replace('_', "-").as_str() {
            "zh-l16b-gf" | "zhl16b" | "zh-l16b" => Some(TissueModel::ZhL16bGf),
            "zh-l16c-gf" | "zhl16c" | "zh-l16c" => Some(TissueModel::ZhL16cGf),
            _ => None,
        }
    }

    pub fn compartments(&self) -> usize {
        NUM_COMPARTMENTS
    }

    fn coefficients(&self) -> &'static Coefficients {
        match self {
            TissueModel::ZhL16bGf => &ZH_L16B,
            TissueModel::ZhL16cGf => &ZH_L16C,
        }
    }

    /// Tissue loading at the surface after breathing air.
    pub fn init(&self, surface_pressure: f64) -> Tissues {
        let n2 = START_N2_FRACTION * (surface_pressure - WATER_VAPOUR_PRESSURE);
        vec![Compartment { n2, he: 0.0 }; NUM_COMPARTMENTS]
    }

    /// Load tissues with inert gas.
    ///
    /// `pressure` is the absolute pressure at the start of the exposure
    /// (bar), `time` its length (s) and `rate` the pressure change rate
    /// (bar/min), positive on descent and negative on ascent.
    pub fn load(
        &self,
        pressure: f64,
        time: f64,
        gas: &GasMix,
        rate: f64,
        tissues: &[Compartment],
    ) -> Tissues {
        if time == 0.0 {
            return tissues.to_vec();
        }
        let c = self.coefficients();
        let t = time / 60.0;
        let n2 = Loader::new(pressure, gas.n2(), rate);
        let he = Loader::new(pressure, gas.he, rate);
        tissues
            .iter()
            .enumerate()
            .map(|(i, cpt)| Compartment {
                n2: n2.load(t, cpt.n2, LN_2 / c.n2_half_life[i]),
                he: he.load(t, cpt.he, LN_2 / c.he_half_life[i]),
            })
            .collect()
    }

    /// Maximum tolerated ambient pressure for each compartment.
    pub fn limit(&self, gf: f64, tissues: &[Compartment]) -> Vec<f64> {
        debug_assert!(gf > 0.0 && gf <= 1.5, "gradient factor out of range: {gf}");
        let c = self.coefficients();
        tissues
            .iter()
            .enumerate()
            .map(|(i, cpt)| {
                let p = cpt.pressure();
                let (a, b) = if p > EPS_PRESSURE {
                    (
                        (c.n2_a[i] * cpt.n2 + c.he_a[i] * cpt.he) / p,
                        (c.n2_b[i] * cpt.n2 + c.he_b[i] * cpt.he) / p,
                    )
                } else {
                    (c.n2_a[i], c.n2_b[i])
                };
                (p - a * gf) / (gf / b + 1.0 - gf)
            })
            .collect()
    }

    /// Pressure of the ascent ceiling, the maximum of all compartment
    /// limits.
    pub fn ceiling_limit(&self, gf: f64, tissues: &[Compartment]) -> f64 {
        self.limit(gf, tissues)
            .into_iter()
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

const EPS_PRESSURE: f64 = 1e-10;

/// Schreiner equation for one inert gas.
struct Loader {
    p_alv: f64,
    r: f64,
}

impl Loader {
    fn new(pressure: f64, f_gas: f64, rate: f64) -> Self {
        Self {
            p_alv: f_gas * (pressure - WATER_VAPOUR_PRESSURE),
            r: f_gas * rate,
        }
    }

    /// `t` in minutes.
    fn load(&self, t: f64, p_i: f64, k: f64) -> f64 {
        self.p_alv + self.r * (t - 1.0 / k) - (self.p_alv - p_i - self.r / k) * (-k * t).exp()
    }
}
