//! Data types for the deco planning API.

use serde::{Deserialize, Serialize};

use super::engine::EngineConfig;
use super::error::DecoError;
use super::gas::GasMix;
use super::model::TissueModel;
use super::step::Step;

pub const TOOL: &str = "diveops-deco-plan";
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Request limits, a plan is calculated in full before it is returned.
pub const MAX_DEPTH_M: f64 = 150.0;
pub const MAX_BOTTOM_TIME_MIN: f64 = 180.0;
pub const MIN_TIME_DELTA_S: f64 = 1.0;

/// Gas mix specification.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GasSpec {
    /// Switch depth in meters, 0 for the bottom gas
    #[serde(default)]
    pub depth_m: f64,
    /// Oxygen fraction (0.0-1.0)
    pub o2: f64,
    /// Helium fraction (0.0-1.0)
    #[serde(default)]
    pub he: f64,
    /// Travel gas, breathed during descent only
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub travel: bool,
}

impl From<&GasSpec> for GasMix {
    fn from(spec: &GasSpec) -> Self {
        GasMix::new(spec.depth_m, spec.o2, spec.he)
    }
}

fn default_gases() -> Vec<GasSpec> {
    vec![GasSpec {
        depth_m: 0.0,
        o2: 0.21,
        he: 0.0,
        travel: false,
    }]
}

/// Request payload for dive planning.
#[derive(Debug, Deserialize, Serialize)]
pub struct PlanRequest {
    /// Dive depth in meters
    pub depth_m: f64,
    /// Bottom time in minutes, descent excluded
    pub bottom_time_min: f64,
    /// Bottom gas first, then deco gases by increasing switch depth,
    /// travel gases anywhere
    #[serde(default = "default_gases")]
    pub gases: Vec<GasSpec>,
    /// Gradient factor low (0.0-1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gf_low: Option<f64>,
    /// Gradient factor high (0.0-1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gf_high: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<TissueModel>,
    /// Time between dive steps in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_delta_s: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_stop_6m: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descent: Option<bool>,
    /// Return all dive steps
    #[serde(default)]
    pub include_steps: bool,
}

impl PlanRequest {
    /// Engine configuration, request values override service defaults.
    pub fn engine_config(&self, defaults: &EngineConfig) -> EngineConfig {
        EngineConfig {
            gf_low: self.gf_low.unwrap_or(defaults.gf_low),
            gf_high: self.gf_high.unwrap_or(defaults.gf_high),
            model: self.model.unwrap_or(defaults.model),
            time_delta: self.time_delta_s.or(defaults.time_delta),
            last_stop_6m: self.last_stop_6m.unwrap_or(defaults.last_stop_6m),
            descent: self.descent.unwrap_or(defaults.descent),
            ..defaults.clone()
        }
    }

    /// Reject requests outside of the service limits.
    pub fn validate(&self) -> Result<(), DecoError> {
        if !(self.depth_m > 0.0 && self.depth_m <= MAX_DEPTH_M) {
            return Err(DecoError::Precondition(format!(
                "dive depth must be in range (0, {MAX_DEPTH_M}]m, got {}m",
                self.depth_m
            )));
        }
        if !(self.bottom_time_min >= 0.0 && self.bottom_time_min <= MAX_BOTTOM_TIME_MIN) {
            return Err(DecoError::Precondition(format!(
                "bottom time must be in range [0, {MAX_BOTTOM_TIME_MIN}]min, got {}min",
                self.bottom_time_min
            )));
        }
        match self.time_delta_s {
            Some(delta) if !(delta >= MIN_TIME_DELTA_S) => Err(DecoError::Precondition(format!(
                "time delta must be at least {MIN_TIME_DELTA_S}s, got {delta}s"
            ))),
            _ => Ok(()),
        }
    }

    /// Bottom and decompression gas mixes.
    pub fn gas_mixes(&self) -> Vec<GasMix> {
        self.gases
            .iter()
            .filter(|g| !g.travel)
            .map(GasMix::from)
            .collect()
    }

    pub fn travel_mixes(&self) -> Vec<GasMix> {
        self.gases
            .iter()
            .filter(|g| g.travel)
            .map(GasMix::from)
            .collect()
    }
}

/// Decompression stop information.
#[derive(Debug, Serialize)]
pub struct DecoStop {
    /// Stop depth in meters
    pub depth_m: f64,
    /// Stop duration in minutes
    pub duration_min: f64,
}

/// Response payload from dive planning.
#[derive(Debug, Serialize)]
pub struct PlanResponse {
    /// Tool identifier
    pub tool: &'static str,
    /// Tool version
    pub tool_version: &'static str,
    /// Decompression model used
    pub model: &'static str,
    /// Gradient factor low used
    pub gf_low: f64,
    /// Gradient factor high used
    pub gf_high: f64,

    /// Whether decompression stops are required
    pub deco_required: bool,
    /// Decompression stops, deepest first
    pub stops: Vec<DecoStop>,
    /// Total decompression stop time in minutes
    pub total_deco_min: f64,
    /// First decompression stop depth in meters
    pub first_stop_m: Option<f64>,

    /// Maximum depth reached in meters
    pub max_depth_m: f64,
    /// Total runtime in minutes
    pub runtime_min: f64,
    /// SHA256 hash of input
    pub input_hash: String,

    /// Dive steps, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<Step>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request: PlanRequest =
            serde_json::from_str(r#"{"depth_m": 30.0, "bottom_time_min": 20.0}"#).unwrap();
        assert_eq!(1, request.gases.len());
        assert_eq!(GasMix::air(), request.gas_mixes()[0]);
        assert!(!request.include_steps);

        let config = request.engine_config(&EngineConfig::default());
        assert_eq!(EngineConfig::default(), config);
    }

    #[test]
    fn test_request_overrides() {
        let request: PlanRequest = serde_json::from_str(
            r#"{
                "depth_m": 40.0,
                "bottom_time_min": 35.0,
                "gases": [{"o2": 0.21}, {"depth_m": 22.0, "o2": 0.5}],
                "gf_low": 0.2,
                "model": "zh-l16c-gf",
                "last_stop_6m": true
            }"#,
        )
        .unwrap();
        let config = request.engine_config(&EngineConfig::default());
        assert_eq!(0.2, config.gf_low);
        assert_eq!(0.85, config.gf_high);
        assert_eq!(TissueModel::ZhL16cGf, config.model);
        assert!(config.last_stop_6m);
        assert_eq!(GasMix::new(22.0, 0.5, 0.0), request.gas_mixes()[1]);
        assert!(request.travel_mixes().is_empty());
    }

    #[test]
    fn test_request_travel_gas() {
        let request: PlanRequest = serde_json::from_str(
            r#"{
                "depth_m": 40.0,
                "bottom_time_min": 20.0,
                "gases": [{"o2": 0.21, "travel": true}, {"depth_m": 30.0, "o2": 0.32}]
            }"#,
        )
        .unwrap();
        assert_eq!(vec![GasMix::new(30.0, 0.32, 0.0)], request.gas_mixes());
        assert_eq!(vec![GasMix::air()], request.travel_mixes());
    }

    #[test]
    fn test_request_limits() {
        let request = |depth: f64, time: f64, delta: Option<f64>| PlanRequest {
            depth_m: depth,
            bottom_time_min: time,
            gases: default_gases(),
            gf_low: None,
            gf_high: None,
            model: None,
            time_delta_s: delta,
            last_stop_6m: None,
            descent: None,
            include_steps: true,
        };
        assert!(request(150.0, 180.0, Some(1.0)).validate().is_ok());
        assert!(request(30.0, 0.0, None).validate().is_ok());
        for invalid in [
            request(0.0, 20.0, None),
            request(1e5, 0.0, None),
            request(f64::NAN, 20.0, None),
            request(30.0, -1.0, None),
            request(30.0, 600.0, None),
            request(30.0, 20.0, Some(0.001)),
        ] {
            let result = invalid.validate();
            assert!(matches!(result, Err(DecoError::Precondition(_))), "{invalid:?}");
        }
    }
}
