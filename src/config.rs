//! Service configuration from environment variables.

use crate::deco::{DecoError, Engine, EngineConfig, TissueModel};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    /// Engine defaults, overridden per request
    pub engine: EngineConfig,
}

impl AppConfig {
    /// Read configuration from the process environment.
    ///
    /// - `BIND_ADDR` - listen address
    /// - `DECO_MODEL` - `zh-l16b-gf` or `zh-l16c-gf`
    /// - `DECO_GF_LOW`, `DECO_GF_HIGH` - gradient factors (0.0-1.0)
    /// - `DECO_TIME_DELTA` - time between dive steps in seconds
    /// - `DECO_SURFACE_PRESSURE` - surface pressure in bar
    pub fn from_env() -> Result<Self, DecoError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, DecoError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let mut engine = EngineConfig::default();

        if let Some(name) = lookup("DECO_MODEL") {
            engine.model = TissueModel::from_name(&name)
                .ok_or_else(|| DecoError::Config(format!("DECO_MODEL: unknown model {name}")))?;
        }
        if let Some(value) = lookup("DECO_GF_LOW") {
            engine.gf_low = parse_f64("DECO_GF_LOW", &value)?;
        }
        if let Some(value) = lookup("DECO_GF_HIGH") {
            engine.gf_high = parse_f64("DECO_GF_HIGH", &value)?;
        }
        if let Some(value) = lookup("DECO_TIME_DELTA") {
            engine.time_delta = Some(parse_f64("DECO_TIME_DELTA", &value)?);
        }
        if let Some(value) = lookup("DECO_SURFACE_PRESSURE") {
            engine.surface_pressure = parse_f64("DECO_SURFACE_PRESSURE", &value)?;
        }

        // reject invalid defaults at start-up, not on first request
        Engine::new(engine.clone())?;

        Ok(Self { bind_addr, engine })
    }
}

fn parse_f64(key: &str, value: &str) -> Result<f64, DecoError> {
    value
        .trim()
        .parse()
        .map_err(|_| DecoError::Config(format!("{key}: invalid number {value:?}")))
}
