//! Dive steps produced by the engine.

use serde::{Deserialize, Serialize};

use super::gas::GasMix;
use super::model::Tissues;

/// Dive phase of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Start,
    Descent,
    Const,
    Ascent,
    DecoStop,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Start => "start",
            Phase::Descent => "descent",
            Phase::Const => "const",
            Phase::Ascent => "ascent",
            Phase::DecoStop => "decostop",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dive step, a point of a dive profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub phase: Phase,
    /// Depth (m)
    pub depth: f64,
    /// Time since the start of the dive (s)
    pub time: f64,
    /// Absolute pressure (bar)
    pub pressure: f64,
    pub tissues: Tissues,
    /// Gradient factor in effect
    pub gf: f64,
    /// Gas mix breathed while reaching this step
    pub gas: GasMix,
}

impl Step {
    /// Copy of the step breathing another gas mix. Gas switches take no
    /// time.
    pub fn with_gas(&self, gas: GasMix) -> Step {
        Step {
            gas,
            ..self.clone()
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Step({}, {}m, {}s, {}bar, gf={:.4})",
            self.phase, self.depth, self.time, self.pressure, self.gf
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deco::model::Compartment;

    #[test]
    fn test_phase_serde() {
        let json = serde_json::to_string(&Phase::DecoStop).unwrap();
        assert_eq!("\"decostop\"", json);
        assert_eq!("decostop", Phase::DecoStop.to_string());
    }

    #[test]
    fn test_with_gas() {
        let step = Step {
            phase: Phase::Ascent,
            depth: 21.0,
            time: 1200.0,
            pressure: 3.11010,
            tissues: vec![Compartment { n2: 2.0, he: 0.0 }],
            gf: 0.3,
            gas: GasMix::air(),
        };
        let ean50 = GasMix::new(22.0, 0.5, 0.0);
        let switched = step.with_gas(ean50);
        assert_eq!(ean50, switched.gas);
        assert_eq!(step.time, switched.time);
        assert_eq!(step.tissues, switched.tissues);
    }
}
