//! Dive planning, a complete profile with its decompression table.

use serde::Serialize;
use tracing::info;

use super::engine::Engine;
use super::error::Result;
use super::pipeline::Sender;
use super::step::Step;
use super::table::{DecoStop, DecoTable};
use super::validator::ModelValidator;

/// Calculated dive plan.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub steps: Vec<Step>,
    pub table: DecoTable,
    /// Dive runtime (s)
    pub runtime: f64,
    /// Maximum depth (m)
    pub max_depth: f64,
}

impl Plan {
    pub fn deco_required(&self) -> bool {
        !self.table.is_empty()
    }

    pub fn first_stop(&self) -> Option<&DecoStop> {
        self.table.first()
    }
}

/// Calculate dive profile for `depth` (m) and `bottom_time` (min), building
/// the decompression table and validating every step against the model.
pub fn plan(engine: &Engine, depth: f64, bottom_time: f64) -> Result<Plan> {
    let mut table = DecoTable::new();
    let mut validator = ModelValidator::new(engine);

    let profile = engine.calculate(depth, bottom_time)?;
    let steps = Sender::new(profile, vec![&mut table, &mut validator]).run()?;

    let runtime = steps.last().map_or(0.0, |s| s.time);
    let max_depth = steps.iter().map(|s| s.depth).fold(0.0, f64::max);
    info!(
        depth,
        bottom_time,
        stops = table.len(),
        total = table.total(),
        runtime,
        "dive planned"
    );
    Ok(Plan {
        steps,
        table,
        runtime,
        max_depth,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deco::engine::EngineConfig;
    use crate::deco::error::DecoError;
    use crate::deco::gas::GasMix;

    fn engine() -> Engine {
        Engine::with_gases(EngineConfig::default(), &[GasMix::air()]).unwrap()
    }

    #[test]
    fn test_plan() {
        let plan = plan(&engine(), 35.0, 40.0).unwrap();
        assert!(plan.deco_required());
        assert_eq!(Some(18.0), plan.first_stop().map(|s| s.depth));
        assert_eq!(48.0, plan.table.total());
        assert!((plan.runtime - 5595.0).abs() < 1e-6);
        assert_eq!(35.0, plan.max_depth);
    }

    #[test]
    fn test_plan_no_deco() {
        let plan = plan(&engine(), 10.0, 30.0).unwrap();
        assert!(!plan.deco_required());
        assert!(plan.first_stop().is_none());
        assert_eq!(10.0, plan.max_depth);
    }

    #[test]
    fn test_plan_within_no_decompression_limit() {
        // the ceiling at gf low would ask for a 3m stop, the surface at
        // gf high does not
        let plan = plan(&engine(), 12.0, 20.0).unwrap();
        assert!(!plan.deco_required());
        let last = plan.steps.last().unwrap();
        assert_eq!(0.0, last.depth);
        assert_eq!(0.85, last.gf);
    }

    #[test]
    fn test_plan_shallow_stop() {
        let plan = plan(&engine(), 30.0, 20.0).unwrap();
        assert_eq!(Some(&DecoStop { depth: 12.0, time: 1.0 }), plan.first_stop());
        assert_eq!(5.0, plan.table.total());
    }

    #[test]
    fn test_plan_precondition() {
        let result = plan(&engine(), -5.0, 20.0);
        assert!(matches!(result, Err(DecoError::Precondition(_))));
    }
}
