//! Dive step validation against the decompression model.

use tracing::debug;

use super::engine::Engine;
use super::error::{DecoError, Result};
use super::pipeline::StepConsumer;
use super::step::{Phase, Step};

/// Re-checks every dive step of a profile with the engine's tissue model.
///
/// Verified for each step:
/// - pressure matches depth
/// - time does not go back
/// - step is not above the pressure ceiling for its gradient factor
/// - the first decompression stop is at the ceiling, i.e. a further
///   ascent by one stop quantum would breach it
pub struct ModelValidator<'e> {
    engine: &'e Engine,
    prev: Option<Step>,
    first_stop_checked: bool,
}

impl<'e> ModelValidator<'e> {
    pub fn new(engine: &'e Engine) -> Self {
        Self {
            engine,
            prev: None,
            first_stop_checked: false,
        }
    }

    fn check_pressure(&self, step: &Step) -> Result<()> {
        let expected = self.engine.scale().to_pressure(step.depth);
        if (step.pressure - expected).abs() >= 1e-6 {
            return Err(DecoError::Validation(format!(
                "pressure {}bar does not match depth, expected {expected}bar at {step}",
                step.pressure
            )));
        }
        Ok(())
    }

    fn check_time(&self, step: &Step) -> Result<()> {
        match &self.prev {
            Some(prev) if step.time < prev.time => Err(DecoError::Validation(format!(
                "time goes back from {}s at {step}",
                prev.time
            ))),
            _ => Ok(()),
        }
    }

    fn check_ceiling(&self, step: &Step) -> Result<()> {
        let limit = self
            .engine
            .max_tissue_pressure(&step.tissues, Some(step.gf));
        // ok when at or below the ceiling
        if step.pressure < limit {
            return Err(DecoError::Validation(format!(
                "pressure ceiling breached at {step} (limit={limit}bar)"
            )));
        }
        Ok(())
    }

    fn check_first_stop(&mut self, step: &Step) -> Result<()> {
        if self.first_stop_checked || step.phase != Phase::DecoStop {
            return Ok(());
        }
        let Some(stop) = &self.prev else {
            return Ok(());
        };
        let limit = self.engine.max_tissue_pressure(&stop.tissues, None);
        let next = stop.pressure - self.engine.scale().quantum_pressure();
        // further ascent possible, the first stop is too deep
        if next >= limit {
            return Err(DecoError::Validation(format!(
                "first decompression stop not at ceiling at {stop} \
                 (next stop possible at {next}bar, limit={limit}bar)"
            )));
        }
        self.first_stop_checked = true;
        debug!(depth = stop.depth, "first deco stop ok");
        Ok(())
    }
}

impl StepConsumer for ModelValidator<'_> {
    fn send(&mut self, step: &Step) -> Result<()> {
        self.check_pressure(step)?;
        self.check_time(step)?;
        self.check_ceiling(step)?;
        self.check_first_stop(step)?;
        self.prev = Some(step.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deco::engine::EngineConfig;
    use crate::deco::gas::GasMix;
    use crate::deco::pipeline::Sender;

    fn engine() -> Engine {
        Engine::with_gases(EngineConfig::default(), &[GasMix::air()]).unwrap()
    }

    #[test]
    fn test_valid_profile() {
        let engine = engine();
        for (depth, time) in [(35.0, 40.0), (45.0, 25.0), (10.0, 30.0)] {
            let mut validator = ModelValidator::new(&engine);
            let profile = engine.calculate(depth, time).unwrap();
            let result = Sender::new(profile, vec![&mut validator]).run();
            assert!(result.is_ok(), "{depth}m/{time}min: {result:?}");
        }
    }

    #[test]
    fn test_valid_profile_with_gas_switch() {
        let mut engine = engine();
        engine.add_gas(GasMix::new(22.0, 0.5, 0.0)).unwrap();
        engine.set_time_delta(Some(60.0)).unwrap();
        let mut validator = ModelValidator::new(&engine);
        let profile = engine.calculate(40.0, 35.0).unwrap();
        assert!(Sender::new(profile, vec![&mut validator]).run().is_ok());
        assert!(validator.first_stop_checked);
    }

    #[test]
    fn test_ceiling_breach() {
        let engine = engine();
        let tissues = engine.model().init(engine.config().surface_pressure);
        let start = engine.step(0.0, 0.0, tissues, None);
        let bottom = engine.step_next(&engine.step_next_descent(&start, 105.0), 2400.0);
        // straight to the surface
        let surface = engine.step_next_ascent(&bottom, 210.0, None);

        let mut validator = ModelValidator::new(&engine);
        assert!(validator.send(&bottom).is_ok());
        assert!(matches!(validator.send(&surface), Err(DecoError::Validation(_))));
    }

    #[test]
    fn test_pressure_mismatch() {
        let engine = engine();
        let tissues = engine.model().init(engine.config().surface_pressure);
        let mut step = engine.step(10.0, 0.0, tissues, None);
        step.pressure += 0.01;
        let mut validator = ModelValidator::new(&engine);
        assert!(matches!(validator.send(&step), Err(DecoError::Validation(_))));
    }

    #[test]
    fn test_time_goes_back() {
        let engine = engine();
        let tissues = engine.model().init(engine.config().surface_pressure);
        let start = engine.step(10.0, 60.0, tissues, None);
        let earlier = Step {
            time: 30.0,
            ..start.clone()
        };
        let mut validator = ModelValidator::new(&engine);
        assert!(validator.send(&start).is_ok());
        assert!(matches!(validator.send(&earlier), Err(DecoError::Validation(_))));
    }

    #[test]
    fn test_first_stop_too_deep() {
        let engine = engine();
        let tissues = engine.model().init(engine.config().surface_pressure);
        let start = engine.step(0.0, 0.0, tissues, None);
        let bottom = engine.step_next(&engine.step_next_descent(&start, 105.0), 2400.0);
        // first stop at 21m while 18m is reachable
        let arrival = engine.step_next_ascent(&bottom, 84.0, None);
        assert_eq!(21.0, arrival.depth);
        let stop = engine.step_next_deco(&arrival, 60.0);

        let mut validator = ModelValidator::new(&engine);
        assert!(validator.send(&arrival).is_ok());
        assert!(matches!(validator.send(&stop), Err(DecoError::Validation(_))));
    }
}
