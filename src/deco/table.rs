//! Decompression table, summary of decompression stops.

use serde::Serialize;

use super::error::Result;
use super::pipeline::StepConsumer;
use super::pressure::round_scale;
use super::step::{Phase, Step};

/// Decompression stop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DecoStop {
    /// Depth (m)
    pub depth: f64,
    /// Stop length (min)
    pub time: f64,
}

/// Decompression stops, deepest first, collected from decompression stop
/// dive steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DecoTable {
    stops: Vec<DecoStop>,
    #[serde(skip)]
    stop_start: f64,
    #[serde(skip)]
    prev: Option<(Phase, f64, f64)>,
}

impl DecoTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stops(&self) -> &[DecoStop] {
        &self.stops
    }

    pub fn first(&self) -> Option<&DecoStop> {
        self.stops.first()
    }

    pub fn last(&self) -> Option<&DecoStop> {
        self.stops.last()
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// Total decompression time (min).
    pub fn total(&self) -> f64 {
        round_scale(self.stops.iter().map(|s| s.time).sum())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DecoStop> {
        self.stops.iter()
    }
}

impl<'a> IntoIterator for &'a DecoTable {
    type Item = &'a DecoStop;
    type IntoIter = std::slice::Iter<'a, DecoStop>;

    fn into_iter(self) -> Self::IntoIter {
        self.stops.iter()
    }
}

impl StepConsumer for DecoTable {
    fn send(&mut self, step: &Step) -> Result<()> {
        if step.phase == Phase::DecoStop {
            let same_stop = matches!(
                self.prev,
                Some((Phase::DecoStop, depth, _)) if depth == step.depth
            );
            let time = |start: f64| round_scale((step.time - start) / 60.0);
            match self.stops.last_mut() {
                Some(stop) if same_stop => stop.time = time(self.stop_start),
                _ => {
                    self.stop_start = self.prev.map_or(step.time, |(_, _, t)| t);
                    self.stops.push(DecoStop {
                        depth: step.depth,
                        time: time(self.stop_start),
                    });
                }
            }
        }
        self.prev = Some((step.phase, step.depth, step.time));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deco::engine::{Engine, EngineConfig};
    use crate::deco::gas::GasMix;
    use crate::deco::pipeline::Sender;

    fn table(engine: &Engine, depth: f64, time: f64) -> DecoTable {
        let mut table = DecoTable::new();
        let profile = engine.calculate(depth, time).unwrap();
        Sender::new(profile, vec![&mut table]).run().unwrap();
        table
    }

    fn engine() -> Engine {
        Engine::with_gases(EngineConfig::default(), &[GasMix::air()]).unwrap()
    }

    fn summary(table: &DecoTable) -> Vec<(f64, f64)> {
        table.iter().map(|s| (s.depth, s.time)).collect()
    }

    #[test]
    fn test_deco_table() {
        let table = table(&engine(), 35.0, 40.0);
        assert_eq!(
            vec![(18.0, 1.0), (15.0, 1.0), (12.0, 5.0), (9.0, 5.0), (6.0, 12.0), (3.0, 24.0)],
            summary(&table)
        );
        assert_eq!(6, table.len());
        assert_eq!(48.0, table.total());
        assert_eq!(Some(18.0), table.first().map(|s| s.depth));
        assert_eq!(Some(3.0), table.last().map(|s| s.depth));
    }

    #[test]
    fn test_deco_table_with_conveyor() {
        for delta in [1.0, 60.0] {
            let mut engine = engine();
            engine.set_time_delta(Some(delta)).unwrap();
            let table = table(&engine, 35.0, 40.0);
            assert_eq!(48.0, table.total(), "delta {delta}s");
            assert_eq!(Some(&DecoStop { depth: 3.0, time: 24.0 }), table.last());
        }
    }

    #[test]
    fn test_no_deco_dive() {
        let table = table(&engine(), 10.0, 30.0);
        assert!(table.is_empty());
        assert_eq!(0.0, table.total());
        assert!(table.first().is_none());
    }

    #[test]
    fn test_serialize() {
        let table = table(&engine(), 12.0, 20.0);
        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(serde_json::json!({"stops": [{"depth": 3.0, "time": 1.0}]}), json);
    }
}
