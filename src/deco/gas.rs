//! Breathing gas mixes.

use serde::{Deserialize, Serialize};

use super::error::{DecoError, Result};
use super::pressure::{floor_to_quantum, EPSILON};

/// Gas mix with its switch depth.
///
/// Fractions are in range 0.0-1.0, nitrogen is the remainder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GasMix {
    /// Switch depth in meters
    pub depth: f64,
    /// Oxygen fraction
    pub o2: f64,
    /// Helium fraction
    #[serde(default)]
    pub he: f64,
}

impl GasMix {
    pub fn new(depth: f64, o2: f64, he: f64) -> Self {
        Self { depth, o2, he }
    }

    /// Air as bottom gas.
    pub fn air() -> Self {
        Self::new(0.0, 0.21, 0.0)
    }

    pub fn n2(&self) -> f64 {
        1.0 - self.o2 - self.he
    }

    fn validate(&self) -> Result<()> {
        if !(self.depth >= 0.0) {
            return Err(DecoError::Config(format!(
                "gas mix switch depth must not be negative, got {}",
                self.depth
            )));
        }
        if !(self.o2 > 0.0 && self.o2 <= 1.0) || !(0.0..=1.0).contains(&self.he) {
            return Err(DecoError::Config(
                "gas fractions must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.o2 + self.he > 1.0 + EPSILON {
            return Err(DecoError::Config(
                "gas fractions (O2 + He) exceed 1.0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Validated gas mix list.
///
/// The first mix is the bottom gas. Decompression mixes follow in
/// registration order with strictly increasing switch depths. Travel mixes
/// are breathed during descent only and are kept sorted by switch depth.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GasList {
    mixes: Vec<GasMix>,
    travel: Vec<GasMix>,
}

impl GasList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a gas list from mixes, validating each addition.
    pub fn from_mixes(mixes: &[GasMix]) -> Result<Self> {
        let mut list = Self::new();
        for mix in mixes {
            list.add(*mix)?;
        }
        Ok(list)
    }

    /// Register a bottom or decompression gas mix.
    pub fn add(&mut self, mix: GasMix) -> Result<()> {
        mix.validate()?;
        if !self.mixes.is_empty() && mix.depth <= 0.0 {
            return Err(DecoError::Config(
                "decompression gas mix switch depth is 0m".to_string(),
            ));
        }
        if let Some(last) = self.deco_mixes().last() {
            if mix.depth <= last.depth {
                return Err(DecoError::Config(format!(
                    "gas mix switch depths must be increasing, {}m after {}m",
                    mix.depth, last.depth
                )));
            }
        }
        self.mixes.push(mix);
        Ok(())
    }

    /// Register a travel gas mix.
    pub fn add_travel(&mut self, mix: GasMix) -> Result<()> {
        mix.validate()?;
        if self.travel.iter().any(|m| (m.depth - mix.depth).abs() < EPSILON) {
            return Err(DecoError::Config(format!(
                "two or more travel gas mixes switch at {}m",
                mix.depth
            )));
        }
        let index = self.travel.partition_point(|m| m.depth < mix.depth);
        self.travel.insert(index, mix);
        Ok(())
    }

    /// Check the gas list can be used for a dive to `depth`.
    pub fn validate(&self, depth: f64) -> Result<()> {
        let Some(bottom) = self.bottom() else {
            return Err(DecoError::Precondition(
                "no bottom gas mix configured".to_string(),
            ));
        };
        if self.travel.is_empty() && bottom.depth != 0.0 {
            return Err(DecoError::Config(format!(
                "bottom gas mix switch depth must be 0m without travel gas mixes, got {}m",
                bottom.depth
            )));
        }
        let deepest = self
            .mixes
            .iter()
            .chain(&self.travel)
            .map(|m| m.depth)
            .fold(0.0, f64::max);
        if deepest > depth {
            return Err(DecoError::Precondition(format!(
                "gas mix switch depth {deepest}m deeper than dive depth {depth}m"
            )));
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.mixes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mixes.len()
    }

    pub fn mixes(&self) -> &[GasMix] {
        &self.mixes
    }

    pub fn bottom(&self) -> Option<&GasMix> {
        self.mixes.first()
    }

    /// Decompression gas mixes, shallowest switch depth first.
    pub fn deco_mixes(&self) -> &[GasMix] {
        self.mixes.get(1..).unwrap_or(&[])
    }

    /// Travel gas mixes, shallowest switch depth first.
    pub fn travel_mixes(&self) -> &[GasMix] {
        &self.travel
    }

    /// Gas mix breathed during ascent at `depth`.
    ///
    /// The decompression mix with the shallowest switch depth still at or
    /// below `depth` wins, otherwise the bottom gas is used.
    pub fn ascent_mix(&self, depth: f64) -> Option<GasMix> {
        self.deco_mixes()
            .iter()
            .find(|m| m.depth >= depth - 1e-9)
            .or_else(|| self.bottom())
            .copied()
    }

    /// Descent legs to `depth`, each leg is the destination depth and the
    /// gas mix breathed on the way.
    ///
    /// A travel mix is breathed until the switch depth of the next travel
    /// mix or of the bottom gas. When the bottom gas switch depth is the
    /// dive depth, the descent ends on the last travel mix.
    pub fn descent_stages(&self, depth: f64) -> Vec<(f64, GasMix)> {
        let Some(bottom) = self.bottom() else {
            return Vec::new();
        };
        let next = self.travel.iter().skip(1).chain(std::iter::once(bottom));
        let mut stages: Vec<(f64, GasMix)> = self
            .travel
            .iter()
            .zip(next)
            .map(|(gas, next)| (next.depth, *gas))
            .collect();
        if (bottom.depth - depth).abs() > EPSILON {
            stages.push((depth, *bottom));
        }

        // legs of zero length switch gas only
        let mut reached = 0.0;
        stages.retain(|(target, _)| {
            let keep = *target > reached + EPSILON;
            if keep {
                reached = *target;
            }
            keep
        });
        stages
    }

    /// Depths where the free ascent pauses to switch gas, deepest first.
    ///
    /// Switches happen at the switch depth floored to a stop depth, and only
    /// above `start_depth`.
    pub fn switch_depths(&self, start_depth: f64) -> Vec<f64> {
        let mut depths: Vec<f64> = self
            .deco_mixes()
            .iter()
            .rev()
            .map(|m| floor_to_quantum(m.depth))
            .filter(|d| *d > 0.0 && *d < start_depth - EPSILON)
            .collect();
        depths.dedup();
        depths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ean50() -> GasMix {
        GasMix::new(22.0, 0.5, 0.0)
    }

    fn oxygen() -> GasMix {
        GasMix::new(6.0, 1.0, 0.0)
    }

    #[test]
    fn test_n2_remainder() {
        let mix = GasMix::new(0.0, 0.18, 0.45);
        assert!((mix.n2() - 0.37).abs() < 1e-12);
    }

    #[test]
    fn test_bottom_gas_depth() {
        let mut list = GasList::from_mixes(&[GasMix::new(10.0, 0.21, 0.0)]).unwrap();
        assert!(matches!(list.validate(30.0), Err(DecoError::Config(_))));

        // allowed when descending on a travel gas
        list.add_travel(GasMix::new(0.0, 0.32, 0.0)).unwrap();
        assert!(list.validate(30.0).is_ok());
    }

    #[test]
    fn test_validate_depth() {
        let list = GasList::from_mixes(&[GasMix::air(), ean50()]).unwrap();
        assert!(list.validate(22.0).is_ok());
        assert!(matches!(list.validate(20.0), Err(DecoError::Precondition(_))));
        assert!(matches!(GasList::new().validate(20.0), Err(DecoError::Precondition(_))));
    }

    #[test]
    fn test_deco_gas_at_surface() {
        let result = GasList::from_mixes(&[GasMix::air(), GasMix::new(0.0, 0.5, 0.0)]);
        assert!(matches!(result, Err(DecoError::Config(_))));
    }

    #[test]
    fn test_travel_sorted() {
        let mut list = GasList::from_mixes(&[GasMix::new(30.0, 0.18, 0.45)]).unwrap();
        list.add_travel(GasMix::new(10.0, 0.28, 0.0)).unwrap();
        list.add_travel(GasMix::new(0.0, 0.32, 0.0)).unwrap();
        let depths: Vec<f64> = list.travel_mixes().iter().map(|m| m.depth).collect();
        assert_eq!(vec![0.0, 10.0], depths);

        let result = list.add_travel(GasMix::new(10.0, 0.21, 0.0));
        assert!(matches!(result, Err(DecoError::Config(_))));
    }

    #[test]
    fn test_descent_stages() {
        let trimix = GasMix::new(30.0, 0.18, 0.45);
        let ean32 = GasMix::new(0.0, 0.32, 0.0);
        let ean28 = GasMix::new(10.0, 0.28, 0.0);

        let list = GasList::from_mixes(&[GasMix::air(), ean50()]).unwrap();
        assert_eq!(vec![(40.0, GasMix::air())], list.descent_stages(40.0));

        let mut list = GasList::from_mixes(&[trimix]).unwrap();
        list.add_travel(ean32).unwrap();
        list.add_travel(ean28).unwrap();
        assert_eq!(
            vec![(10.0, ean32), (30.0, ean28), (50.0, trimix)],
            list.descent_stages(50.0)
        );
        // bottom gas switch at the bottom
        assert_eq!(vec![(10.0, ean32), (30.0, ean28)], list.descent_stages(30.0));
    }

    #[test]
    fn test_non_monotonic_depths() {
        let result = GasList::from_mixes(&[GasMix::air(), ean50(), oxygen()]);
        assert!(matches!(result, Err(DecoError::Config(_))));
    }

    #[test]
    fn test_duplicate_depths() {
        let result = GasList::from_mixes(&[GasMix::air(), ean50(), ean50()]);
        assert!(matches!(result, Err(DecoError::Config(_))));
    }

    #[test]
    fn test_invalid_fractions() {
        let result = GasList::from_mixes(&[GasMix::new(0.0, 1.5, 0.0)]);
        assert!(matches!(result, Err(DecoError::Config(_))));

        let result = GasList::from_mixes(&[GasMix::new(0.0, 0.6, 0.5)]);
        assert!(matches!(result, Err(DecoError::Config(_))));
    }

    #[test]
    fn test_ascent_mix() {
        let list = GasList::from_mixes(&[GasMix::air(), oxygen(), ean50()]).unwrap();
        assert_eq!(Some(GasMix::air()), list.ascent_mix(35.0));
        assert_eq!(Some(ean50()), list.ascent_mix(22.0));
        assert_eq!(Some(ean50()), list.ascent_mix(21.0));
        assert_eq!(Some(ean50()), list.ascent_mix(9.0));
        assert_eq!(Some(oxygen()), list.ascent_mix(6.0));
        assert_eq!(Some(oxygen()), list.ascent_mix(0.0));
    }

    #[test]
    fn test_switch_depths() {
        let list = GasList::from_mixes(&[GasMix::air(), oxygen(), ean50()]).unwrap();
        assert_eq!(vec![21.0, 6.0], list.switch_depths(40.0));
        assert_eq!(vec![6.0], list.switch_depths(21.0));
        assert!(list.switch_depths(6.0).is_empty());
    }
}
