//! Time conveyor, expands dive segments into more granular dive steps.

use tracing::warn;

use super::error::{DecoError, Result};

/// Splits a segment duration into sub-durations of `delta` seconds.
///
/// A disabled conveyor (no delta) keeps segments whole.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Conveyor {
    delta: Option<f64>,
}

impl Conveyor {
    pub fn new(delta: Option<f64>) -> Result<Self> {
        if let Some(delta) = delta {
            if !(delta > 0.0) || !delta.is_finite() {
                return Err(DecoError::Config(format!(
                    "time delta must be positive, got {delta}s"
                )));
            }
            if delta < 0.1 {
                warn!(delta, "possible calculation problems: time delta below 0.1s not supported");
            } else if delta < 60.0 && (60.0 / delta).fract() != 0.0 {
                warn!(
                    delta,
                    "possible calculation problems: time delta does not divide 1 minute evenly"
                );
            } else if delta >= 60.0 && delta % 60.0 != 0.0 {
                warn!(
                    delta,
                    "possible calculation problems: time delta modulo 1 minute is not zero"
                );
            }
        }
        Ok(Self { delta })
    }

    pub fn disabled() -> Self {
        Self { delta: None }
    }

    pub fn delta(&self) -> Option<f64> {
        self.delta
    }

    /// Sub-durations of a `total` seconds long segment.
    ///
    /// There is always at least one tray, a zero length segment yields a
    /// single zero tray. The engine relies on it to emit the end step of
    /// every segment.
    pub fn subdivide(&self, total: f64) -> Trays {
        let (delta, count) = match self.delta {
            Some(delta) if total > delta => {
                let count = (total / delta - 1e-9).ceil().max(1.0) as usize;
                (delta, count)
            }
            _ => (total, 1),
        };
        Trays {
            delta,
            total,
            count,
            index: 0,
        }
    }
}

/// Sub-durations of a segment: `delta` repeated, then the remainder.
#[derive(Debug, Clone)]
pub struct Trays {
    delta: f64,
    total: f64,
    count: usize,
    index: usize,
}

impl Iterator for Trays {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.index >= self.count {
            return None;
        }
        self.index += 1;
        if self.index == self.count {
            Some(self.total - (self.count - 1) as f64 * self.delta)
        } else {
            Some(self.delta)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.count - self.index;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Trays {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subdivide_sum_and_count() {
        let conveyor = Conveyor::new(Some(60.0)).unwrap();
        let trays: Vec<f64> = conveyor.subdivide(138.0).collect();
        assert_eq!(vec![60.0, 60.0, 18.0], trays);

        let trays: Vec<f64> = conveyor.subdivide(180.0).collect();
        assert_eq!(vec![60.0, 60.0, 60.0], trays);
    }

    #[test]
    fn test_subdivide_fraction() {
        let conveyor = Conveyor::new(Some(1.0)).unwrap();
        let trays: Vec<f64> = conveyor.subdivide(12.5).collect();
        assert_eq!(13, trays.len());
        assert!((trays[12] - 0.5).abs() < 1e-12);
        let sum: f64 = trays.iter().sum();
        assert!((sum - 12.5).abs() < 1e-9);
    }

    #[test]
    fn test_subdivide_short_segment() {
        let conveyor = Conveyor::new(Some(60.0)).unwrap();
        let trays: Vec<f64> = conveyor.subdivide(18.0).collect();
        assert_eq!(vec![18.0], trays);
    }

    #[test]
    fn test_subdivide_zero_length() {
        for conveyor in [Conveyor::disabled(), Conveyor::new(Some(60.0)).unwrap()] {
            let trays: Vec<f64> = conveyor.subdivide(0.0).collect();
            assert_eq!(vec![0.0], trays);
        }
    }

    #[test]
    fn test_disabled() {
        let trays: Vec<f64> = Conveyor::disabled().subdivide(2400.0).collect();
        assert_eq!(vec![2400.0], trays);
    }

    #[test]
    fn test_exact_size() {
        let mut trays = Conveyor::new(Some(6.0)).unwrap().subdivide(18.0);
        assert_eq!(3, trays.len());
        trays.next();
        assert_eq!(2, trays.len());
    }

    #[test]
    fn test_invalid_delta() {
        assert!(matches!(Conveyor::new(Some(0.0)), Err(DecoError::Config(_))));
        assert!(matches!(Conveyor::new(Some(-1.0)), Err(DecoError::Config(_))));
        assert!(matches!(Conveyor::new(Some(f64::NAN)), Err(DecoError::Config(_))));
    }

    #[test]
    fn test_odd_delta_accepted() {
        // only warned about
        assert!(Conveyor::new(Some(7.0)).is_ok());
        assert!(Conveyor::new(Some(0.05)).is_ok());
        assert!(Conveyor::new(Some(90.0)).is_ok());
    }
}
