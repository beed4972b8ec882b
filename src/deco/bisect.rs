//! First decompression stop binary search.
//!
//! The first stop is the shallowest depth, divisible by the stop quantum,
//! which can be reached without breaching the ascent ceiling. Candidates
//! are ascents of `k * t(3m) + dt` seconds from the start step, where `dt`
//! aligns the start depth to the stop quantum, so the search needs only
//! `O(log n)` evaluations of the ascent invariant.

use tracing::debug;

use super::engine::Engine;
use super::error::{DecoError, Result};
use super::pressure::{is_quantum_aligned, travel_time, STOP_QUANTUM};
use super::step::Step;

/// Find largest `k` in `1..=n` for which `f(k)` is true.
///
/// `f` must be true for a prefix of the range and false afterwards. Zero is
/// returned if `f` is false for every `k` (or `n` is zero).
pub fn bisect_find<F>(n: usize, mut f: F) -> usize
where
    F: FnMut(usize) -> bool,
{
    let mut lo = 1;
    let mut hi = n + 1;
    while lo < hi {
        let k = lo + (hi - lo) / 2;
        if f(k) {
            lo = k + 1;
        } else {
            hi = k;
        }
    }
    hi - 1
}

/// Search space and result of a first stop search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AscentSearch {
    /// Time to ascend one stop quantum (s)
    pub ts_q: f64,
    /// Number of whole stop quanta between start and target
    pub n: usize,
    /// Time to ascend from start to the first quantum-aligned depth (s)
    pub dt: f64,
    /// Number of stop quanta which can be ascended
    pub k: usize,
}

impl AscentSearch {
    /// Duration of the ascent to the found stop (s).
    pub fn ascent_time(&self) -> f64 {
        if self.k == 0 {
            0.0
        } else {
            self.k as f64 * self.ts_q + self.dt
        }
    }

    /// True if no ascent is possible, the start step is within the
    /// decompression zone.
    pub fn at_deco_zone(&self) -> bool {
        self.k == 0
    }
}

/// Find the first decompression stop between `start` and the target
/// absolute pressure, breathing the gas mix of `start`.
///
/// The target is the surface or a quantum-aligned gas switch depth. The
/// returned step is `start` itself when no ascent is possible.
pub fn find_first_stop(
    engine: &Engine,
    start: &Step,
    target_pressure: f64,
) -> Result<(AscentSearch, Step)> {
    let scale = engine.scale();
    let target_depth = scale.to_depth(target_pressure);
    if start.pressure <= target_pressure {
        return Err(DecoError::Precondition(format!(
            "first stop search needs ascent, {}bar -> {}bar",
            start.pressure, target_pressure
        )));
    }
    if !is_quantum_aligned(target_depth) {
        return Err(DecoError::Precondition(format!(
            "first stop search target {target_depth}m not divisible by {STOP_QUANTUM}m"
        )));
    }

    let rate = engine.config().ascent_rate;
    let ts_q = travel_time(STOP_QUANTUM, rate);
    let t = travel_time(start.depth - target_depth, rate);
    let n = (t / ts_q + 1e-9).floor();
    let mut dt = t - n * ts_q;
    if dt < 1e-9 {
        dt = 0.0;
    }
    let n = n as usize;
    debug!(
        from = start.pressure,
        to = target_pressure,
        time = start.time,
        n,
        dt,
        "find first stop"
    );

    let k = bisect_find(n, |k| {
        let step = engine.step_next_ascent(start, k as f64 * ts_q + dt, None);
        engine.inv_ascent(&step)
    });
    let search = AscentSearch { ts_q, n, dt, k };

    if search.at_deco_zone() {
        debug!(depth = start.depth, "find first stop: already at deco zone");
        return Ok((search, start.clone()));
    }

    let time = search.ascent_time();
    let stop = engine.step_next_ascent(start, time, None);
    if !is_quantum_aligned(stop.depth) {
        return Err(DecoError::Invariant(format!(
            "invalid first stop depth {}m ({}bar)",
            stop.depth, stop.pressure
        )));
    }
    debug!(depth = stop.depth, time, "find first stop: found");
    Ok((search, stop))
}
