//! Decompression engine.
//!
//! The engine produces dive steps lazily. A dive is split into segments
//! (descent, bottom time, free ascent, decompression stops and ascents
//! between them), every segment is planned from the last produced step and
//! expanded into dive steps by the time conveyor.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::bisect;
use super::conveyor::{Conveyor, Trays};
use super::error::{DecoError, Result};
use super::gas::{GasList, GasMix};
use super::model::{Compartment, TissueModel, Tissues};
use super::pressure::{
    is_quantum_aligned, round_scale, travel_time, DepthScale, EPSILON, METER_TO_BAR, STOP_QUANTUM,
    SURFACE_PRESSURE,
};
use super::step::{Phase, Step};

/// Longest decompression stop before the profile is considered broken.
const MAX_STOP_MINUTES: u32 = 24 * 60;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Surface pressure (bar)
    pub surface_pressure: f64,
    /// Pressure change per metre of depth (bar/m)
    pub meter_to_bar: f64,
    /// Ascent rate (m/min)
    pub ascent_rate: f64,
    /// Descent rate (m/min)
    pub descent_rate: f64,
    pub gf_low: f64,
    pub gf_high: f64,
    pub model: TissueModel,
    /// Time conveyor delta (s), no subdivision when not set
    pub time_delta: Option<f64>,
    /// Skip the 3m stop, ascend from 6m directly to the surface
    pub last_stop_6m: bool,
    /// Include descent in the profile, otherwise the dive starts at the
    /// target depth
    pub descent: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            surface_pressure: SURFACE_PRESSURE,
            meter_to_bar: METER_TO_BAR,
            ascent_rate: 10.0,
            descent_rate: 20.0,
            gf_low: 0.3,
            gf_high: 0.85,
            model: TissueModel::default(),
            time_delta: None,
            last_stop_6m: false,
            descent: true,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.surface_pressure > 0.0) {
            return Err(DecoError::Config(format!(
                "surface pressure must be positive, got {}bar",
                self.surface_pressure
            )));
        }
        if !(self.meter_to_bar > 0.0) {
            return Err(DecoError::Config(format!(
                "meter to bar ratio must be positive, got {}",
                self.meter_to_bar
            )));
        }
        if !(self.ascent_rate > 0.0) || !(self.descent_rate > 0.0) {
            return Err(DecoError::Config(format!(
                "ascent and descent rates must be positive, got {}m/min and {}m/min",
                self.ascent_rate, self.descent_rate
            )));
        }
        if !(self.gf_low > 0.0 && self.gf_low <= 1.0) || !(self.gf_high > 0.0 && self.gf_high <= 1.0)
        {
            return Err(DecoError::Config(format!(
                "gradient factors must be in range (0, 1], got {}/{}",
                self.gf_low, self.gf_high
            )));
        }
        if self.gf_low > self.gf_high {
            return Err(DecoError::Config(format!(
                "gf low {} above gf high {}",
                self.gf_low, self.gf_high
            )));
        }
        Ok(())
    }

    pub fn scale(&self) -> DepthScale {
        DepthScale::new(self.surface_pressure, self.meter_to_bar)
    }
}

/// Decompression engine.
///
/// The engine is immutable while a profile is calculated, the profile
/// borrows it. Clone the engine to calculate profiles concurrently.
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    conveyor: Conveyor,
    gases: GasList,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let conveyor = Conveyor::new(config.time_delta)?;
        Ok(Self {
            config,
            conveyor,
            gases: GasList::new(),
        })
    }

    /// Create engine with a gas mix list, the first mix is the bottom gas.
    pub fn with_gases(config: EngineConfig, mixes: &[GasMix]) -> Result<Self> {
        let mut engine = Self::new(config)?;
        engine.gases = GasList::from_mixes(mixes)?;
        Ok(engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn model(&self) -> TissueModel {
        self.config.model
    }

    pub fn scale(&self) -> DepthScale {
        self.config.scale()
    }

    pub fn conveyor(&self) -> &Conveyor {
        &self.conveyor
    }

    pub fn gases(&self) -> &GasList {
        &self.gases
    }

    pub fn set_gradient_factors(&mut self, gf_low: f64, gf_high: f64) -> Result<()> {
        let config = EngineConfig {
            gf_low,
            gf_high,
            ..self.config.clone()
        };
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn set_model(&mut self, model: TissueModel) {
        self.config.model = model;
    }

    pub fn set_time_delta(&mut self, time_delta: Option<f64>) -> Result<()> {
        self.conveyor = Conveyor::new(time_delta)?;
        self.config.time_delta = time_delta;
        Ok(())
    }

    pub fn set_last_stop_6m(&mut self, last_stop_6m: bool) {
        self.config.last_stop_6m = last_stop_6m;
    }

    pub fn set_descent(&mut self, descent: bool) {
        self.config.descent = descent;
    }

    /// Register a gas mix. The first one is the bottom gas.
    pub fn add_gas(&mut self, mix: GasMix) -> Result<()> {
        self.gases.add(mix)
    }

    /// Register a travel gas mix, breathed during descent only.
    pub fn add_travel_gas(&mut self, mix: GasMix) -> Result<()> {
        self.gases.add_travel(mix)
    }

    /// Create a dive step in the start phase, breathing the bottom gas.
    pub fn step(&self, depth: f64, time: f64, tissues: Tissues, gf: Option<f64>) -> Step {
        Step {
            phase: Phase::Start,
            depth,
            time,
            pressure: self.scale().to_pressure(depth),
            tissues,
            gf: gf.unwrap_or(self.config.gf_low),
            gas: self.gases.bottom().copied().unwrap_or_else(GasMix::air),
        }
    }

    /// Stay at the depth of a step for `duration` seconds.
    pub fn step_next(&self, step: &Step, duration: f64) -> Step {
        self.step_at_depth(step, duration, Phase::Const)
    }

    /// Stay at a decompression stop for `duration` seconds.
    pub fn step_next_deco(&self, step: &Step, duration: f64) -> Step {
        self.step_at_depth(step, duration, Phase::DecoStop)
    }

    fn step_at_depth(&self, step: &Step, duration: f64, phase: Phase) -> Step {
        Step {
            phase,
            time: step.time + duration,
            tissues: self.load(step, duration, 0.0),
            ..step.clone()
        }
    }

    /// Descend from a step for `duration` seconds.
    pub fn step_next_descent(&self, step: &Step, duration: f64) -> Step {
        let rate = self.config.descent_rate;
        let depth = round_scale(step.depth + rate * duration / 60.0);
        Step {
            phase: Phase::Descent,
            depth,
            time: step.time + duration,
            pressure: self.scale().to_pressure(depth),
            tissues: self.load(step, duration, self.scale().pressure_rate(rate)),
            gf: step.gf,
            gas: step.gas,
        }
    }

    /// Ascend from a step for `duration` seconds, never above the surface.
    ///
    /// The new step takes `gf` when given, the gradient factor of `step`
    /// otherwise.
    pub fn step_next_ascent(&self, step: &Step, duration: f64, gf: Option<f64>) -> Step {
        let rate = self.config.ascent_rate;
        let depth = round_scale(step.depth - rate * duration / 60.0).max(0.0);
        Step {
            phase: Phase::Ascent,
            depth,
            time: step.time + duration,
            pressure: self.scale().to_pressure(depth),
            tissues: self.load(step, duration, -self.scale().pressure_rate(rate)),
            gf: gf.unwrap_or(step.gf),
            gas: step.gas,
        }
    }

    fn load(&self, step: &Step, duration: f64, rate: f64) -> Vec<Compartment> {
        self.config
            .model
            .load(step.pressure, duration, &step.gas, rate, &step.tissues)
    }

    /// Ceiling pressure of the tissues, `gf` defaults to gf low.
    pub fn max_tissue_pressure(&self, tissues: &[Compartment], gf: Option<f64>) -> f64 {
        self.config
            .model
            .ceiling_limit(gf.unwrap_or(self.config.gf_low), tissues)
    }

    /// Ascent invariant, true while the step is below the ascent ceiling
    /// at gf low.
    pub fn inv_ascent(&self, step: &Step) -> bool {
        step.pressure > self.max_tissue_pressure(&step.tissues, None)
    }

    /// Decompression stop invariant, true when ascent from the stop to the
    /// next stop does not breach the ceiling at `next_gf`, i.e. the stop
    /// may be left.
    pub fn inv_deco_stop(&self, step: &Step, next_gf: f64) -> bool {
        let next = self.next_stop_depth(step.depth);
        let time = travel_time(step.depth - next, self.config.ascent_rate);
        let arrival = self.step_next_ascent(step, time, Some(next_gf));
        arrival.pressure >= self.max_tissue_pressure(&arrival.tissues, Some(next_gf))
    }

    /// Depth of the decompression stop after the stop at `depth`.
    pub fn next_stop_depth(&self, depth: f64) -> f64 {
        if self.config.last_stop_6m && (depth - 2.0 * STOP_QUANTUM).abs() < EPSILON {
            0.0
        } else {
            round_scale(depth - STOP_QUANTUM).max(0.0)
        }
    }

    /// Gradient factor at `depth`, interpolated between gf low at the
    /// first stop and gf high at the surface.
    pub fn gf_at(&self, first_stop: f64, depth: f64) -> f64 {
        let (gf_low, gf_high) = (self.config.gf_low, self.config.gf_high);
        if first_stop <= 0.0 {
            return gf_high;
        }
        gf_low + (gf_high - gf_low) * (first_stop - depth) / first_stop
    }

    /// Breathe the ascent gas mix for the depth of a step.
    fn switch_gas(&self, step: &Step) -> Step {
        match self.gases.ascent_mix(step.depth) {
            Some(gas) => with_gas(step, gas),
            None => step.clone(),
        }
    }

    fn bottom_gas(&self, step: &Step) -> Step {
        match self.gases.bottom() {
            Some(gas) => with_gas(step, *gas),
            None => step.clone(),
        }
    }

    /// Descent from the surface to `depth`, the first step is the start of
    /// the dive.
    ///
    /// Travel gas mixes are breathed down to the switch depth of the next
    /// mix, the rest of the descent is done on the bottom gas.
    pub fn dive_descent(&self, depth: f64) -> Descent<'_> {
        let tissues = self.config.model.init(self.config.surface_pressure);
        let start = self.step(0.0, 0.0, tissues, None);
        let mut stages: VecDeque<(f64, GasMix)> = self.gases.descent_stages(depth).into();
        if stages.is_empty() {
            stages.push_back((depth, start.gas));
        }
        let start = match stages.front() {
            Some((_, gas)) => start.with_gas(*gas),
            None => start,
        };
        Descent {
            engine: self,
            stages,
            segment: None,
            head: Some(start.clone()),
            last: start,
        }
    }

    /// Stay at the depth of `step` for `duration` seconds.
    pub fn dive_const(&self, step: &Step, duration: f64) -> Steps<'_> {
        let end = self.step_next(step, duration);
        Steps::new(self, None, step.clone(), Motion::Level(Phase::Const), end)
    }

    /// Ascent from `start` to `depth` without decompression stops.
    pub fn free_ascent(&self, start: &Step, depth: f64) -> Steps<'_> {
        let time = travel_time(start.depth - depth, self.config.ascent_rate);
        let end = self.step_next_ascent(start, time, None);
        Steps::new(self, None, start.clone(), Motion::Ascent(start.gf), end)
    }

    /// Direct ascent from `start` to the surface at gf high, `None` when
    /// the surface ceiling is breached and decompression stops are needed.
    pub fn ndl_ascent(&self, start: &Step) -> Option<Steps<'_>> {
        let gf = self.config.gf_high;
        let time = travel_time(start.depth, self.config.ascent_rate);
        let end = self.step_next_ascent(start, time, Some(gf));
        if end.pressure < self.max_tissue_pressure(&end.tissues, Some(gf)) {
            debug!(depth = start.depth, time = start.time, "deco dive");
            return None;
        }
        debug!(depth = start.depth, time = start.time, "no decompression dive");
        Some(Steps::new(self, None, start.clone(), Motion::Ascent(gf), end))
    }

    fn deco_hold(&self, start: Step) -> Steps<'_> {
        let end = self.step_next_deco(&start, 60.0);
        Steps::new(self, None, start, Motion::Level(Phase::DecoStop), end)
    }

    /// First decompression stop on the way from `start` to the surface,
    /// `None` if the surface can be reached without stops.
    pub fn find_first_stop(&self, start: &Step) -> Result<Option<Step>> {
        let (_, stop) = bisect::find_first_stop(self, start, self.config.surface_pressure)?;
        if stop.depth < EPSILON {
            Ok(None)
        } else {
            Ok(Some(stop))
        }
    }

    /// Calculate dive profile for `depth` (m) and `bottom_time` (min).
    ///
    /// Bottom time excludes the descent. Steps are calculated lazily while
    /// the profile is iterated.
    pub fn calculate(&self, depth: f64, bottom_time: f64) -> Result<Profile<'_>> {
        if !(depth > 0.0) || !depth.is_finite() {
            return Err(DecoError::Precondition(format!(
                "dive depth must be positive, got {depth}m"
            )));
        }
        if !(bottom_time >= 0.0) || !bottom_time.is_finite() {
            return Err(DecoError::Precondition(format!(
                "bottom time must not be negative, got {bottom_time}min"
            )));
        }
        self.gases.validate(depth)?;

        let mut targets: VecDeque<f64> = self.gases.switch_depths(depth).into();
        targets.push_back(0.0);
        debug!(
            depth,
            bottom_time,
            model = self.config.model.name(),
            gf_low = self.config.gf_low,
            gf_high = self.config.gf_high,
            ?targets,
            "calculate dive profile"
        );

        Ok(Profile {
            engine: self,
            depth,
            bottom_time,
            stage: Stage::Descent,
            segment: None,
            last: None,
            targets,
            first_stop: None,
            stop_minutes: 0,
            halted: false,
        })
    }
}

fn with_gas(step: &Step, gas: GasMix) -> Step {
    if gas == step.gas {
        return step.clone();
    }
    debug!(depth = step.depth, o2 = gas.o2, he = gas.he, "gas switch");
    step.with_gas(gas)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Motion {
    Descent,
    Level(Phase),
    Ascent(f64),
}

/// Dive steps of a single segment.
///
/// Intermediate steps are calculated from the previous step, the last step
/// is the segment end calculated from the segment start.
#[derive(Debug, Clone)]
pub struct Steps<'a> {
    engine: &'a Engine,
    head: Option<Step>,
    current: Step,
    motion: Motion,
    trays: Option<Trays>,
    end: Option<Step>,
}

impl<'a> Steps<'a> {
    fn new(engine: &'a Engine, head: Option<Step>, start: Step, motion: Motion, end: Step) -> Self {
        let trays = engine.conveyor.subdivide(end.time - start.time);
        Self {
            engine,
            head,
            current: start,
            motion,
            trays: Some(trays),
            end: Some(end),
        }
    }

    fn single(engine: &'a Engine, step: Step) -> Self {
        Self {
            engine,
            head: Some(step.clone()),
            current: step,
            motion: Motion::Level(Phase::Start),
            trays: None,
            end: None,
        }
    }

    fn advance(&self, duration: f64) -> Step {
        let engine = self.engine;
        match self.motion {
            Motion::Descent => engine.step_next_descent(&self.current, duration),
            Motion::Level(phase) => engine.step_at_depth(&self.current, duration, phase),
            Motion::Ascent(gf) => engine.step_next_ascent(&self.current, duration, Some(gf)),
        }
    }
}

impl Iterator for Steps<'_> {
    type Item = Step;

    fn next(&mut self) -> Option<Step> {
        if let Some(head) = self.head.take() {
            return Some(head);
        }
        let trays = self.trays.as_mut()?;
        let duration = trays.next()?;
        if trays.len() == 0 {
            return self.end.take();
        }
        let step = self.advance(duration);
        self.current = step.clone();
        Some(step)
    }
}

/// Dive descent, one segment per descent gas mix.
#[derive(Debug, Clone)]
pub struct Descent<'a> {
    engine: &'a Engine,
    /// Destination depth and gas mix of the remaining legs
    stages: VecDeque<(f64, GasMix)>,
    segment: Option<Steps<'a>>,
    head: Option<Step>,
    last: Step,
}

impl Iterator for Descent<'_> {
    type Item = Step;

    fn next(&mut self) -> Option<Step> {
        loop {
            if let Some(step) = self.segment.as_mut().and_then(Iterator::next) {
                self.last = step.clone();
                return Some(step);
            }
            let (depth, gas) = self.stages.pop_front()?;
            let engine = self.engine;
            let start = with_gas(&self.last, gas);
            let time = travel_time(depth - start.depth, engine.config.descent_rate);
            let end = engine.step_next_descent(&start, time);
            let head = self.head.take();
            self.segment = Some(Steps::new(engine, head, start, Motion::Descent, end));
        }
    }
}

/// Segment of a dive profile.
#[derive(Debug)]
enum Segment<'a> {
    Descent(Descent<'a>),
    Steps(Steps<'a>),
}

impl Iterator for Segment<'_> {
    type Item = Step;

    fn next(&mut self) -> Option<Step> {
        match self {
            Segment::Descent(descent) => descent.next(),
            Segment::Steps(steps) => steps.next(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Descent,
    Bottom,
    NoDeco,
    FreeAscent,
    Deco,
    Done,
}

/// Lazily calculated dive profile.
///
/// Every step is checked against the engine invariants before it is
/// returned. An invariant breach is returned as an error and ends the
/// profile.
#[derive(Debug)]
pub struct Profile<'a> {
    engine: &'a Engine,
    depth: f64,
    bottom_time: f64,
    stage: Stage,
    segment: Option<Segment<'a>>,
    last: Option<Step>,
    /// Free ascent targets, gas switch depths and the surface
    targets: VecDeque<f64>,
    first_stop: Option<f64>,
    stop_minutes: u32,
    halted: bool,
}

impl<'a> Profile<'a> {
    fn plan(&mut self) -> Result<Option<Segment<'a>>> {
        let engine = self.engine;
        match self.stage {
            Stage::Descent => {
                self.stage = Stage::Bottom;
                if engine.config.descent {
                    Ok(Some(Segment::Descent(engine.dive_descent(self.depth))))
                } else {
                    let tissues = engine.config.model.init(engine.config.surface_pressure);
                    let start = engine.step(self.depth, 0.0, tissues, None);
                    Ok(Some(Segment::Steps(Steps::single(engine, start))))
                }
            }
            Stage::Bottom => {
                self.stage = Stage::NoDeco;
                if self.bottom_time > 0.0 {
                    let last = engine.bottom_gas(&self.last_step()?);
                    let bottom = engine.dive_const(&last, self.bottom_time * 60.0);
                    Ok(Some(Segment::Steps(bottom)))
                } else {
                    Ok(None)
                }
            }
            Stage::NoDeco => {
                self.stage = Stage::FreeAscent;
                let last = engine.bottom_gas(&self.last_step()?);
                let ascent = engine.ndl_ascent(&last);
                if ascent.is_some() {
                    self.stage = Stage::Done;
                }
                Ok(ascent.map(Segment::Steps))
            }
            Stage::FreeAscent => Ok(self.plan_free_ascent()?.map(Segment::Steps)),
            Stage::Deco => Ok(self.plan_deco()?.map(Segment::Steps)),
            Stage::Done => Ok(None),
        }
    }

    fn plan_free_ascent(&mut self) -> Result<Option<Steps<'a>>> {
        let engine = self.engine;
        let last = self.last_step()?;
        while let Some(target) = self.targets.pop_front() {
            if last.depth <= target + EPSILON {
                continue;
            }
            let start = engine.switch_gas(&last);
            let target_pressure = engine.scale().to_pressure(target);
            let (search, stop) = bisect::find_first_stop(engine, &start, target_pressure)?;
            let gf = start.gf;

            if search.n == 0 {
                // target less than a stop quantum above, no stop in between
                let end = engine.step_next_ascent(&start, search.dt, None);
                return Ok(Some(Steps::new(engine, None, start, Motion::Ascent(gf), end)));
            }
            if search.at_deco_zone() {
                self.stage = Stage::Deco;
                if search.dt > 0.0 {
                    // ascent to the nearest stop depth
                    let end = engine.step_next_ascent(&start, search.dt, None);
                    return Ok(Some(Steps::new(engine, None, start, Motion::Ascent(gf), end)));
                }
                return Ok(None);
            }
            if (stop.depth - target).abs() > EPSILON {
                self.stage = Stage::Deco;
            }
            return Ok(Some(Steps::new(engine, None, start, Motion::Ascent(gf), stop)));
        }
        self.stage = Stage::Deco;
        Ok(None)
    }

    fn plan_deco(&mut self) -> Result<Option<Steps<'a>>> {
        let engine = self.engine;
        let last = self.last_step()?;
        if last.depth < EPSILON {
            self.stage = Stage::Done;
            return Ok(None);
        }

        let first = match self.first_stop {
            Some(depth) => depth,
            None => {
                if !is_quantum_aligned(last.depth) {
                    return Err(DecoError::Invariant(format!(
                        "first decompression stop at {}m not divisible by {STOP_QUANTUM}m",
                        last.depth
                    )));
                }
                debug!(depth = last.depth, time = last.time, "first deco stop");
                self.first_stop = Some(last.depth);
                last.depth
            }
        };
        let next = engine.next_stop_depth(last.depth);
        let next_gf = engine.gf_at(first, next);

        if self.stop_minutes == 0 {
            self.stop_minutes = 1;
            return Ok(Some(engine.deco_hold(engine.switch_gas(&last))));
        }
        if !engine.inv_deco_stop(&last, next_gf) {
            if self.stop_minutes >= MAX_STOP_MINUTES {
                return Err(DecoError::Invariant(format!(
                    "decompression stop at {}m longer than {MAX_STOP_MINUTES}min",
                    last.depth
                )));
            }
            self.stop_minutes += 1;
            return Ok(Some(engine.deco_hold(last)));
        }

        debug!(
            depth = last.depth,
            minutes = self.stop_minutes,
            next,
            gf = next_gf,
            "deco stop"
        );
        self.stop_minutes = 0;
        let time = travel_time(last.depth - next, engine.config.ascent_rate);
        let end = engine.step_next_ascent(&last, time, Some(next_gf));
        Ok(Some(Steps::new(engine, None, last, Motion::Ascent(next_gf), end)))
    }

    fn last_step(&self) -> Result<Step> {
        self.last
            .clone()
            .ok_or_else(|| DecoError::Invariant("dive profile without start step".to_string()))
    }

    fn check(&self, step: &Step) -> Result<()> {
        let engine = self.engine;
        if !(step.depth >= 0.0) {
            return Err(DecoError::Invariant(format!("negative depth at {step}")));
        }
        let pressure = engine.scale().to_pressure(step.depth);
        if (step.pressure - pressure).abs() > 1e-6 {
            return Err(DecoError::Invariant(format!(
                "pressure {}bar does not match depth at {step}",
                step.pressure
            )));
        }
        if step.tissues.len() != engine.config.model.compartments() {
            return Err(DecoError::Invariant(format!(
                "{} tissue compartments at {step}",
                step.tissues.len()
            )));
        }
        if let Some(prev) = &self.last {
            if step.time < prev.time - EPSILON {
                return Err(DecoError::Invariant(format!(
                    "time goes back from {}s at {step}",
                    prev.time
                )));
            }
            let ascending = matches!(step.phase, Phase::Ascent | Phase::DecoStop);
            if ascending && step.depth > prev.depth + EPSILON {
                return Err(DecoError::Invariant(format!(
                    "descent from {}m during ascent at {step}",
                    prev.depth
                )));
            }
        }
        Ok(())
    }

    fn halt(&mut self, err: DecoError) -> Option<Result<Step>> {
        self.halted = true;
        self.stage = Stage::Done;
        self.segment = None;
        Some(Err(err))
    }
}

impl Iterator for Profile<'_> {
    type Item = Result<Step>;

    fn next(&mut self) -> Option<Result<Step>> {
        if self.halted {
            return None;
        }
        loop {
            if let Some(step) = self.segment.as_mut().and_then(Iterator::next) {
                if let Err(err) = self.check(&step) {
                    return self.halt(err);
                }
                self.last = Some(step.clone());
                return Some(Ok(step));
            }
            self.segment = None;
            if self.stage == Stage::Done {
                return None;
            }
            match self.plan() {
                Ok(Some(segment)) => self.segment = Some(segment),
                Ok(None) => {}
                Err(err) => return self.halt(err),
            }
        }
    }
}
