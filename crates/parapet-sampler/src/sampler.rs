use std::collections::VecDeque;
use std::time::Duration;

use glam::Vec3;
use parapet_core::aabb::Aabb;
use parapet_core::clock::Clock;
use parapet_core::constants::*;
use parapet_core::math;
use parapet_core::oracle::{CollisionOracle, SurfaceKind, SweepHit};
use parapet_core::types::{Sample, SAMPLE_DYNAMIC, SURFACE_DYNAMIC, SURFACE_LOOPED};

use crate::params::{SamplerParams, StartParams};

/// Externally visible sampler state. Callers poll this after each `update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerStatus {
    InProgress,
    Finished,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Starting,
    SamplingLeft,
    SamplingRight,
    Simplifying,
    Finished,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// Per-direction walk state. The probe direction starts as the hide
/// direction and is blended toward the obstruction as the wall curves.
#[derive(Debug, Clone, Copy)]
struct WalkState {
    probe_dir: Vec3,
    original_dir: Vec3,
    width: f32,
}

/// Result of one obstruction height measurement at a floor point.
struct HeightProbe {
    height: f32,
    base_point: Vec3,
    base_normal: Vec3,
    kind: SurfaceKind,
}

/// Walks outward from a seed point along collision geometry to discover a
/// cover surface: alternating floor and obstruction-height probes, a lateral
/// width walk in both directions, then a simplification pass.
///
/// The computation is cooperatively resumable: `update` runs phases until
/// its per-call time budget is exhausted and suspends at a phase boundary,
/// to be continued by the next call. Exceeding the total budget forces the
/// `Error` state and discards partial results.
pub struct CoverSampler {
    params: SamplerParams,
    start: StartParams,
    phase: Phase,
    samples: VecDeque<Sample>,
    result: Vec<Sample>,
    flags: u8,
    aabb: Aabb,
    left: WalkState,
    right: WalkState,
    start_time: Option<Duration>,
}

impl CoverSampler {
    pub fn new(params: SamplerParams, start: StartParams) -> Self {
        Self {
            params,
            start,
            phase: Phase::Starting,
            samples: VecDeque::new(),
            result: Vec::new(),
            flags: 0,
            aabb: Aabb::empty(),
            left: WalkState {
                probe_dir: Vec3::ZERO,
                original_dir: Vec3::ZERO,
                width: 0.0,
            },
            right: WalkState {
                probe_dir: Vec3::ZERO,
                original_dir: Vec3::ZERO,
                width: 0.0,
            },
            start_time: None,
        }
    }

    pub fn status(&self) -> SamplerStatus {
        match self.phase {
            Phase::Finished => SamplerStatus::Finished,
            Phase::Error => SamplerStatus::Error,
            _ => SamplerStatus::InProgress,
        }
    }

    /// Run sampling phases until finished, failed, or the per-call budget is
    /// spent. Returns the resulting status; callers keep calling while it is
    /// `InProgress`.
    pub fn update(
        &mut self,
        oracle: &dyn CollisionOracle,
        clock: &dyn Clock,
        per_call_budget: Duration,
        total_budget: Duration,
    ) -> SamplerStatus {
        if self.phase == Phase::Finished || self.phase == Phase::Error {
            return self.status();
        }

        let call_start = clock.now();
        let start_time = *self.start_time.get_or_insert(call_start);

        loop {
            if clock.now().saturating_sub(start_time) > total_budget {
                self.fail();
                return SamplerStatus::Error;
            }

            match self.phase {
                Phase::Starting => self.step_start(oracle),
                Phase::SamplingLeft => self.step_width(oracle, Side::Left),
                Phase::SamplingRight => self.step_width(oracle, Side::Right),
                Phase::Simplifying => self.step_simplify(),
                Phase::Finished | Phase::Error => {}
            }

            match self.phase {
                Phase::Finished => return SamplerStatus::Finished,
                Phase::Error => return SamplerStatus::Error,
                _ => {}
            }

            if clock.now().saturating_sub(call_start) >= per_call_budget {
                return SamplerStatus::InProgress;
            }
        }
    }

    /// Simplified samples, available once `Finished`.
    pub fn samples(&self) -> &[Sample] {
        if self.phase == Phase::Finished {
            &self.result
        } else {
            &[]
        }
    }

    /// Bounds of the sampled surface (positions and tops), once `Finished`.
    pub fn aabb(&self) -> Aabb {
        self.aabb
    }

    /// SURFACE_LOOPED / SURFACE_DYNAMIC flags, once `Finished`.
    pub fn surface_flags(&self) -> u8 {
        self.flags
    }

    fn fail(&mut self) {
        log::debug!(
            "cover sampling failed in phase {:?} at {:?}",
            self.phase,
            self.start.position
        );
        self.samples.clear();
        self.result.clear();
        self.aabb = Aabb::empty();
        self.flags = 0;
        self.phase = Phase::Error;
    }

    // --- Starting -------------------------------------------------------

    fn step_start(&mut self, oracle: &dyn CollisionOracle) {
        let dir = Vec3::new(self.start.direction.x, self.start.direction.y, 0.0);
        let Some(dir) = dir.try_normalize() else {
            self.fail();
            return;
        };

        let Some(floor) = self.sample_floor(oracle, self.start.position) else {
            self.fail();
            return;
        };

        let Some(probe) = self.sample_height(oracle, floor.point, dir) else {
            self.fail();
            return;
        };
        if probe.height < self.params.min_height {
            self.fail();
            return;
        }

        let seed = self.make_sample(&probe, floor.point.z);
        if seed.is_dynamic() {
            self.flags |= SURFACE_DYNAMIC;
        }
        self.samples.push_back(seed);

        self.left = WalkState {
            probe_dir: dir,
            original_dir: dir,
            width: 0.0,
        };
        self.right = self.left;
        self.phase = Phase::SamplingLeft;
    }

    // --- Width walk -----------------------------------------------------

    fn step_width(&mut self, oracle: &dyn CollisionOracle, side: Side) {
        let state = match side {
            Side::Left => self.left,
            Side::Right => self.right,
        };
        let (limit, edge) = match side {
            Side::Left => (self.params.limit_left, self.samples.front().copied()),
            Side::Right => (self.params.limit_right, self.samples.back().copied()),
        };
        let Some(edge) = edge else {
            self.fail();
            return;
        };

        // Facing the obstruction, left is the negated right-perpendicular.
        let walk_dir = match side {
            Side::Left => -math::outward_normal(state.probe_dir),
            Side::Right => math::outward_normal(state.probe_dir),
        };
        if walk_dir == Vec3::ZERO {
            self.end_walk(side);
            return;
        }

        // Shrinking-step probe: try the full interval first, then back off
        // by a fixed decrement until a valid sample appears or the step
        // becomes negligible.
        let interval = self.params.width_interval;
        let decrement = interval * 0.25;
        let mut step = interval;
        let mut accepted: Option<(Sample, HeightProbe)> = None;
        while step >= decrement {
            let target = edge.position + walk_dir * step;
            if let Some(floor) = self.sample_floor(oracle, target) {
                if let Some(probe) = self.sample_height(oracle, floor.point, state.probe_dir) {
                    if probe.height >= self.params.min_height {
                        let candidate = self.make_sample(&probe, floor.point.z);
                        if self.validate_candidate(side, &edge, &candidate) {
                            accepted = Some((candidate, probe));
                            break;
                        }
                    }
                }
            }
            step -= decrement;
        }

        match accepted {
            Some((sample, probe)) => {
                let advance = math::flatten(sample.position - edge.position).length();
                if sample.is_dynamic() {
                    self.flags |= SURFACE_DYNAMIC;
                }
                match side {
                    Side::Left => {
                        self.samples.push_front(sample);
                        self.left.width += advance;
                    }
                    Side::Right => {
                        self.samples.push_back(sample);
                        self.right.width += advance;
                    }
                }
                self.adjust_direction(side, probe.base_normal);
                let width = match side {
                    Side::Left => self.left.width,
                    Side::Right => self.right.width,
                };
                if width >= limit {
                    self.end_walk(side);
                }
            }
            None => self.end_walk(side),
        }
    }

    fn end_walk(&mut self, side: Side) {
        match side {
            Side::Left => self.phase = Phase::SamplingRight,
            Side::Right => {
                self.detect_loop();
                self.phase = Phase::Simplifying;
            }
        }
    }

    /// Candidate acceptance: minimum advance from the edge, a bounded turn
    /// angle against the prior step, and no crossing of the far end of the
    /// surface.
    fn validate_candidate(&self, side: Side, edge: &Sample, candidate: &Sample) -> bool {
        if (candidate.position - edge.position).length() < MIN_SAMPLE_DELTA {
            return false;
        }

        // Turn angle versus the previous step along this walk.
        let inner = match side {
            Side::Left => self.samples.get(1),
            Side::Right => self.samples.get(self.samples.len().wrapping_sub(2)),
        };
        if let Some(inner) = inner {
            let prev_dir = math::flatten(edge.position - inner.position).normalize_or_zero();
            let next_dir = math::flatten(candidate.position - edge.position).normalize_or_zero();
            if prev_dir != glam::Vec2::ZERO
                && next_dir != glam::Vec2::ZERO
                && prev_dir.dot(next_dir) < MAX_TURN_COS
            {
                return false;
            }
        }

        // The new span must not cross any existing non-adjacent span;
        // without this a nearly-closed surface walks through itself.
        let a0 = math::flatten(edge.position);
        let a1 = math::flatten(candidate.position);
        let skip = match side {
            Side::Left => 0,
            Side::Right => self.samples.len().saturating_sub(2),
        };
        for i in 0..self.samples.len().saturating_sub(1) {
            if i == skip {
                continue;
            }
            let b0 = math::flatten(self.samples[i].position);
            let b1 = math::flatten(self.samples[i + 1].position);
            if math::segments_intersect_2d(a0, a1, b0, b1) {
                return false;
            }
        }
        true
    }

    /// Blend the probe direction toward the newly discovered obstruction
    /// normal so the walk follows curved walls, with a small upward re-bias
    /// so normalization never degenerates. The blend is rejected when it
    /// would curve past the configured limit.
    fn adjust_direction(&mut self, side: Side, hit_normal: Vec3) {
        let state = match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        };
        let target = -Vec3::new(hit_normal.x, hit_normal.y, 0.0);
        if target == Vec3::ZERO {
            return;
        }
        let mut blended = state.probe_dir + (target - state.probe_dir) * DIRECTION_ADJUST_WEIGHT;
        blended.z = DIRECTION_UP_BIAS;
        let Some(blended) = blended.try_normalize() else {
            return;
        };

        if self.params.max_curvature_angle > 0.0 {
            let flat = math::flatten(blended).normalize_or_zero();
            let orig = math::flatten(state.original_dir).normalize_or_zero();
            if flat.dot(orig) < self.params.max_curvature_angle.cos() {
                return;
            }
        }
        state.probe_dir = blended;
    }

    fn detect_loop(&mut self) {
        if self.samples.len() < 3 {
            return;
        }
        let (Some(first), Some(last)) = (self.samples.front(), self.samples.back()) else {
            return;
        };
        let gap = (first.position - last.position).length();
        if gap <= self.params.width_interval + LOOP_CLOSE_SLACK {
            self.flags |= SURFACE_LOOPED;
            let closing = *first;
            self.samples.push_back(closing);
        }
    }

    // --- Simplification -------------------------------------------------

    fn step_simplify(&mut self) {
        let raw: Vec<Sample> = self.samples.drain(..).collect();
        if raw.len() < 2 {
            self.fail();
            return;
        }

        let threshold = self.params.simplify_threshold.max(SIMPLIFY_THRESHOLD_FLOOR);
        let mut kept: Vec<Sample> = Vec::with_capacity(raw.len());
        let mut last_kept = raw[0];
        let mut last_dynamic: Option<Vec3> = raw[0].is_dynamic().then_some(raw[0].position);
        kept.push(raw[0]);

        for i in 1..raw.len() - 1 {
            let mid = raw[i];
            let next = raw[i + 1];

            let (projected, t) =
                math::project_on_segment(mid.position, last_kept.position, next.position);
            let perp = (mid.position - projected).length();
            let interp_height = last_kept.height + (next.height - last_kept.height) * t;
            let removable = perp <= threshold && (mid.height - interp_height).abs() <= threshold;

            // Dynamic samples are kept at a denser spacing: breakable
            // geometry changes matter even where the outline is straight.
            let keep_dynamic = mid.is_dynamic()
                && last_dynamic
                    .map_or(true, |p| (mid.position - p).length() > DYNAMIC_KEEP_SPACING);

            if removable && !keep_dynamic {
                continue;
            }
            kept.push(mid);
            last_kept = mid;
            if mid.is_dynamic() {
                last_dynamic = Some(mid.position);
            }
        }
        kept.push(raw[raw.len() - 1]);

        if kept.len() < 2 {
            self.fail();
            return;
        }

        self.aabb = Aabb::empty();
        for sample in &kept {
            self.aabb.add_point(sample.position);
            self.aabb.add_point(sample.top());
        }
        self.result = kept;
        self.phase = Phase::Finished;
    }

    // --- Probes ---------------------------------------------------------

    /// Downward floor probe: accepts only hits with a near-vertical normal.
    fn sample_floor(&self, oracle: &dyn CollisionOracle, pos: Vec3) -> Option<SweepHit> {
        let origin = pos + Vec3::Z * self.params.floor_search_up;
        let max_distance = self.params.floor_search_up + self.params.floor_search_down;
        let hit = oracle.raycast_down(origin, max_distance)?;
        if hit.normal.z < FLOOR_NORMAL_MIN_Z {
            return None;
        }
        Some(SweepHit {
            point: hit.point,
            normal: hit.normal,
            kind: hit.kind,
        })
    }

    /// Obstruction probe at one height above a floor point. Only wall-like
    /// hits count; skimming a top surface does not.
    fn probe_obstruction(
        &self,
        oracle: &dyn CollisionOracle,
        floor: Vec3,
        probe_dir: Vec3,
        height: f32,
    ) -> Option<SweepHit> {
        let origin = floor + Vec3::Z * height - probe_dir * self.params.probe_back_off;
        let length = self.params.probe_reach + self.params.probe_back_off;
        let hit = oracle.swept_sphere(origin, probe_dir, length, self.params.probe_radius)?;
        if hit.normal.z.abs() >= WALL_NORMAL_MAX_Z {
            return None;
        }
        Some(hit)
    }

    /// Measure the standable height of the obstruction at a floor point:
    /// a coarse upward scan followed by binary subdivision of the last
    /// hit/miss bracket. Subdivision only recurses while the bracket is
    /// wider than twice the configured accuracy.
    fn sample_height(
        &self,
        oracle: &dyn CollisionOracle,
        floor: Vec3,
        probe_dir: Vec3,
    ) -> Option<HeightProbe> {
        let base_height = self.params.height_interval * 0.5;
        let base = self.probe_obstruction(oracle, floor, probe_dir, base_height)?;

        let mut low = base_height;
        let mut high = None;
        let mut h = base_height + self.params.height_interval;
        while h <= self.params.limit_height {
            if self
                .probe_obstruction(oracle, floor, probe_dir, h)
                .is_some()
            {
                low = h;
            } else {
                high = Some(h);
                break;
            }
            h += self.params.height_interval;
        }

        let height = match high {
            None => self.params.limit_height,
            Some(mut high) => {
                while high - low > self.params.height_accuracy * 2.0 {
                    let mid = (low + high) * 0.5;
                    if self
                        .probe_obstruction(oracle, floor, probe_dir, mid)
                        .is_some()
                    {
                        low = mid;
                    } else {
                        high = mid;
                    }
                }
                (low + high) * 0.5
            }
        };

        Some(HeightProbe {
            height,
            base_point: base.point,
            base_normal: base.normal,
            kind: base.kind,
        })
    }

    /// A sample sits on the obstruction boundary at floor level.
    fn make_sample(&self, probe: &HeightProbe, floor_z: f32) -> Sample {
        let position = Vec3::new(probe.base_point.x, probe.base_point.y, floor_z);
        let flags = if probe.kind == SurfaceKind::Dynamic {
            SAMPLE_DYNAMIC
        } else {
            0
        };
        Sample::with_flags(position, probe.height, flags)
    }
}
