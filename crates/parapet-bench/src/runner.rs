use std::time::{Duration, Instant};

use parapet_core::clock::StdClock;
use parapet_sampler::{CoverSampler, SamplerParams, SamplerStatus};
use parapet_system::CoverSystem;

use crate::scenes::Scene;

/// Per-scene timing statistics over the query loop, in milliseconds.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TimingStats {
    pub mean_ms: f64,
    pub median_ms: f64,
    pub p95_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

impl TimingStats {
    fn from_samples(mut samples: Vec<f64>) -> Self {
        if samples.is_empty() {
            return Self {
                mean_ms: 0.0,
                median_ms: 0.0,
                p95_ms: 0.0,
                min_ms: 0.0,
                max_ms: 0.0,
            };
        }
        samples.sort_by(|a, b| a.total_cmp(b));
        let n = samples.len();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let pct = |p: f64| samples[(((n - 1) as f64) * p).round() as usize];
        Self {
            mean_ms: mean,
            median_ms: pct(0.5),
            p95_ms: pct(0.95),
            min_ms: samples[0],
            max_ms: samples[n - 1],
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BenchmarkResult {
    pub scene_name: String,
    pub surface_count: usize,
    pub location_count: usize,
    pub generation_ms: f64,
    pub timings: TimingStats,
}

/// Builds each scene's surfaces through the sampler, then times nearby-cover
/// queries against the populated system.
pub struct BenchmarkRunner {
    query_count: u32,
}

impl BenchmarkRunner {
    pub fn new(query_count: u32) -> Self {
        Self { query_count }
    }

    pub fn run_scene(&self, scene: &Scene) -> BenchmarkResult {
        let clock = StdClock::new();
        let mut system = CoverSystem::new();

        let generation_start = Instant::now();
        let mut surface_count = 0usize;
        for seed in &scene.seeds {
            let mut sampler = CoverSampler::new(SamplerParams::default(), *seed);
            let mut status = SamplerStatus::InProgress;
            while status == SamplerStatus::InProgress {
                status = sampler.update(
                    &scene.world,
                    &clock,
                    Duration::from_millis(50),
                    Duration::from_secs(30),
                );
            }
            if status != SamplerStatus::Finished {
                log::warn!(
                    "scene {}: seed at {:?} failed to sample",
                    scene.name,
                    seed.position
                );
                continue;
            }
            match system.add_surface(sampler.samples().to_vec(), sampler.surface_flags()) {
                Ok(_) => surface_count += 1,
                Err(e) => log::warn!("scene {}: add_surface failed: {e}", scene.name),
            }
        }
        let generation_ms = generation_start.elapsed().as_secs_f64() * 1000.0;

        let mut samples = Vec::with_capacity(self.query_count as usize);
        for i in 0..self.query_count {
            // Vary the radius a little so queries don't all hash identically.
            let radius = 8.0 + (i % 4) as f32;
            let start = Instant::now();
            let found = system.get_cover(scene.query_center, radius, &[scene.eye], 0.4, 16, 4);
            let elapsed = start.elapsed().as_secs_f64() * 1000.0;
            samples.push(elapsed);
            std::hint::black_box(found);
        }

        let result = BenchmarkResult {
            scene_name: scene.name.to_string(),
            surface_count,
            location_count: system.grid_len(),
            generation_ms,
            timings: TimingStats::from_samples(samples),
        };
        log::info!(
            "scene {}: {} surfaces, {} locations, gen {:.2}ms, query mean {:.3}ms",
            result.scene_name,
            result.surface_count,
            result.location_count,
            result.generation_ms,
            result.timings.mean_ms
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenes;

    #[test]
    fn test_timing_stats_ordering() {
        let stats = TimingStats::from_samples(vec![3.0, 1.0, 2.0, 10.0]);
        assert_eq!(stats.min_ms, 1.0);
        assert_eq!(stats.max_ms, 10.0);
        assert!(stats.median_ms <= stats.p95_ms);
        assert!((stats.mean_ms - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_timing_stats_empty() {
        let stats = TimingStats::from_samples(vec![]);
        assert_eq!(stats.mean_ms, 0.0);
        assert_eq!(stats.max_ms, 0.0);
    }

    #[test]
    fn test_single_wall_scene_produces_cover() {
        let runner = BenchmarkRunner::new(4);
        let scene = &scenes::standard_scenes()[0];
        let result = runner.run_scene(scene);
        assert_eq!(result.surface_count, 1);
        assert!(result.location_count > 0);
    }
}
