use std::path::Path;

use crate::runner::BenchmarkResult;

/// A complete baseline containing results from all scenes.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Baseline {
    pub timestamp: String,
    pub results: Vec<BenchmarkResult>,
}

/// Load a baseline from a JSON file. Returns None if the file doesn't exist.
pub fn load_baseline(path: &Path) -> Option<Baseline> {
    let contents = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&contents).ok()
}

/// Save a baseline to a JSON file.
pub fn save_baseline(path: &Path, baseline: &Baseline) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(baseline).map_err(std::io::Error::other)?;
    std::fs::write(path, json)
}

/// Compare current results against a baseline. Returns the regressions
/// (scene name, percent change) where the query mean exceeds the threshold.
pub fn compare(
    current: &[BenchmarkResult],
    baseline: &Baseline,
    threshold_pct: f64,
) -> Vec<(String, f64)> {
    let mut regressions = Vec::new();
    for result in current {
        if let Some(base) = baseline
            .results
            .iter()
            .find(|b| b.scene_name == result.scene_name)
        {
            if base.timings.mean_ms <= 0.0 {
                continue;
            }
            let pct_change =
                (result.timings.mean_ms - base.timings.mean_ms) / base.timings.mean_ms * 100.0;
            if pct_change > threshold_pct {
                regressions.push((result.scene_name.clone(), pct_change));
            }
        }
    }
    regressions
}

/// Format results as a markdown summary table.
pub fn format_markdown(results: &[BenchmarkResult]) -> String {
    let mut out = String::new();
    out.push_str(
        "| Scene | Surfaces | Locations | Gen (ms) | Mean (ms) | Median (ms) | P95 (ms) | Min (ms) | Max (ms) |\n",
    );
    out.push_str(
        "|-------|----------|-----------|----------|-----------|-------------|----------|----------|----------|\n",
    );
    for r in results {
        out.push_str(&format!(
            "| {} | {} | {} | {:.2} | {:.3} | {:.3} | {:.3} | {:.3} | {:.3} |\n",
            r.scene_name,
            r.surface_count,
            r.location_count,
            r.generation_ms,
            r.timings.mean_ms,
            r.timings.median_ms,
            r.timings.p95_ms,
            r.timings.min_ms,
            r.timings.max_ms,
        ));
    }
    out
}

/// Format a comparison report showing regressions.
pub fn format_comparison(regressions: &[(String, f64)], threshold_pct: f64) -> String {
    if regressions.is_empty() {
        return format!(
            "All scenes within {:.0}% threshold. No regressions detected.\n",
            threshold_pct
        );
    }
    let mut out = String::new();
    out.push_str(&format!(
        "REGRESSIONS DETECTED (>{:.0}% threshold):\n",
        threshold_pct
    ));
    for (scene, pct) in regressions {
        out.push_str(&format!("  - {}: +{:.1}%\n", scene, pct));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::TimingStats;

    fn result(name: &str, mean: f64) -> BenchmarkResult {
        BenchmarkResult {
            scene_name: name.to_string(),
            surface_count: 1,
            location_count: 10,
            generation_ms: 1.0,
            timings: TimingStats {
                mean_ms: mean,
                median_ms: mean,
                p95_ms: mean,
                min_ms: mean,
                max_ms: mean,
            },
        }
    }

    #[test]
    fn test_compare_flags_regressions() {
        let baseline = Baseline {
            timestamp: "t0".to_string(),
            results: vec![result("a", 1.0), result("b", 1.0)],
        };
        let current = vec![result("a", 1.05), result("b", 2.0)];
        let regressions = compare(&current, &baseline, 10.0);
        assert_eq!(regressions.len(), 1);
        assert_eq!(regressions[0].0, "b");
    }

    #[test]
    fn test_markdown_contains_scene_rows() {
        let md = format_markdown(&[result("single-wall", 0.5)]);
        assert!(md.contains("single-wall"));
        assert!(md.contains("| Scene |"));
    }
}
