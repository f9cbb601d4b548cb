//! Row shapes written to the streaming event log and the end-of-run
//! summary artifacts.

use serde::{Deserialize, Serialize};

/// One row of `events.csv`, written and flushed the moment an event
/// finishes processing (spec's crash-safety requirement: a killed run
/// still leaves every event it processed on disk).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub iteration: u32,
    pub sim_time_hours: f64,
    pub wall_time_seconds_from_iter_start: f64,
    pub component_id: String,
    pub component_type: String,
    pub operation: String,
    pub shutdown_class: bool,
    pub recovered: bool,
    /// Simulated downtime attributed to this event (what the accounting
    /// uses): configured MTTR for shutdown-class events, observed
    /// wall-clock-to-simulated-hours conversion for recovery-detector-class
    /// events.
    pub downtime_hours: f64,
    /// Wall-clock seconds the Recovery Detector actually spent observing
    /// real recovery, kept separate from `downtime_hours` so both the
    /// simulated figure and the diagnostic one survive to the report.
    /// `None` when no real probe ran (e.g. a shutdown-class event with no
    /// observation URLs configured).
    pub recovery_seconds: Option<f64>,
    pub available_pod_count: u32,
    pub required_pod_count: u32,
    pub running_availability_percent: f64,
    pub system_available_after: bool,
    /// This component's total attributed downtime so far in the current
    /// iteration, including this event.
    pub cumulative_downtime_hours: f64,
}

/// One row of `statistics.csv`: the latest known state of an in-progress
/// iteration, fully rewritten (not appended) after every event so the file
/// always reflects the most recent completed accounting step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationStats {
    pub iteration: u32,
    pub events_processed: u64,
    pub sim_time_hours: f64,
    pub availability_ratio: f64,
    pub total_available_hours: f64,
    pub total_downtime_hours: f64,
}

/// One row of `experiment_iterations.csv`: the final summary of a
/// completed iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationSummary {
    pub iteration: u32,
    pub availability_ratio: f64,
    pub total_available_hours: f64,
    pub total_downtime_hours: f64,
    pub total_failures: u64,
    pub horizon_hours: f64,
}

/// One row of `experiment_components.csv`: per-component aggregate stats
/// across every iteration of the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentSummary {
    pub component_id: String,
    pub component_type: String,
    pub mttf_hours: f64,
    pub mttr_hours: Option<f64>,
    pub total_failures: u64,
    pub total_downtime_hours: f64,
}

/// Cross-iteration aggregate statistics written into `experiment_config.json`
/// alongside the frozen input configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub iterations: u32,
    pub mean_availability: f64,
    pub min_availability: f64,
    pub max_availability: f64,
    pub stdev_availability: f64,
}

impl RunSummary {
    pub fn from_ratios(ratios: &[f64]) -> Self {
        let iterations = ratios.len() as u32;
        if ratios.is_empty() {
            return Self {
                iterations: 0,
                mean_availability: 0.0,
                min_availability: 0.0,
                max_availability: 0.0,
                stdev_availability: 0.0,
            };
        }
        let mean = ratios.iter().sum::<f64>() / ratios.len() as f64;
        let min = ratios.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = ratios.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let stdev = if ratios.len() > 1 {
            let variance =
                ratios.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (ratios.len() - 1) as f64;
            variance.sqrt()
        } else {
            0.0
        };
        Self {
            iterations,
            mean_availability: mean,
            min_availability: min,
            max_availability: max,
            stdev_availability: stdev,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_summary_computes_sample_stdev() {
        let summary = RunSummary::from_ratios(&[0.9, 0.95, 1.0]);
        assert_eq!(summary.iterations, 3);
        assert!((summary.mean_availability - 0.95).abs() < 1e-9);
        assert_eq!(summary.min_availability, 0.9);
        assert_eq!(summary.max_availability, 1.0);
        assert!(summary.stdev_availability > 0.0);
    }

    #[test]
    fn single_iteration_has_zero_stdev() {
        let summary = RunSummary::from_ratios(&[0.99]);
        assert_eq!(summary.stdev_availability, 0.0);
    }

    #[test]
    fn empty_ratios_does_not_panic() {
        let summary = RunSummary::from_ratios(&[]);
        assert_eq!(summary.iterations, 0);
    }
}
