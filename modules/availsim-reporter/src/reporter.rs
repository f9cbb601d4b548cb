//! The Incremental Reporter (C9): streams event rows to disk as they
//! happen and keeps a small rewritten statistics file current, so a killed
//! run still leaves a usable partial report.

use std::fs::File;
use std::io::Write;

use availsim_topology::Component;
use tracing::debug;

use crate::error::{ReportError, ReportResult};
use crate::records::{ComponentSummary, EventRecord, IterationStats, IterationSummary, RunSummary};
use crate::run_directory::RunDirectory;

pub struct IncrementalReporter {
    directory: RunDirectory,
    events_writer: Option<csv::Writer<File>>,
    current_iteration: Option<u32>,
    all_events: Vec<EventRecord>,
    iterations: Vec<IterationSummary>,
}

impl IncrementalReporter {
    pub fn new(directory: RunDirectory) -> ReportResult<Self> {
        Ok(Self {
            directory,
            events_writer: None,
            current_iteration: None,
            all_events: Vec::new(),
            iterations: Vec::new(),
        })
    }

    pub fn directory(&self) -> &RunDirectory {
        &self.directory
    }

    /// Opens `ITERACAO{iteration+1}/events.csv` for a fresh iteration. Must
    /// be called before `record_event` for that iteration.
    pub fn start_iteration(&mut self, iteration: u32) -> ReportResult<()> {
        let path = self.directory.events_csv_path(iteration)?;
        let writer = csv::Writer::from_path(&path).map_err(|source| ReportError::Csv {
            path: path.display().to_string(),
            source,
        })?;
        self.events_writer = Some(writer);
        self.current_iteration = Some(iteration);
        Ok(())
    }

    /// Appends one event row to the current iteration's `events.csv` and
    /// flushes immediately, so the row survives even if the process is
    /// killed before the next event. Also buffered for the run-level
    /// `experiment_all_events.csv` written at `finalize`.
    pub fn record_event(&mut self, event: &EventRecord) -> ReportResult<()> {
        if self.current_iteration != Some(event.iteration) {
            self.start_iteration(event.iteration)?;
        }
        let path = self.directory.events_csv_path(event.iteration)?;
        let writer = self
            .events_writer
            .as_mut()
            .expect("start_iteration always sets events_writer before this point");
        writer.serialize(event).map_err(|source| ReportError::Csv {
            path: path.display().to_string(),
            source,
        })?;
        writer.flush().map_err(|source| ReportError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.all_events.push(event.clone());
        debug!(component_id = %event.component_id, sim_time_hours = event.sim_time_hours, "recorded event");
        Ok(())
    }

    /// Completely rewrites the current iteration's `statistics.csv` with
    /// the latest snapshot (not appended — a reader only ever sees the
    /// most recent state, never a half-written row).
    pub fn rewrite_statistics(&self, stats: &IterationStats) -> ReportResult<()> {
        let path = self.directory.statistics_csv_path(stats.iteration)?;
        let mut writer = csv::Writer::from_path(&path).map_err(|source| ReportError::Csv {
            path: path.display().to_string(),
            source,
        })?;
        writer.serialize(stats).map_err(|source| ReportError::Csv {
            path: path.display().to_string(),
            source,
        })?;
        writer.flush().map_err(|source| ReportError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(())
    }

    pub fn record_iteration_summary(&mut self, summary: IterationSummary) {
        self.iterations.push(summary);
    }

    /// Writes the end-of-run artifacts: the cross-iteration
    /// `experiment_all_events.csv` concatenation, per-iteration summary CSV,
    /// per-component summary CSV, and a JSON snapshot of the resolved
    /// configuration plus cross-iteration statistics.
    pub fn finalize(
        &mut self,
        config_snapshot: &serde_json::Value,
        components: &[Component],
        component_downtime_hours: &std::collections::HashMap<String, f64>,
    ) -> ReportResult<()> {
        if let Some(writer) = self.events_writer.as_mut() {
            writer.flush().map_err(|source| ReportError::Io {
                path: "<current iteration events.csv>".to_string(),
                source,
            })?;
        }

        let all_events_path = self.directory.all_events_csv_path();
        let mut all_events_writer =
            csv::Writer::from_path(&all_events_path).map_err(|source| ReportError::Csv {
                path: all_events_path.display().to_string(),
                source,
            })?;
        for event in &self.all_events {
            all_events_writer.serialize(event).map_err(|source| ReportError::Csv {
                path: all_events_path.display().to_string(),
                source,
            })?;
        }
        all_events_writer.flush().map_err(|source| ReportError::Io {
            path: all_events_path.display().to_string(),
            source,
        })?;

        let iterations_path = self.directory.iterations_csv_path();
        let mut iterations_writer =
            csv::Writer::from_path(&iterations_path).map_err(|source| ReportError::Csv {
                path: iterations_path.display().to_string(),
                source,
            })?;
        for summary in &self.iterations {
            iterations_writer.serialize(summary).map_err(|source| ReportError::Csv {
                path: iterations_path.display().to_string(),
                source,
            })?;
        }
        iterations_writer.flush().map_err(|source| ReportError::Io {
            path: iterations_path.display().to_string(),
            source,
        })?;

        let components_path = self.directory.components_csv_path();
        let mut components_writer =
            csv::Writer::from_path(&components_path).map_err(|source| ReportError::Csv {
                path: components_path.display().to_string(),
                source,
            })?;
        for component in components {
            let summary = ComponentSummary {
                component_id: component.id.clone(),
                component_type: component.component_type.to_string(),
                mttf_hours: component.mttf_hours,
                mttr_hours: component.mttr_hours,
                total_failures: component.failure_count,
                total_downtime_hours: component_downtime_hours.get(&component.id).copied().unwrap_or(0.0),
            };
            components_writer.serialize(&summary).map_err(|source| ReportError::Csv {
                path: components_path.display().to_string(),
                source,
            })?;
        }
        components_writer.flush().map_err(|source| ReportError::Io {
            path: components_path.display().to_string(),
            source,
        })?;

        let ratios: Vec<f64> = self.iterations.iter().map(|i| i.availability_ratio).collect();
        let run_summary = RunSummary::from_ratios(&ratios);
        let snapshot = serde_json::json!({
            "config": config_snapshot,
            "summary": run_summary,
        });
        let config_path = self.directory.config_json_path();
        let mut file = File::create(&config_path).map_err(|source| ReportError::Io {
            path: config_path.display().to_string(),
            source,
        })?;
        let serialized = serde_json::to_string_pretty(&snapshot).map_err(|source| ReportError::Serialize {
            what: "experiment_config.json".to_string(),
            source,
        })?;
        file.write_all(serialized.as_bytes()).map_err(|source| ReportError::Io {
            path: config_path.display().to_string(),
            source,
        })?;
        Ok(())
    }
}
