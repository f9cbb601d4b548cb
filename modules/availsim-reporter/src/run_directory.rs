//! Lays out a run's output directory: `<base>/<YYYY>/<MM>/<DD>/<HHMMSS>/`,
//! mirroring the original reporter's date-stamped run folders.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::error::{ReportError, ReportResult};

#[derive(Debug, Clone)]
pub struct RunDirectory {
    root: PathBuf,
}

impl RunDirectory {
    pub fn create(base_dir: &Path, started_at: DateTime<Utc>) -> ReportResult<Self> {
        let root = base_dir
            .join(format!("{:04}", started_at.year()))
            .join(format!("{:02}", started_at.month()))
            .join(format!("{:02}", started_at.day()))
            .join(format!(
                "{:02}{:02}{:02}",
                started_at.hour(),
                started_at.minute(),
                started_at.second()
            ));
        std::fs::create_dir_all(&root).map_err(|source| ReportError::CreateDir {
            path: root.display().to_string(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// `ITERACAO{n+1}/`, one per iteration (1-indexed to match the
    /// original reporter's folder naming), created on first use.
    pub fn iteration_dir(&self, iteration: u32) -> ReportResult<PathBuf> {
        let dir = self.root.join(format!("ITERACAO{}", iteration + 1));
        std::fs::create_dir_all(&dir).map_err(|source| ReportError::CreateDir {
            path: dir.display().to_string(),
            source,
        })?;
        Ok(dir)
    }

    pub fn events_csv_path(&self, iteration: u32) -> ReportResult<PathBuf> {
        Ok(self.iteration_dir(iteration)?.join("events.csv"))
    }

    pub fn statistics_csv_path(&self, iteration: u32) -> ReportResult<PathBuf> {
        Ok(self.iteration_dir(iteration)?.join("statistics.csv"))
    }

    /// Top-level concatenation of every iteration's `events.csv`, each row
    /// tagged with its `iteration`, written once at the end of a run.
    pub fn all_events_csv_path(&self) -> PathBuf {
        self.root.join("experiment_all_events.csv")
    }

    pub fn iterations_csv_path(&self) -> PathBuf {
        self.root.join("experiment_iterations.csv")
    }

    pub fn components_csv_path(&self) -> PathBuf {
        self.root.join("experiment_components.csv")
    }

    pub fn config_json_path(&self) -> PathBuf {
        self.root.join("experiment_config.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn creates_nested_date_stamped_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let started_at = Utc.with_ymd_and_hms(2026, 3, 5, 14, 30, 7).unwrap();
        let dir = RunDirectory::create(tmp.path(), started_at).unwrap();
        assert!(dir.path().ends_with("2026/03/05/143007"));
        assert!(dir.path().is_dir());
    }

    #[test]
    fn iteration_directories_are_one_indexed_and_created_on_demand() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = RunDirectory::create(tmp.path(), Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()).unwrap();
        let first = dir.iteration_dir(0).unwrap();
        let second = dir.iteration_dir(1).unwrap();
        assert!(first.ends_with("ITERACAO1"));
        assert!(second.ends_with("ITERACAO2"));
        assert!(first.is_dir());
        assert!(second.is_dir());
    }
}
