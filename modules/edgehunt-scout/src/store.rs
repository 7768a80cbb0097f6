//! Run persistence — the append-only experiment log and discovered-scenario
//! artifacts.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use edgehunt_common::RunRecord;
use tracing::info;

pub const LOG_HEADER: &str = "iteration,ego_speed,lateral_offset,road_condition,min_ttc,score,status";

/// Where each iteration's outcome goes.
pub trait RunRecorder: Send {
    /// Append one row to the experiment log.
    fn record_run(&mut self, record: &RunRecord) -> Result<()>;

    /// Persist a scenario whose score was nonzero. Returns where it went.
    fn save_edge_case(&mut self, iteration: u32, score: f64, document: &str) -> Result<PathBuf>;
}

/// File name used for a discovered scenario.
pub fn edge_case_file_name(iteration: u32, score: f64) -> String {
    format!("edge_case_{iteration}_score{score:.2}.xosc")
}

// ---------------------------------------------------------------------------
// DiskRecorder
// ---------------------------------------------------------------------------

/// `{data_dir}/logs/experiment_log.csv` plus `{data_dir}/results/`.
pub struct DiskRecorder {
    log_path: PathBuf,
    results_dir: PathBuf,
    log: File,
}

impl DiskRecorder {
    /// Start a fresh log, discarding the one from any previous run.
    pub fn create(data_dir: &Path) -> Result<Self> {
        let logs_dir = data_dir.join("logs");
        let results_dir = data_dir.join("results");
        std::fs::create_dir_all(&logs_dir)
            .with_context(|| format!("creating {}", logs_dir.display()))?;
        std::fs::create_dir_all(&results_dir)
            .with_context(|| format!("creating {}", results_dir.display()))?;

        let log_path = logs_dir.join("experiment_log.csv");
        if log_path.exists() {
            std::fs::remove_file(&log_path)
                .with_context(|| format!("removing previous log {}", log_path.display()))?;
        }

        let mut log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("opening {}", log_path.display()))?;
        writeln!(log, "{LOG_HEADER}")?;

        info!(path = %log_path.display(), "Experiment log created");
        Ok(Self {
            log_path,
            results_dir,
            log,
        })
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }
}

impl RunRecorder for DiskRecorder {
    fn record_run(&mut self, r: &RunRecord) -> Result<()> {
        writeln!(
            self.log,
            "{},{},{},{},{},{},{}",
            r.iteration, r.ego_speed, r.lateral_offset, r.road_condition, r.min_ttc, r.score, r.status
        )
        .with_context(|| format!("appending to {}", self.log_path.display()))?;
        self.log.flush()?;
        Ok(())
    }

    fn save_edge_case(&mut self, iteration: u32, score: f64, document: &str) -> Result<PathBuf> {
        let path = self.results_dir.join(edge_case_file_name(iteration, score));
        std::fs::write(&path, document).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "Saved edge case scenario");
        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// Reading the log back
// ---------------------------------------------------------------------------

pub fn read_log(path: &Path) -> Result<Vec<RunRecord>> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;

    let mut lines = contents.lines();
    match lines.next() {
        Some(header) if header.trim() == LOG_HEADER => {}
        Some(other) => bail!("unexpected log header: {other}"),
        None => bail!("log {} is empty", path.display()),
    }

    lines
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| parse_row(line).with_context(|| format!("log row {}", i + 1)))
        .collect()
}

fn parse_row(line: &str) -> Result<RunRecord> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let [iteration, ego_speed, lateral_offset, road_condition, min_ttc, score, status] =
        fields.as_slice()
    else {
        bail!("expected 7 fields, found {}", fields.len());
    };

    Ok(RunRecord {
        iteration: iteration.parse()?,
        ego_speed: ego_speed.parse()?,
        lateral_offset: lateral_offset.parse()?,
        road_condition: road_condition.parse().map_err(anyhow::Error::msg)?,
        min_ttc: min_ttc.parse()?,
        score: score.parse()?,
        status: status.parse().map_err(anyhow::Error::msg)?,
    })
}

#[cfg(test)]
mod tests {
    use edgehunt_common::{RiskStatus, RoadCondition};

    use super::*;

    fn record(iteration: u32, score: f64, status: RiskStatus) -> RunRecord {
        RunRecord {
            iteration,
            ego_speed: 98.5,
            lateral_offset: 2.25,
            road_condition: RoadCondition::Rainy,
            min_ttc: 0.42,
            score,
            status,
        }
    }

    #[test]
    fn edge_case_name_uses_two_decimal_score() {
        assert_eq!(edge_case_file_name(4, 1.0), "edge_case_4_score1.00.xosc");
        assert_eq!(edge_case_file_name(2, 0.866_666), "edge_case_2_score0.87.xosc");
    }

    #[test]
    fn log_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = DiskRecorder::create(dir.path()).unwrap();
        recorder.record_run(&record(1, 0.0, RiskStatus::Safe)).unwrap();
        recorder
            .record_run(&record(2, 0.72, RiskStatus::CriticalNearMiss))
            .unwrap();

        let contents = std::fs::read_to_string(recorder.log_path()).unwrap();
        assert_eq!(contents.lines().next(), Some(LOG_HEADER));
        assert_eq!(contents.matches(LOG_HEADER).count(), 1);
        assert!(contents.contains("2,98.5,2.25,rainy,0.42,0.72,CRITICAL_NEAR_MISS"));

        let rows = read_log(recorder.log_path()).unwrap();
        assert_eq!(rows, vec![
            record(1, 0.0, RiskStatus::Safe),
            record(2, 0.72, RiskStatus::CriticalNearMiss),
        ]);
    }

    #[test]
    fn create_discards_previous_log() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut recorder = DiskRecorder::create(dir.path()).unwrap();
            recorder.record_run(&record(1, 0.0, RiskStatus::Safe)).unwrap();
        }
        let recorder = DiskRecorder::create(dir.path()).unwrap();
        assert!(read_log(recorder.log_path()).unwrap().is_empty());
    }

    #[test]
    fn edge_cases_land_in_results_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = DiskRecorder::create(dir.path()).unwrap();
        let path = recorder.save_edge_case(3, 1.0, "<OpenSCENARIO/>").unwrap();
        assert_eq!(path, dir.path().join("results/edge_case_3_score1.00.xosc"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "<OpenSCENARIO/>");
    }

    #[test]
    fn malformed_rows_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        std::fs::write(&path, format!("{LOG_HEADER}\n1,fast,2,clear,1,0,SAFE\n")).unwrap();
        assert!(read_log(&path).is_err());

        std::fs::write(&path, "not,a,header\n").unwrap();
        assert!(read_log(&path).is_err());
    }
}
