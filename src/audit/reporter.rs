use super::RunRecord;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Writes run records under a report directory (usually `.whimbrel/`).
pub struct RunReporter {
    report_dir: PathBuf,
    current_run: Option<RunRecord>,
    current_run_file: PathBuf,
}

impl RunReporter {
    pub fn new(report_dir: &Path) -> Self {
        let current_run_file = report_dir.join("current-run.json");
        Self {
            report_dir: report_dir.to_path_buf(),
            current_run: None,
            current_run_file,
        }
    }

    pub fn start_run(&mut self, record: RunRecord) -> Result<()> {
        self.current_run = Some(record);
        self.save_current()
    }

    pub fn current_run(&self) -> Option<&RunRecord> {
        self.current_run.as_ref()
    }

    pub fn current_run_mut(&mut self) -> Option<&mut RunRecord> {
        self.current_run.as_mut()
    }

    /// Persist the finished record to `runs/` and drop `current-run.json`.
    pub fn finish_run(&mut self) -> Result<PathBuf> {
        let run = self
            .current_run
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("No current run to finish"))?;

        let filename = format!(
            "{}_{}.json",
            run.started_at.format("%Y-%m-%dT%H-%M-%S"),
            &run.run_id.to_string()[..8]
        );
        let runs_dir = self.report_dir.join("runs");
        fs::create_dir_all(&runs_dir).context("Failed to create runs directory")?;
        let run_file = runs_dir.join(&filename);

        let json = serde_json::to_string_pretty(run).context("Failed to serialize run record")?;
        fs::write(&run_file, json).context("Failed to write run record file")?;

        if self.current_run_file.exists() {
            fs::remove_file(&self.current_run_file)
                .context("Failed to remove current-run.json after finishing run")?;
        }

        self.current_run = None;
        Ok(run_file)
    }

    pub fn save_current(&self) -> Result<()> {
        if let Some(ref run) = self.current_run {
            fs::create_dir_all(&self.report_dir).context("Failed to create report directory")?;
            let json =
                serde_json::to_string_pretty(run).context("Failed to serialize current run")?;
            fs::write(&self.current_run_file, json).context("Failed to write current run file")?;
        }
        Ok(())
    }

    pub fn list_runs(&self) -> Result<Vec<PathBuf>> {
        let runs_dir = self.report_dir.join("runs");
        if !runs_dir.exists() {
            return Ok(Vec::new());
        }
        let mut runs: Vec<PathBuf> = fs::read_dir(&runs_dir)
            .context("Failed to read runs directory")?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        runs.sort();
        Ok(runs)
    }
}
