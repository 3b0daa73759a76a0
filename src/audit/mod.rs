//! Run reports: the persisted form of the mutation journal.
//!
//! Every run writes a JSON record under `.whimbrel/runs/`, with a
//! `current-run.json` kept while the run is in flight. Reports carry the
//! full step tree including each step's journal and mutations, for
//! human inspection and tooling.

mod reporter;

pub use reporter::RunReporter;

use crate::plan::StepReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One run's persisted record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    /// Blueprint file this run materialized, as given by the caller
    pub blueprint: String,
    /// Aggregate fs mode of the materialized plan
    pub fs_mode: String,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub steps: Vec<StepReport>,
}

impl RunRecord {
    pub fn new(blueprint: &str, fs_mode: &str, dry_run: bool) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            blueprint: blueprint.to_string(),
            fs_mode: fs_mode.to_string(),
            dry_run,
            started_at: Utc::now(),
            finished_at: None,
            error: None,
            steps: Vec::new(),
        }
    }

    pub fn finish(&mut self, steps: Vec<StepReport>, error: Option<String>) {
        self.steps = steps;
        self.error = error;
        self.finished_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_record_round_trip() {
        let mut record = RunRecord::new("plan.json", "rw", false);
        record.finish(Vec::new(), Some("step failed".into()));

        let json = serde_json::to_string(&record).unwrap();
        let parsed: RunRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.run_id, record.run_id);
        assert_eq!(parsed.error.as_deref(), Some("step failed"));
        assert!(parsed.finished_at.is_some());
    }

    #[test]
    fn unfinished_record_omits_finished_at() {
        let record = RunRecord::new("plan.json", "r", true);
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("finished_at"));
        assert!(!json.contains("error"));
    }
}
