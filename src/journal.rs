//! The mutation journal: every observed side effect of a run.
//!
//! Mutations record physical state changes (context model, filesystem,
//! VCS); journal entries are narrative records of computed values. Both are
//! emitted exclusively through the context emission path, are immutable
//! once emitted, and are never retracted; a compensating mutation is
//! emitted instead.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which state a mutation touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    Ctx,
    Fs,
    Vcs,
}

/// What happened to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationOp {
    Add,
    Set,
    Delete,
    Create,
    Modify,
}

/// One observed state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    pub kind: MutationKind,
    pub op: MutationOp,
    /// Identifies the changed object, e.g. `actor:my-app.name`, `sources`,
    /// or a filesystem path.
    pub path: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
}

impl Mutation {
    pub fn new(kind: MutationKind, op: MutationOp, path: impl Into<String>, payload: Value) -> Self {
        Self {
            kind,
            op,
            path: path.into(),
            payload,
        }
    }

    pub fn ctx(op: MutationOp, path: impl Into<String>, payload: Value) -> Self {
        Self::new(MutationKind::Ctx, op, path, payload)
    }

    pub fn fs(op: MutationOp, path: impl Into<String>, payload: Value) -> Self {
        Self::new(MutationKind::Fs, op, path, payload)
    }

    pub fn vcs(op: MutationOp, path: impl Into<String>, payload: Value) -> Self {
        Self::new(MutationKind::Vcs, op, path, payload)
    }
}

/// A narrative record ("let x = y") attached to a step's execution,
/// independent of physical mutations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Id of the step this entry belongs to
    pub origin: String,
    /// Entry kind, e.g. `let`, `detected`, `note`
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub value: Value,
    /// Private entries are narrative-only and excluded from idempotency
    /// comparison.
    #[serde(default)]
    pub private: bool,
}

impl JournalEntry {
    pub fn new(origin: &str, kind: &str, name: &str, value: Value) -> Self {
        Self {
            origin: origin.to_string(),
            kind: kind.to_string(),
            name: name.to_string(),
            value,
            private: false,
        }
    }

    pub fn private(mut self) -> Self {
        self.private = true;
        self
    }
}

/// Mutations of one step execution, split per category for comparison.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MutationSet {
    #[serde(default)]
    pub fs: Vec<Mutation>,
    #[serde(default)]
    pub vcs: Vec<Mutation>,
    #[serde(default)]
    pub ctx: Vec<Mutation>,
}

impl MutationSet {
    pub fn push(&mut self, mutation: Mutation) {
        match mutation.kind {
            MutationKind::Fs => self.fs.push(mutation),
            MutationKind::Vcs => self.vcs.push(mutation),
            MutationKind::Ctx => self.ctx.push(mutation),
        }
    }

    pub fn len(&self) -> usize {
        self.fs.len() + self.vcs.len() + self.ctx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The accumulated journal and mutations of one step's single execution
/// attempt. Two instances exist for a dry-run-compared step: the trial
/// result from sandboxed execution and the real result, if executed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepExecutionResult {
    #[serde(default)]
    pub journal: Vec<JournalEntry>,
    #[serde(default)]
    pub mutations: MutationSet,
}

impl StepExecutionResult {
    pub fn is_empty(&self) -> bool {
        self.journal.iter().all(|e| e.private) && self.mutations.is_empty()
    }
}
