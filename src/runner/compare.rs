//! The idempotency comparator.
//!
//! Decides whether a dry-run trial result matches a step's expected
//! baseline, i.e. whether executing the step for real would change
//! anything. Journal values are normalized to a canonical,
//! order-independent form before comparison (large values reduced to a
//! SHA-256 digest); VCS mutations dispatch to a per-kind equality hook
//! with structural equality as the fallback.

use crate::journal::{JournalEntry, Mutation, StepExecutionResult};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Canonical forms longer than this compare by digest instead of by value.
const DIGEST_THRESHOLD: usize = 256;

/// Equality hook for one VCS kind (e.g. `git`), keyed by the `vcs` field
/// of the mutation payload.
pub trait VcsEquality: Send + Sync {
    fn kind(&self) -> &str;
    fn equal(&self, a: &Mutation, b: &Mutation) -> bool;
}

/// Registered per-kind equality hooks.
#[derive(Default)]
pub struct ComparatorRegistry {
    vcs_hooks: BTreeMap<String, Arc<dyn VcsEquality>>,
}

impl ComparatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_vcs(&mut self, hook: Arc<dyn VcsEquality>) {
        self.vcs_hooks.insert(hook.kind().to_string(), hook);
    }

    fn vcs_equal(&self, a: &Mutation, b: &Mutation) -> bool {
        let kind = a.payload.get("vcs").and_then(Value::as_str);
        if let Some(kind) = kind {
            if kind == b.payload.get("vcs").and_then(Value::as_str).unwrap_or_default() {
                if let Some(hook) = self.vcs_hooks.get(kind) {
                    return hook.equal(a, b);
                }
            }
        }
        mutation_equal(a, b)
    }
}

/// Whether a trial result is structurally equal to the expected baseline.
pub fn results_match(
    trial: &StepExecutionResult,
    expected: &StepExecutionResult,
    comparators: &ComparatorRegistry,
) -> bool {
    let trial_journal: Vec<&JournalEntry> =
        trial.journal.iter().filter(|e| !e.private).collect();
    let expected_journal: Vec<&JournalEntry> =
        expected.journal.iter().filter(|e| !e.private).collect();

    if trial_journal.len() != expected_journal.len() {
        return false;
    }
    for (a, b) in trial_journal.iter().zip(&expected_journal) {
        if !journal_entry_equal(a, b) {
            return false;
        }
    }

    let pairwise = |a: &[Mutation], b: &[Mutation]| {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| mutation_equal(x, y))
    };
    if !pairwise(&trial.mutations.ctx, &expected.mutations.ctx) {
        return false;
    }
    if !pairwise(&trial.mutations.fs, &expected.mutations.fs) {
        return false;
    }

    let trial_vcs = &trial.mutations.vcs;
    let expected_vcs = &expected.mutations.vcs;
    trial_vcs.len() == expected_vcs.len()
        && trial_vcs
            .iter()
            .zip(expected_vcs)
            .all(|(a, b)| comparators.vcs_equal(a, b))
}

fn journal_entry_equal(a: &JournalEntry, b: &JournalEntry) -> bool {
    a.kind == b.kind && a.name == b.name && normalize_value(&a.value) == normalize_value(&b.value)
}

fn mutation_equal(a: &Mutation, b: &Mutation) -> bool {
    a.kind == b.kind
        && a.op == b.op
        && a.path == b.path
        && normalize_value(&a.payload) == normalize_value(&b.payload)
}

/// Reduce a value to a stable representation: object keys sorted
/// recursively, and anything whose canonical form is large replaced by its
/// digest.
pub fn normalize_value(value: &Value) -> Value {
    let canonical = canonicalize(value);
    let text = canonical.to_string();
    if text.len() > DIGEST_THRESHOLD {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        Value::String(format!("sha256:{:x}", hasher.finalize()))
    } else {
        canonical
    }
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, &Value> = map.iter().collect();
            let mut out = serde_json::Map::with_capacity(sorted.len());
            for (key, value) in sorted {
                out.insert(key.clone(), canonicalize(value));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
