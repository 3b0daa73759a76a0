//! Materialized execution plans.
//!
//! The materializer turns blueprints into a tree of `ExecutionStep`s; the
//! runner drives that tree. `StepReport` is the serializable projection
//! used for rendering and run reports.

mod augment;
mod materialize;
mod selector;

pub use augment::apply_augmentations;
pub use materialize::materialize_plan;
pub use selector::matches_step_id_selector;

use crate::journal::StepExecutionResult;
use crate::task::{FsMode, Parameter, Task};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Where a step is in its lifecycle. Transitions only during the runner
/// pass; never mutated after the run completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TreeState {
    #[default]
    Default,
    /// The dry-run trial matched the expected baseline; nothing to do.
    Satisfied { reason: String },
    /// Filtered out by a step selector; not executed.
    Skipped,
    Completed,
    Failed { error: String },
}

impl TreeState {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, TreeState::Satisfied { .. })
    }
}

/// A materialized, resolvable node in the run tree.
#[derive(Debug, Clone)]
pub struct ExecutionStep {
    pub id: String,
    pub name: String,
    pub task: Arc<Task>,
    pub inputs: Map<String, Value>,
    /// Deep copy of the task's parameter schema; resolution is journaled
    /// here without touching the shared definition.
    pub parameters: BTreeMap<String, Parameter>,
    pub bind: BTreeMap<String, String>,
    pub meta: Map<String, Value>,
    pub pinned: bool,
    pub tree_state: TreeState,
    /// Baseline the dry-run trial is compared against. Empty for a
    /// first-time run.
    pub expected_result: StepExecutionResult,
    /// The real result, if the step was executed for real.
    pub result: Option<StepExecutionResult>,
    pub children: Vec<ExecutionStep>,
}

impl ExecutionStep {
    /// The role this step concerns, per its bind.
    pub fn bind_role(&self) -> Option<&str> {
        self.bind.get("key").map(String::as_str)
    }

    /// The actor id this step is bound to, once resolved.
    pub fn bound_actor_id(&self) -> Option<&str> {
        let role = self.bind_role()?;
        self.bind.get(role).map(String::as_str)
    }

    /// Number of steps in this subtree, including self.
    pub fn subtree_len(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(ExecutionStep::subtree_len)
            .sum::<usize>()
    }

    pub fn report(&self) -> StepReport {
        StepReport {
            id: self.id.clone(),
            name: self.name.clone(),
            bind: self.bind.clone(),
            fs_mode: self.task.fs_mode,
            tree_state: self.tree_state.clone(),
            result: self.result.clone(),
            children: self.children.iter().map(ExecutionStep::report).collect(),
        }
    }
}

/// The root container of a materialized run.
#[derive(Debug)]
pub struct ExecutionPlan {
    pub steps: Vec<ExecutionStep>,
    /// Aggregate footprint, so callers can pre-flight whether the run
    /// touches disk at all.
    pub fs_mode: FsMode,
}

impl ExecutionPlan {
    pub fn step_count(&self) -> usize {
        self.steps.iter().map(ExecutionStep::subtree_len).sum()
    }

    pub fn report(&self) -> Vec<StepReport> {
        self.steps.iter().map(ExecutionStep::report).collect()
    }
}

/// Serializable projection of a step for rendering and run reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub bind: BTreeMap<String, String>,
    #[serde(default)]
    pub fs_mode: FsMode,
    #[serde(default)]
    pub tree_state: TreeState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<StepExecutionResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<StepReport>,
}

/// Aggregate the filesystem footprint of a step forest, bottom-up: `-`
/// entries are discarded, the rest union (`r`+`w` widening to `rw`).
pub fn determine_plan_fs_mode(steps: &[ExecutionStep]) -> FsMode {
    let mut mode = FsMode::None;
    for step in steps {
        mode = mode.union(step.task.fs_mode);
        mode = mode.union(determine_plan_fs_mode(&step.children));
    }
    mode
}
