//! Blueprint materialization.
//!
//! Turns declarative blueprints into the concrete `ExecutionStep` tree:
//! task lookup, preparation inference, parameter-schema deep copy,
//! augmentation expansion, and fs-mode aggregation. Expansion runs over an
//! explicit worklist with an arena of materialized nodes, so recursive
//! augmentations (steps generating steps generating steps) cannot grow the
//! call stack.

use super::{ExecutionPlan, ExecutionStep, TreeState, apply_augmentations, determine_plan_fs_mode};
use crate::blueprint::{Blueprint, StepBlueprint};
use crate::context::WhimbrelContext;
use crate::errors::MaterializeError;
use crate::journal::StepExecutionResult;
use crate::task::{ParameterKind, Task};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;

struct Job {
    blueprint: StepBlueprint,
    parent: Option<usize>,
}

struct ArenaNode {
    step: ExecutionStep,
    parent: Option<usize>,
}

/// Materialize a blueprint into an execution plan against the live context.
///
/// Fails fast: an unknown facet/task or a throwing augmentation aborts
/// materialization before anything runs.
pub async fn materialize_plan(
    ctx: &WhimbrelContext,
    blueprint: &Blueprint,
) -> Result<ExecutionPlan, MaterializeError> {
    let mut arena: Vec<ArenaNode> = Vec::new();
    let mut prepared: BTreeSet<String> = BTreeSet::new();

    // LIFO worklist; children are pushed in reverse so pop order is
    // document (depth-first) order, which is also execution order.
    let mut stack: Vec<Job> = Vec::new();
    for step in blueprint.steps.iter().rev() {
        stack.push(Job {
            blueprint: step.clone(),
            parent: None,
        });
    }

    while let Some(job) = stack.pop() {
        let task = ctx.registry.lookup_task(&job.blueprint.task)?;

        // Preparation inference: a task requiring "the current source or
        // target" with none defined yet gets a pinned define + analyze
        // pair prepended ahead of it, once per role per plan. A step that
        // already carries a role bind is satisfied by that bind.
        let prep = if job.blueprint.bind.contains_key("key") {
            Vec::new()
        } else {
            preparation_steps(ctx, &task, &mut prepared)
        };
        if !prep.is_empty() {
            let parent = job.parent;
            stack.push(job);
            for step in prep.into_iter().rev() {
                stack.push(Job {
                    blueprint: step,
                    parent,
                });
            }
            continue;
        }

        // An explicit define counts as preparation for its role.
        for role in ["source", "target"] {
            if job.blueprint.task == format!("{role}:define") {
                prepared.insert(role.to_string());
            }
        }

        let step = build_step(&task, &job.blueprint);

        let augmentations = ctx.registry.augmentations_for(&task.id);
        let generated = apply_augmentations(ctx, &step, &augmentations).await?;

        let slot = arena.len();
        arena.push(ArenaNode {
            step,
            parent: job.parent,
        });

        let children: Vec<StepBlueprint> = job
            .blueprint
            .steps
            .iter()
            .cloned()
            .chain(generated)
            .collect();
        for child in children.into_iter().rev() {
            stack.push(Job {
                blueprint: child,
                parent: Some(slot),
            });
        }
    }

    // Assemble the tree. Children always live at higher indices than their
    // parent, so a reverse sweep sees every subtree completed before it is
    // attached.
    let mut roots: Vec<ExecutionStep> = Vec::new();
    while let Some(node) = arena.pop() {
        match node.parent {
            Some(parent) => arena[parent].step.children.insert(0, node.step),
            None => roots.insert(0, node.step),
        }
    }

    let fs_mode = determine_plan_fs_mode(&roots);
    Ok(ExecutionPlan {
        steps: roots,
        fs_mode,
    })
}

/// The define + analyze blueprint pair for every actor role `task` needs
/// but the context does not have yet.
fn preparation_steps(
    ctx: &WhimbrelContext,
    task: &Task,
    prepared: &mut BTreeSet<String>,
) -> Vec<StepBlueprint> {
    let mut steps = Vec::new();
    for parameter in task.parameters.values() {
        if parameter.kind != ParameterKind::Actor || !parameter.required {
            continue;
        }
        let Some(role) = parameter.role_source() else {
            continue;
        };
        if prepared.contains(role) || ctx.focus_actor(role).is_some() {
            continue;
        }
        prepared.insert(role.to_string());
        steps.push(
            StepBlueprint::task(&format!("{role}:define"))
                .pinned()
                .bind_role(role)
                .input(role, json!({"path": ctx.cwd})),
        );
        steps.push(StepBlueprint::task("actor:analyze").pinned().bind_role(role));
    }
    steps
}

fn build_step(task: &Arc<Task>, blueprint: &StepBlueprint) -> ExecutionStep {
    // A distinguishing bind derives a 3-segment id; the bare task id
    // otherwise.
    let bound_actor = blueprint
        .bind
        .get("key")
        .and_then(|role| blueprint.bind.get(role));
    let id = match bound_actor {
        Some(actor) => format!("{actor}:{}", task.id),
        None => task.id.clone(),
    };

    ExecutionStep {
        id,
        name: blueprint
            .name
            .clone()
            .unwrap_or_else(|| task.name.clone()),
        task: Arc::clone(task),
        inputs: blueprint.inputs.clone(),
        parameters: task.parameters.clone(),
        bind: blueprint.bind.clone(),
        meta: serde_json::Map::new(),
        pinned: blueprint.pinned,
        tree_state: TreeState::Default,
        expected_result: StepExecutionResult::default(),
        result: None,
        children: Vec::new(),
    }
}
