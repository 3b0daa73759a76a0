//! The `source` facet: defining the actor under analysis.

use crate::actor::Actor;
use crate::context::WhimbrelContext;
use crate::errors::ExecutionError;
use crate::facet::FacetModule;
use crate::fs::FileSystem;
use crate::plan::ExecutionStep;
use crate::task::{FsMode, Parameter, ParameterKind, Task, TaskHandler};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;

pub fn source_facet() -> FacetModule {
    FacetModule::new("source").task(
        Task::new("source:define", "Define Source")
            .fs_mode(FsMode::Read)
            .parameter("source", Parameter::of(ParameterKind::Value).required())
            .handler(Arc::new(DefineSource)),
    )
}

/// Resolve the `{path: ...}` (or plain string) shape of a define input.
pub(super) fn input_path(step: &ExecutionStep, key: &str) -> Result<PathBuf, ExecutionError> {
    let value = step
        .inputs
        .get(key)
        .ok_or_else(|| ExecutionError::MissingParameter {
            step: step.id.clone(),
            parameter: key.to_string(),
        })?;
    let path = match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("path")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ExecutionError::MissingParameter {
                step: step.id.clone(),
                parameter: format!("{key}.path"),
            })?,
        _ => {
            return Err(ExecutionError::MissingParameter {
                step: step.id.clone(),
                parameter: key.to_string(),
            });
        }
    };
    Ok(PathBuf::from(path))
}

struct DefineSource;

#[async_trait]
impl TaskHandler for DefineSource {
    async fn execute(
        &self,
        ctx: &mut WhimbrelContext,
        step: &ExecutionStep,
    ) -> Result<(), ExecutionError> {
        let root = input_path(step, "source")?;
        let actor = Actor::at(&root);

        if let Some(existing) = ctx.sources.get(&actor.id) {
            if existing.root == actor.root {
                // Redundant define: no mutation, so a dry run of this step
                // compares clean against the empty baseline.
                ctx.journal_note("source already defined");
                return Ok(());
            }
        }

        // Mirror the tree into the active filesystem so later dry-run steps
        // can scan it without touching disk.
        ctx.fs.write_reference(&actor.root, &root)?;

        ctx.journal(
            "let",
            "source",
            json!({"id": actor.id, "name": actor.name, "root": actor.root}),
        );
        let id = actor.id.clone();
        ctx.mutate().add_source(actor);
        ctx.source = Some(id);
        Ok(())
    }
}
