//! The `actor` facet: analyzing a defined actor.
//!
//! Analysis runs every registered facet's detector against the actor root
//! and merges the detected scopes into the actor model. Detection
//! heuristics live in the facets themselves; this task only orchestrates
//! them.

use crate::context::WhimbrelContext;
use crate::errors::ExecutionError;
use crate::facet::{FacetDetector, FacetModule};
use crate::plan::ExecutionStep;
use crate::task::{FsMode, Parameter, ParameterKind, Task, TaskHandler};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

pub fn actor_facet() -> FacetModule {
    FacetModule::new("actor").task(
        Task::new("actor:analyze", "Analyze Actor")
            .fs_mode(FsMode::Read)
            .parameter(
                "actor",
                Parameter::of(ParameterKind::Actor)
                    .required()
                    .default_ref("source"),
            )
            .handler(Arc::new(AnalyzeActor)),
    )
}

struct AnalyzeActor;

#[async_trait]
impl TaskHandler for AnalyzeActor {
    async fn execute(
        &self,
        ctx: &mut WhimbrelContext,
        step: &ExecutionStep,
    ) -> Result<(), ExecutionError> {
        let (actor_id, root) = match ctx.bound_actor(step) {
            Some(actor) => (actor.id.clone(), actor.root.clone()),
            None => {
                let id = step
                    .inputs
                    .get("actor")
                    .and_then(Value::as_str)
                    .ok_or_else(|| ExecutionError::UnboundActor {
                        step: step.id.clone(),
                    })?;
                let actor =
                    ctx.actor(id)
                        .ok_or_else(|| ExecutionError::ActorNotFound {
                            id: id.to_string(),
                        })?;
                (actor.id.clone(), actor.root.clone())
            }
        };

        let registry = Arc::clone(&ctx.registry);
        for facet in registry.iter() {
            let Some(detector) = facet.detector.clone() else {
                continue;
            };
            let detection = detector.detect(ctx, &root).await?;
            if !detection.detected {
                continue;
            }
            let changed = ctx
                .mutate()
                .set_actor_facet(&actor_id, &facet.id, &detection.scope)?;
            if changed {
                ctx.journal(
                    "detected",
                    &facet.id,
                    json!({"roles": detection.scope.roles}),
                );
            }
        }
        Ok(())
    }
}
