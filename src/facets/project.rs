//! The `project` facet: whimbrel's own project manifest.
//!
//! Detects `whimbrel.project.json` at an actor root and, when the manifest
//! lists submodules, augments `actor:analyze` with one define step per
//! submodule. This is the canonical facet-driven step injection: the
//! analyze task knows nothing about submodules.

use crate::actor::{Actor, FacetScope};
use crate::blueprint::StepBlueprint;
use crate::context::WhimbrelContext;
use crate::errors::{ExecutionError, MaterializeError};
use crate::facet::{
    AugmentationCondition, AugmentationGenerator, DetectionResult, FacetDetector, FacetModule,
    TaskAugmentation,
};
use crate::fs::FileSystem;
use crate::plan::ExecutionStep;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;

const MANIFEST: &str = "whimbrel.project.json";

pub fn project_facet() -> FacetModule {
    FacetModule::new("project")
        .detector(Arc::new(ProjectDetector))
        .augment(
            "actor:analyze",
            TaskAugmentation::generated(Arc::new(DefineSubmodules))
                .when(Arc::new(HasSubmodules)),
        )
}

fn sub_modules(actor: &Actor) -> Vec<String> {
    actor
        .facet("project")
        .and_then(|scope| scope.config.get("subModules"))
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

struct ProjectDetector;

#[async_trait]
impl FacetDetector for ProjectDetector {
    async fn detect(
        &self,
        ctx: &WhimbrelContext,
        dir: &Path,
    ) -> Result<DetectionResult, ExecutionError> {
        let manifest = dir.join(MANIFEST);
        if !ctx.fs.exists(&manifest) {
            return Ok(DetectionResult::not_found());
        }
        let config = ctx.fs.read_json(&manifest)?;

        let mut scope = FacetScope::with_role("project");
        if let Some(name) = config.get("name") {
            scope = scope.config_entry("name", name.clone());
        }
        if let Some(subs) = config.get("subModules") {
            scope = scope.config_entry("subModules", subs.clone());
        }
        Ok(DetectionResult::found(scope))
    }
}

struct HasSubmodules;

#[async_trait]
impl AugmentationCondition for HasSubmodules {
    async fn evaluate(
        &self,
        _ctx: &WhimbrelContext,
        _step: &ExecutionStep,
        actor: Option<&Actor>,
    ) -> Result<bool, MaterializeError> {
        Ok(actor.is_some_and(|a| !sub_modules(a).is_empty()))
    }
}

struct DefineSubmodules;

#[async_trait]
impl AugmentationGenerator for DefineSubmodules {
    async fn generate(
        &self,
        _ctx: &WhimbrelContext,
        _step: &ExecutionStep,
        actor: Option<&Actor>,
    ) -> Result<Vec<StepBlueprint>, MaterializeError> {
        let actor = actor.ok_or_else(|| {
            MaterializeError::Other(anyhow::anyhow!("submodule augmentation needs a bound actor"))
        })?;
        Ok(sub_modules(actor)
            .into_iter()
            .map(|sub| {
                StepBlueprint::task("source:define")
                    .named(&format!("Define Submodule {sub}"))
                    .pinned()
                    .input("source", json!({"path": actor.root.join(&sub)}))
            })
            .collect())
    }
}
