//! The `target` facet: defining the actor under mutation.

use super::source::input_path;
use crate::actor::Actor;
use crate::context::WhimbrelContext;
use crate::errors::ExecutionError;
use crate::facet::FacetModule;
use crate::fs::FileSystem;
use crate::plan::ExecutionStep;
use crate::task::{FsMode, Parameter, ParameterKind, Task, TaskHandler};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

pub fn target_facet() -> FacetModule {
    FacetModule::new("target").task(
        Task::new("target:define", "Define Target")
            .fs_mode(FsMode::Read)
            .parameter("target", Parameter::of(ParameterKind::Value).required())
            .handler(Arc::new(DefineTarget)),
    )
}

struct DefineTarget;

#[async_trait]
impl TaskHandler for DefineTarget {
    async fn execute(
        &self,
        ctx: &mut WhimbrelContext,
        step: &ExecutionStep,
    ) -> Result<(), ExecutionError> {
        let root = input_path(step, "target")?;
        let actor = Actor::at(&root);

        if let Some(existing) = ctx.targets.get(&actor.id) {
            if existing.root == actor.root {
                ctx.journal_note("target already defined");
                return Ok(());
            }
        }

        ctx.fs.write_reference(&actor.root, &root)?;

        ctx.journal(
            "let",
            "target",
            json!({"id": actor.id, "name": actor.name, "root": actor.root}),
        );
        let id = actor.id.clone();
        ctx.mutate().add_target(actor);
        ctx.target = Some(id.clone());
        // The first target of a run anchors the tree being transformed.
        if ctx.root_target.is_none() {
            ctx.root_target = Some(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::{Blueprint, StepBlueprint};
    use crate::facets::builtin_registry;
    use crate::fs::MemFileSystem;
    use crate::logging::NullLog;
    use crate::plan::materialize_plan;
    use crate::runner::Runner;
    use std::path::PathBuf;

    fn test_ctx() -> WhimbrelContext {
        WhimbrelContext::new(PathBuf::from("/tmp/proj"), Arc::new(builtin_registry()))
            .with_fs(Arc::new(MemFileSystem::new()))
            .with_log(Arc::new(NullLog))
    }

    #[tokio::test]
    async fn define_target_sets_both_focus_refs() {
        let mut ctx = test_ctx();
        let bp = Blueprint::of(vec![
            StepBlueprint::task("target:define").input("target", json!({"path": "/tmp/out"})),
        ]);

        let mut plan = materialize_plan(&ctx, &bp).await.unwrap();
        Runner::new().run(&mut ctx, &mut plan).await.unwrap();

        assert_eq!(ctx.target.as_deref(), Some("out"));
        assert_eq!(ctx.root_target.as_deref(), Some("out"));
        assert!(ctx.targets.contains_key("out"));
    }

    #[tokio::test]
    async fn second_target_keeps_root_target() {
        let mut ctx = test_ctx();
        let bp = Blueprint::of(vec![
            StepBlueprint::task("target:define").input("target", json!({"path": "/tmp/out"})),
            StepBlueprint::task("target:define").input("target", json!({"path": "/tmp/out/sub"})),
        ]);

        let mut plan = materialize_plan(&ctx, &bp).await.unwrap();
        Runner::new().run(&mut ctx, &mut plan).await.unwrap();

        assert_eq!(ctx.target.as_deref(), Some("sub"));
        assert_eq!(ctx.root_target.as_deref(), Some("out"));
    }
}
