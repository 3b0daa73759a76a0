//! The augmentation resolver.
//!
//! Facets inject cross-cutting steps into tasks they do not own by
//! registering `TaskAugmentation`s against the task's id. All augmentations
//! whose condition passes are applied, concatenated in facet-registration
//! order. This is the system's sole extension point.

use crate::blueprint::StepBlueprint;
use crate::context::WhimbrelContext;
use crate::errors::MaterializeError;
use crate::facet::{
    AugmentationCondition, AugmentationGenerator, AugmentationSteps, TaskAugmentation,
};
use crate::plan::ExecutionStep;

/// Evaluate the given augmentations against a materializing step and
/// collect the child-step blueprints they contribute.
///
/// The actor handed to conditions and generators is resolved from the
/// step's bind; parameter resolution has not happened yet, so an
/// augmentation must not rely on it.
pub async fn apply_augmentations(
    ctx: &WhimbrelContext,
    step: &ExecutionStep,
    augmentations: &[(&str, &TaskAugmentation)],
) -> Result<Vec<StepBlueprint>, MaterializeError> {
    let actor = ctx.bound_actor(step);
    let mut steps = Vec::new();

    for (facet_id, augmentation) in augmentations {
        if let Some(condition) = &augmentation.condition {
            let passed = condition
                .evaluate(ctx, step, actor)
                .await
                .map_err(|e| MaterializeError::AugmentationFailed {
                    step: step.id.clone(),
                    message: format!("condition of facet '{facet_id}': {e}"),
                })?;
            if !passed {
                continue;
            }
        }

        match &augmentation.steps {
            AugmentationSteps::Static(list) => steps.extend(list.iter().cloned()),
            AugmentationSteps::Generator(generator) => {
                let generated = generator.generate(ctx, step, actor).await.map_err(|e| {
                    MaterializeError::AugmentationFailed {
                        step: step.id.clone(),
                        message: format!("generator of facet '{facet_id}': {e}"),
                    }
                })?;
                steps.extend(generated);
            }
        }
    }

    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Actor;
    use crate::facet::{
        AugmentationCondition, AugmentationGenerator, FacetRegistry, TaskAugmentation,
    };
    use crate::journal::StepExecutionResult;
    use crate::plan::TreeState;
    use crate::task::Task;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn test_step() -> ExecutionStep {
        ExecutionStep {
            id: "actor:analyze".into(),
            name: "Analyze Actor".into(),
            task: Arc::new(Task::new("actor:analyze", "Analyze Actor")),
            inputs: serde_json::Map::new(),
            parameters: BTreeMap::new(),
            bind: BTreeMap::from([("key".to_string(), "source".to_string())]),
            meta: serde_json::Map::new(),
            pinned: false,
            tree_state: TreeState::Default,
            expected_result: StepExecutionResult::default(),
            result: None,
            children: Vec::new(),
        }
    }

    fn test_ctx() -> WhimbrelContext {
        let mut ctx = WhimbrelContext::new(
            PathBuf::from("/tmp/proj"),
            Arc::new(FacetRegistry::new()),
        )
        .with_log(Arc::new(crate::logging::NullLog));
        ctx.sources.insert("p".into(), Actor::at("/tmp/p"));
        ctx.source = Some("p".into());
        ctx
    }

    struct Never;

    #[async_trait]
    impl AugmentationCondition for Never {
        async fn evaluate(
            &self,
            _ctx: &WhimbrelContext,
            _step: &ExecutionStep,
            _actor: Option<&Actor>,
        ) -> Result<bool, MaterializeError> {
            Ok(false)
        }
    }

    struct PerActorSteps;

    #[async_trait]
    impl AugmentationGenerator for PerActorSteps {
        async fn generate(
            &self,
            _ctx: &WhimbrelContext,
            _step: &ExecutionStep,
            actor: Option<&Actor>,
        ) -> Result<Vec<StepBlueprint>, MaterializeError> {
            let actor = actor.expect("bound in test");
            Ok(vec![
                StepBlueprint::task("source:define").named(&format!("Define {}", actor.id)),
            ])
        }
    }

    struct Explodes;

    #[async_trait]
    impl AugmentationGenerator for Explodes {
        async fn generate(
            &self,
            _ctx: &WhimbrelContext,
            _step: &ExecutionStep,
            _actor: Option<&Actor>,
        ) -> Result<Vec<StepBlueprint>, MaterializeError> {
            Err(MaterializeError::Other(anyhow::anyhow!("boom")))
        }
    }

    #[tokio::test]
    async fn static_steps_are_applied_in_order() {
        let ctx = test_ctx();
        let step = test_step();
        let a = TaskAugmentation::of_steps(vec![StepBlueprint::task("a:one")]);
        let b = TaskAugmentation::of_steps(vec![StepBlueprint::task("b:two")]);
        let augs = vec![("a", &a), ("b", &b)];

        let steps = apply_augmentations(&ctx, &step, &augs).await.unwrap();
        let tasks: Vec<_> = steps.iter().map(|s| s.task.as_str()).collect();
        assert_eq!(tasks, vec!["a:one", "b:two"]);
    }

    #[tokio::test]
    async fn failed_condition_skips_without_side_effects() {
        let ctx = test_ctx();
        let step = test_step();
        let gated = TaskAugmentation::of_steps(vec![StepBlueprint::task("a:one")])
            .when(Arc::new(Never));
        let augs = vec![("a", &gated)];

        let steps = apply_augmentations(&ctx, &step, &augs).await.unwrap();
        assert!(steps.is_empty());
    }

    #[tokio::test]
    async fn generator_receives_bound_actor() {
        let ctx = test_ctx();
        let step = test_step();
        let aug = TaskAugmentation::generated(Arc::new(PerActorSteps));
        let augs = vec![("project", &aug)];

        let steps = apply_augmentations(&ctx, &step, &augs).await.unwrap();
        assert_eq!(steps[0].name.as_deref(), Some("Define p"));
    }

    #[tokio::test]
    async fn generator_failure_is_a_materialization_failure() {
        let ctx = test_ctx();
        let step = test_step();
        let aug = TaskAugmentation::generated(Arc::new(Explodes));
        let augs = vec![("project", &aug)];

        let err = apply_augmentations(&ctx, &step, &augs).await.unwrap_err();
        match err {
            MaterializeError::AugmentationFailed { step, message } => {
                assert_eq!(step, "actor:analyze");
                assert!(message.contains("project"));
                assert!(message.contains("boom"));
            }
            other => panic!("Expected AugmentationFailed, got {other:?}"),
        }
    }
}
