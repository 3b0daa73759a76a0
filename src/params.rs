//! Parameter resolution.
//!
//! Fills unset step inputs from each parameter's ordered default
//! strategies against the live context. Resolution is idempotent: inputs
//! already present (authored or resolved earlier) are left alone, so the
//! dry-run sandbox and the real run can both call it safely.

use crate::context::WhimbrelContext;
use crate::errors::ExecutionError;
use crate::plan::ExecutionStep;
use crate::task::DefaultStrategy;
use serde_json::Value;

/// Resolve every declared parameter of `step` not already present in its
/// inputs. Fails if a required parameter stays unresolved after all
/// strategies.
pub fn ensure_step_parameters(
    ctx: &WhimbrelContext,
    step: &mut ExecutionStep,
) -> Result<(), ExecutionError> {
    // A role bind without an actor entry resolves to the role's focus
    // actor, keeping the invariant that bind[role] names a live actor.
    if let Some(role) = step.bind_role().map(str::to_string) {
        if !step.bind.contains_key(&role) {
            if let Some(actor) = ctx.focus_actor(&role) {
                step.bind.insert(role, actor.id.clone());
            }
        }
    }

    let names: Vec<String> = step.parameters.keys().cloned().collect();
    for name in names {
        if step.inputs.contains_key(&name) {
            continue;
        }

        let parameter = step.parameters.get(&name).expect("declared parameter");
        let mut resolved: Option<(Value, String)> = None;
        for strategy in &parameter.defaults {
            let value = match strategy {
                DefaultStrategy::Ref { r#ref } => lookup_ref(ctx, r#ref),
                DefaultStrategy::Literal { value } => Some(value.clone()),
            };
            if let Some(value) = value {
                let origin = match strategy {
                    DefaultStrategy::Ref { r#ref } => format!("ref:{}", r#ref),
                    DefaultStrategy::Literal { .. } => "literal".to_string(),
                };
                resolved = Some((value, origin));
                break;
            }
        }

        match resolved {
            Some((value, origin)) => {
                step.inputs.insert(name.clone(), value);
                if let Some(parameter) = step.parameters.get_mut(&name) {
                    parameter.resolved_from = Some(origin.clone());
                }
                // Audit trail on the step itself.
                let audit = step
                    .meta
                    .entry("resolvedParameters".to_string())
                    .or_insert_with(|| Value::Object(serde_json::Map::new()));
                if let Value::Object(map) = audit {
                    map.insert(name.clone(), Value::String(origin));
                }
            }
            None if parameter.required => {
                return Err(ExecutionError::MissingParameter {
                    step: step.id.clone(),
                    parameter: name,
                });
            }
            None => {}
        }
    }

    Ok(())
}

/// Resolve a `{ref: ...}` strategy against the context: the bare role
/// names yield the focus actor's id, `cwd` the working directory, and a
/// dotted path starting with a role traverses the actor's serialized form.
fn lookup_ref(ctx: &WhimbrelContext, path: &str) -> Option<Value> {
    match path {
        "source" | "target" => return ctx.focus_actor(path).map(|a| Value::String(a.id.clone())),
        "cwd" => return Some(Value::String(ctx.cwd.display().to_string())),
        _ => {}
    }

    let (head, rest) = path.split_once('.')?;
    let actor = ctx.focus_actor(head)?;
    let mut cursor = serde_json::to_value(actor).ok()?;
    for segment in rest.split('.') {
        cursor = cursor.get(segment)?.clone();
    }
    Some(cursor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Actor;
    use crate::facet::FacetRegistry;
    use crate::journal::StepExecutionResult;
    use crate::logging::NullLog;
    use crate::plan::TreeState;
    use crate::task::{Parameter, ParameterKind, Task};
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn ctx_with_source() -> WhimbrelContext {
        let mut ctx = WhimbrelContext::new(
            PathBuf::from("/tmp/proj"),
            Arc::new(FacetRegistry::new()),
        )
        .with_log(Arc::new(NullLog));
        ctx.sources.insert("my-app".into(), Actor::at("/tmp/my-app"));
        ctx.source = Some("my-app".into());
        ctx
    }

    fn step_for(task: Task) -> ExecutionStep {
        let task = Arc::new(task);
        ExecutionStep {
            id: task.id.clone(),
            name: task.name.clone(),
            parameters: task.parameters.clone(),
            task,
            inputs: serde_json::Map::new(),
            bind: BTreeMap::new(),
            meta: serde_json::Map::new(),
            pinned: false,
            tree_state: TreeState::Default,
            expected_result: StepExecutionResult::default(),
            result: None,
            children: Vec::new(),
        }
    }

    #[test]
    fn actor_ref_resolves_to_focus_actor_id() {
        let ctx = ctx_with_source();
        let mut step = step_for(Task::new("license:apply", "Apply License").parameter(
            "actor",
            Parameter::of(ParameterKind::Actor)
                .required()
                .default_ref("source"),
        ));

        ensure_step_parameters(&ctx, &mut step).unwrap();
        assert_eq!(step.inputs["actor"], json!("my-app"));
        assert_eq!(
            step.parameters["actor"].resolved_from.as_deref(),
            Some("ref:source")
        );
        assert_eq!(
            step.meta["resolvedParameters"]["actor"],
            json!("ref:source")
        );
    }

    #[test]
    fn dotted_ref_traverses_actor() {
        let ctx = ctx_with_source();
        let mut step = step_for(Task::new("x:y", "X").parameter(
            "root",
            Parameter::of(ParameterKind::Path)
                .required()
                .default_ref("source.root"),
        ));

        ensure_step_parameters(&ctx, &mut step).unwrap();
        assert_eq!(step.inputs["root"], json!("/tmp/my-app"));
    }

    #[test]
    fn first_yielding_strategy_wins() {
        let ctx = ctx_with_source();
        let mut step = step_for(Task::new("x:y", "X").parameter(
            "which",
            Parameter::of(ParameterKind::Value)
                .default_ref("target")
                .default_literal(json!("fallback")),
        ));

        ensure_step_parameters(&ctx, &mut step).unwrap();
        // No target focus, so the literal is next in line.
        assert_eq!(step.inputs["which"], json!("fallback"));
    }

    #[test]
    fn authored_inputs_are_never_overwritten() {
        let ctx = ctx_with_source();
        let mut step = step_for(Task::new("x:y", "X").parameter(
            "actor",
            Parameter::of(ParameterKind::Actor)
                .required()
                .default_ref("source"),
        ));
        step.inputs.insert("actor".into(), json!("explicit"));

        ensure_step_parameters(&ctx, &mut step).unwrap();
        assert_eq!(step.inputs["actor"], json!("explicit"));
        assert!(step.parameters["actor"].resolved_from.is_none());
    }

    #[test]
    fn missing_required_parameter_names_step_and_parameter() {
        let ctx = WhimbrelContext::new(
            PathBuf::from("/tmp/proj"),
            Arc::new(FacetRegistry::new()),
        )
        .with_log(Arc::new(NullLog));
        let mut step = step_for(Task::new("x:y", "X").parameter(
            "actor",
            Parameter::of(ParameterKind::Actor)
                .required()
                .default_ref("source"),
        ));

        let err = ensure_step_parameters(&ctx, &mut step).unwrap_err();
        match err {
            ExecutionError::MissingParameter { step, parameter } => {
                assert_eq!(step, "x:y");
                assert_eq!(parameter, "actor");
            }
            other => panic!("Expected MissingParameter, got {other:?}"),
        }
    }

    #[test]
    fn resolution_is_idempotent() {
        let ctx = ctx_with_source();
        let mut step = step_for(Task::new("x:y", "X").parameter(
            "actor",
            Parameter::of(ParameterKind::Actor)
                .required()
                .default_ref("source"),
        ));

        ensure_step_parameters(&ctx, &mut step).unwrap();
        let first = step.inputs.clone();
        ensure_step_parameters(&ctx, &mut step).unwrap();
        assert_eq!(step.inputs, first);
    }

    #[test]
    fn unresolved_bind_fills_from_focus() {
        let ctx = ctx_with_source();
        let mut step = step_for(Task::new("actor:analyze", "Analyze Actor"));
        step.bind.insert("key".into(), "source".into());

        ensure_step_parameters(&ctx, &mut step).unwrap();
        assert_eq!(step.bind.get("source").map(String::as_str), Some("my-app"));
    }
}
