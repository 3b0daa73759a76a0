//! Task definitions: the named, parameterized units of work facets register.
//!
//! A `Task` is declared once at facet-registration time and is immutable
//! afterwards; the materializer deep-copies its parameter schema into every
//! `ExecutionStep` that references it so resolution can be journaled per
//! step without touching the shared definition.

use crate::context::WhimbrelContext;
use crate::errors::ExecutionError;
use crate::plan::ExecutionStep;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Declared or aggregated filesystem access level of a task or subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FsMode {
    /// No filesystem access at all
    #[serde(rename = "-")]
    None,
    /// Read-only
    #[default]
    #[serde(rename = "r")]
    Read,
    /// Write-only
    #[serde(rename = "w")]
    Write,
    /// Both
    #[serde(rename = "rw")]
    ReadWrite,
}

impl FsMode {
    /// Union two modes: `-` is the identity, `r`+`w` widen to `rw`.
    pub fn union(self, other: FsMode) -> FsMode {
        use FsMode::*;
        match (self, other) {
            (None, m) | (m, None) => m,
            (Read, Read) => Read,
            (Write, Write) => Write,
            _ => ReadWrite,
        }
    }

    pub fn writes(self) -> bool {
        matches!(self, FsMode::Write | FsMode::ReadWrite)
    }
}

impl std::fmt::Display for FsMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FsMode::None => "-",
            FsMode::Read => "r",
            FsMode::Write => "w",
            FsMode::ReadWrite => "rw",
        };
        write!(f, "{s}")
    }
}

/// Declared type of a task parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    /// Resolves to an actor id
    Actor,
    String,
    Path,
    /// Arbitrary JSON
    Value,
}

/// One strategy for defaulting an unset parameter, tried in declared order.
/// Serializes to the blueprint shapes `{"ref": "source"}` and
/// `{"value": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultStrategy {
    /// Resolve against the live context: `source`, `target`, or a dotted
    /// path such as `source.root`.
    Ref { r#ref: String },
    /// A literal value.
    Literal { value: Value },
}

impl DefaultStrategy {
    pub fn reference(path: &str) -> Self {
        Self::Ref {
            r#ref: path.to_string(),
        }
    }

    pub fn literal(value: Value) -> Self {
        Self::Literal { value }
    }
}

/// A declared task parameter: type, required flag, and default strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub kind: ParameterKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub defaults: Vec<DefaultStrategy>,
    /// Audit trail: which strategy produced the resolved value, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_from: Option<String>,
}

impl Parameter {
    pub fn of(kind: ParameterKind) -> Self {
        Self {
            kind,
            required: false,
            defaults: Vec::new(),
            resolved_from: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_ref(mut self, path: &str) -> Self {
        self.defaults.push(DefaultStrategy::reference(path));
        self
    }

    pub fn default_literal(mut self, value: Value) -> Self {
        self.defaults.push(DefaultStrategy::literal(value));
        self
    }

    /// The role this parameter draws from, if its first default strategy is
    /// an actor-role reference (`source` or `target`). Preparation inference
    /// keys off this.
    pub fn role_source(&self) -> Option<&str> {
        match self.defaults.first() {
            Some(DefaultStrategy::Ref { r#ref }) if r#ref == "source" || r#ref == "target" => {
                Some(r#ref.as_str())
            }
            _ => None,
        }
    }
}

/// Behavior of a task. `dry_execute` defaults to `execute`; tasks whose real
/// execution has external side effects override it with a simulation.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn execute(
        &self,
        ctx: &mut WhimbrelContext,
        step: &ExecutionStep,
    ) -> Result<(), ExecutionError>;

    async fn dry_execute(
        &self,
        ctx: &mut WhimbrelContext,
        step: &ExecutionStep,
    ) -> Result<(), ExecutionError> {
        self.execute(ctx, step).await
    }
}

/// A named, parameterized unit of work belonging to a facet.
#[derive(Clone)]
pub struct Task {
    /// Namespaced id, `facet:name`
    pub id: String,
    /// Default display name for steps referencing this task
    pub name: String,
    pub parameters: BTreeMap<String, Parameter>,
    pub fs_mode: FsMode,
    /// Absent for structural container tasks, which only group children.
    pub handler: Option<Arc<dyn TaskHandler>>,
}

impl Task {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            parameters: BTreeMap::new(),
            fs_mode: FsMode::default(),
            handler: None,
        }
    }

    pub fn fs_mode(mut self, mode: FsMode) -> Self {
        self.fs_mode = mode;
        self
    }

    pub fn parameter(mut self, name: &str, parameter: Parameter) -> Self {
        self.parameters.insert(name.to_string(), parameter);
        self
    }

    pub fn handler(mut self, handler: Arc<dyn TaskHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// The facet half of the task id.
    pub fn facet_id(&self) -> &str {
        self.id.split(':').next().unwrap_or(&self.id)
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("fs_mode", &self.fs_mode)
            .field("parameters", &self.parameters)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}
