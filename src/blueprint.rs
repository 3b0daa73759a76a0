//! Blueprints: declarative, pre-materialization intent.
//!
//! A blueprint describes *what* should run (task invocations with inputs,
//! binds, and optional explicit children) without committing to the
//! concrete step tree. Blueprints are authored by callers (CLI, facade) or
//! generated by facet augmentations, and are consumed once during
//! materialization.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// The root container callers hand to the materializer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Blueprint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub steps: Vec<StepBlueprint>,
}

impl Blueprint {
    pub fn of(steps: Vec<StepBlueprint>) -> Self {
        Self { name: None, steps }
    }

    /// Load a blueprint from a JSON or YAML file, by extension.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read blueprint file: {}", path.display()))?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        if is_yaml {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse blueprint YAML: {}", path.display()))
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse blueprint JSON: {}", path.display()))
        }
    }
}

/// One declarative step: "run this task, with these inputs, optionally
/// pinned, optionally with explicit children."
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepBlueprint {
    /// The task id to run, `facet:name`
    #[serde(rename = "type")]
    pub task: String,
    /// Display name override; the task's default name otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Pinned steps were synthesized by the engine (or marked by the
    /// author) and keep their position during expansion.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pinned: bool,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub inputs: Map<String, Value>,
    /// Role bindings. The reserved `key` entry names the actor-role this
    /// step concerns; `bind[role]` maps that role to an actor id once known.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub bind: BTreeMap<String, String>,
    /// Explicit children, materialized ahead of any augmented ones.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepBlueprint>,
}

impl StepBlueprint {
    pub fn task(task: &str) -> Self {
        Self {
            task: task.to_string(),
            name: None,
            pinned: false,
            inputs: Map::new(),
            bind: BTreeMap::new(),
            steps: Vec::new(),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn pinned(mut self) -> Self {
        self.pinned = true;
        self
    }

    pub fn input(mut self, key: &str, value: Value) -> Self {
        self.inputs.insert(key.to_string(), value);
        self
    }

    pub fn bind_role(mut self, role: &str) -> Self {
        self.bind.insert("key".to_string(), role.to_string());
        self
    }

    pub fn bind_actor(mut self, role: &str, actor_id: &str) -> Self {
        self.bind
            .entry("key".to_string())
            .or_insert_with(|| role.to_string());
        self.bind.insert(role.to_string(), actor_id.to_string());
        self
    }

    pub fn child(mut self, step: StepBlueprint) -> Self {
        self.steps.push(step);
        self
    }
}
