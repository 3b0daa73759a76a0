//! Actors and their facet scopes.
//!
//! An `Actor` is a project, package, or submodule under analysis or
//! mutation. Actors are created by define steps and mutated only through
//! `ContextMutator`, which pairs every change with a journaled `Mutation`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// A project, package, or submodule under analysis/mutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Actor {
    /// Unique id within its owning map (`sources` or `targets`)
    pub id: String,
    /// Human-readable name (defaults to the id)
    pub name: String,
    /// Root directory of the project tree
    pub root: PathBuf,
    /// Detected configuration and roles, per facet id
    #[serde(default)]
    pub facets: BTreeMap<String, FacetScope>,
    /// Ids of submodule actors defined under this one
    #[serde(default, rename = "subModules")]
    pub sub_modules: Vec<String>,
    /// Free-form metadata
    #[serde(default)]
    pub meta: Map<String, Value>,
}

impl Actor {
    /// Create an actor rooted at `root`, deriving id and name from the
    /// final path component.
    pub fn at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let id = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "project".to_string());
        Self {
            name: id.clone(),
            id,
            root,
            facets: BTreeMap::new(),
            sub_modules: Vec::new(),
            meta: Map::new(),
        }
    }

    /// The scope detected for `facet_id`, if any.
    pub fn facet(&self, facet_id: &str) -> Option<&FacetScope> {
        self.facets.get(facet_id)
    }

    /// Whether any facet has tagged this actor with `role`.
    pub fn has_role(&self, role: &str) -> bool {
        self.facets.values().any(|s| s.roles.contains(role))
    }
}

/// The detected configuration and role tags of one facet on one actor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FacetScope {
    /// Role tags, e.g. `pkg-manager`, `language`
    #[serde(default)]
    pub roles: BTreeSet<String>,
    /// Opaque per-facet configuration
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl FacetScope {
    pub fn with_role(role: &str) -> Self {
        let mut roles = BTreeSet::new();
        roles.insert(role.to_string());
        Self {
            roles,
            config: Map::new(),
        }
    }

    pub fn config_entry(mut self, key: &str, value: Value) -> Self {
        self.config.insert(key.to_string(), value);
        self
    }

    /// Merge another contribution into this scope. Roles union; config keys
    /// from `other` win only where this scope has no value yet, so two
    /// detectors contributing to the same facet never silently overwrite
    /// each other.
    pub fn merge(&mut self, other: &FacetScope) {
        for role in &other.roles {
            self.roles.insert(role.clone());
        }
        for (key, value) in &other.config {
            self.config
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn actor_at_derives_id_from_path() {
        let actor = Actor::at("/tmp/my-app");
        assert_eq!(actor.id, "my-app");
        assert_eq!(actor.name, "my-app");
        assert_eq!(actor.root, PathBuf::from("/tmp/my-app"));
        assert!(actor.facets.is_empty());
    }

    #[test]
    fn actor_has_role_scans_all_facets() {
        let mut actor = Actor::at("/tmp/p");
        actor
            .facets
            .insert("npm".into(), FacetScope::with_role("pkg-manager"));
        assert!(actor.has_role("pkg-manager"));
        assert!(!actor.has_role("language"));
    }

    #[test]
    fn facet_scope_merge_unions_roles() {
        let mut a = FacetScope::with_role("pkg-manager");
        let b = FacetScope::with_role("workspace-manager");
        a.merge(&b);
        assert!(a.roles.contains("pkg-manager"));
        assert!(a.roles.contains("workspace-manager"));
    }

    #[test]
    fn facet_scope_merge_does_not_overwrite_config() {
        let mut a = FacetScope::default().config_entry("version", json!("8"));
        let b = FacetScope::default()
            .config_entry("version", json!("9"))
            .config_entry("lockfile", json!("pnpm-lock.yaml"));
        a.merge(&b);
        assert_eq!(a.config["version"], json!("8"));
        assert_eq!(a.config["lockfile"], json!("pnpm-lock.yaml"));
    }

    #[test]
    fn actor_serialization_round_trip() {
        let mut actor = Actor::at("/tmp/mono");
        actor.sub_modules.push("mono-api".into());
        let json = serde_json::to_string(&actor).unwrap();
        let parsed: Actor = serde_json::from_str(&json).unwrap();
        assert_eq!(actor, parsed);
        assert!(json.contains("subModules"));
    }
}
