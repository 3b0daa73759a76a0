//! The mutation-emitting facade over the context.
//!
//! Every operation pairs one state change with exactly one emitted
//! `Mutation`, which is the property the idempotency comparator rests on:
//! two executions made identical changes if and only if they emitted
//! identical mutation sequences.

use super::WhimbrelContext;
use crate::actor::{Actor, FacetScope};
use crate::errors::ExecutionError;
use crate::fs::FileSystem;
use crate::journal::{Mutation, MutationOp};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

pub struct ContextMutator<'a> {
    ctx: &'a mut WhimbrelContext,
}

impl<'a> ContextMutator<'a> {
    pub(super) fn new(ctx: &'a mut WhimbrelContext) -> Self {
        Self { ctx }
    }

    fn actor_mut(&mut self, id: &str) -> Result<&mut Actor, ExecutionError> {
        if self.ctx.sources.contains_key(id) {
            return Ok(self.ctx.sources.get_mut(id).expect("key checked"));
        }
        if self.ctx.targets.contains_key(id) {
            return Ok(self.ctx.targets.get_mut(id).expect("key checked"));
        }
        Err(ExecutionError::ActorNotFound { id: id.to_string() })
    }

    /// Register an actor under `sources`. Emits one `add` mutation at path
    /// `sources`.
    pub fn add_source(&mut self, actor: Actor) {
        let payload = json!({"id": actor.id, "root": actor.root});
        self.ctx.sources.insert(actor.id.clone(), actor);
        self.ctx
            .accept_mutation(Mutation::ctx(MutationOp::Add, "sources", payload));
    }

    /// Register an actor under `targets`. Emits one `add` mutation at path
    /// `targets`.
    pub fn add_target(&mut self, actor: Actor) {
        let payload = json!({"id": actor.id, "root": actor.root});
        self.ctx.targets.insert(actor.id.clone(), actor);
        self.ctx
            .accept_mutation(Mutation::ctx(MutationOp::Add, "targets", payload));
    }

    /// Set a scalar actor property. Emits one `set` mutation at
    /// `actor:<id>.<prop>`.
    pub fn set_actor_property(
        &mut self,
        actor_id: &str,
        prop: &str,
        value: Value,
    ) -> Result<(), ExecutionError> {
        {
            let actor = self.actor_mut(actor_id)?;
            match prop {
                "name" => {
                    actor.name = value.as_str().unwrap_or_default().to_string();
                }
                "root" => {
                    actor.root = PathBuf::from(value.as_str().unwrap_or_default());
                }
                _ => {
                    actor.meta.insert(prop.to_string(), value.clone());
                }
            }
        }
        self.ctx.accept_mutation(Mutation::ctx(
            MutationOp::Set,
            format!("actor:{actor_id}.{prop}"),
            value,
        ));
        Ok(())
    }

    /// Append to an actor list property. Emits one `add` mutation at
    /// `actor:<id>.<prop>`.
    pub fn add_actor_element(
        &mut self,
        actor_id: &str,
        prop: &str,
        value: Value,
    ) -> Result<(), ExecutionError> {
        {
            let actor = self.actor_mut(actor_id)?;
            match prop {
                "subModules" => {
                    actor
                        .sub_modules
                        .push(value.as_str().unwrap_or_default().to_string());
                }
                _ => {
                    let list = actor
                        .meta
                        .entry(prop.to_string())
                        .or_insert_with(|| Value::Array(Vec::new()));
                    if let Value::Array(items) = list {
                        items.push(value.clone());
                    }
                }
            }
        }
        self.ctx.accept_mutation(Mutation::ctx(
            MutationOp::Add,
            format!("actor:{actor_id}.{prop}"),
            value,
        ));
        Ok(())
    }

    /// Merge a facet scope into an actor (roles union, config keys never
    /// silently overwritten). Emits one `set` mutation at
    /// `actor:<id>.facets.<facet>` carrying the merged scope. A merge that
    /// changes nothing is no state change and emits nothing. Returns
    /// whether the scope changed.
    pub fn set_actor_facet(
        &mut self,
        actor_id: &str,
        facet_id: &str,
        scope: &FacetScope,
    ) -> Result<bool, ExecutionError> {
        let merged = {
            let actor = self.actor_mut(actor_id)?;
            let entry = actor.facets.entry(facet_id.to_string()).or_default();
            let before = entry.clone();
            entry.merge(scope);
            if *entry == before {
                return Ok(false);
            }
            serde_json::to_value(&*entry).unwrap_or(Value::Null)
        };
        self.ctx.accept_mutation(Mutation::ctx(
            MutationOp::Set,
            format!("actor:{actor_id}.facets.{facet_id}"),
            merged,
        ));
        Ok(true)
    }

    /// Write a file through the context filesystem. Emits one `create` or
    /// `modify` fs mutation whose payload digests the new content, so the
    /// comparator sees a no-op when the content already matches.
    pub fn write_file(&mut self, path: &Path, contents: &[u8]) -> Result<(), ExecutionError> {
        let existing = if self.ctx.fs.exists(path) {
            Some(self.ctx.fs.read(path)?)
        } else {
            None
        };
        let op = match &existing {
            Some(current) if current == contents => {
                // Content already in place: no write, no mutation.
                return Ok(());
            }
            Some(_) => MutationOp::Modify,
            None => MutationOp::Create,
        };
        self.ctx.fs.write(path, contents)?;
        self.ctx.accept_mutation(Mutation::fs(
            op,
            path.display().to_string(),
            json!({"digest": digest(contents)}),
        ));
        Ok(())
    }

    pub fn write_json_file(&mut self, path: &Path, value: &Value) -> Result<(), ExecutionError> {
        let text = serde_json::to_string_pretty(value).map_err(|e| crate::errors::FsError::Json {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.write_file(path, text.as_bytes())
    }

    /// Delete a file. Emits one `delete` fs mutation; deleting an absent
    /// file is a no-op (and emits nothing).
    pub fn delete_file(&mut self, path: &Path) -> Result<(), ExecutionError> {
        if !self.ctx.fs.exists(path) {
            return Ok(());
        }
        self.ctx.fs.delete(path)?;
        self.ctx.accept_mutation(Mutation::fs(
            MutationOp::Delete,
            path.display().to_string(),
            Value::Null,
        ));
        Ok(())
    }

    /// Create a directory. Emits one `create` fs mutation unless it already
    /// exists.
    pub fn mkdir(&mut self, path: &Path) -> Result<(), ExecutionError> {
        if self.ctx.fs.exists(path) {
            return Ok(());
        }
        self.ctx.fs.mkdir(path)?;
        self.ctx.accept_mutation(Mutation::fs(
            MutationOp::Create,
            path.display().to_string(),
            Value::Null,
        ));
        Ok(())
    }

    /// Record a VCS side effect performed by a facet task. The payload must
    /// carry the VCS kind under `"vcs"` so the comparator can dispatch to a
    /// kind-specific equality hook.
    pub fn record_vcs(&mut self, kind: &str, op: MutationOp, path: &str, mut payload: Value) {
        if let Value::Object(map) = &mut payload {
            map.entry("vcs".to_string())
                .or_insert_with(|| Value::String(kind.to_string()));
        }
        self.ctx.accept_mutation(Mutation::vcs(op, path, payload));
    }
}

fn digest(contents: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(contents);
    format!("sha256:{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facet::FacetRegistry;
    use crate::fs::MemFileSystem;
    use crate::logging::NullLog;
    use std::sync::Arc;

    fn test_ctx() -> WhimbrelContext {
        WhimbrelContext::new(PathBuf::from("/tmp/proj"), Arc::new(FacetRegistry::new()))
            .with_fs(Arc::new(MemFileSystem::new()))
            .with_log(Arc::new(NullLog))
    }

    #[test]
    fn add_source_emits_exactly_one_mutation() {
        let mut ctx = test_ctx();
        ctx.begin_step("source:define");
        ctx.mutate().add_source(Actor::at("/tmp/p"));

        let result = ctx.take_result();
        assert_eq!(result.mutations.ctx.len(), 1);
        let m = &result.mutations.ctx[0];
        assert_eq!(m.op, MutationOp::Add);
        assert_eq!(m.path, "sources");
        assert!(ctx.sources.contains_key("p"));
    }

    #[test]
    fn set_actor_property_path_encodes_actor_and_prop() {
        let mut ctx = test_ctx();
        ctx.begin_step("s");
        ctx.mutate().add_source(Actor::at("/tmp/p"));
        ctx.mutate()
            .set_actor_property("p", "name", json!("renamed"))
            .unwrap();

        let result = ctx.take_result();
        assert_eq!(result.mutations.ctx.len(), 2);
        assert_eq!(result.mutations.ctx[1].path, "actor:p.name");
        assert_eq!(ctx.sources["p"].name, "renamed");
    }

    #[test]
    fn add_actor_element_appends_submodule() {
        let mut ctx = test_ctx();
        ctx.begin_step("s");
        ctx.mutate().add_source(Actor::at("/tmp/mono"));
        ctx.mutate()
            .add_actor_element("mono", "subModules", json!("mono-api"))
            .unwrap();

        assert_eq!(ctx.sources["mono"].sub_modules, vec!["mono-api"]);
        let result = ctx.take_result();
        assert_eq!(result.mutations.ctx[1].path, "actor:mono.subModules");
        assert_eq!(result.mutations.ctx[1].op, MutationOp::Add);
    }

    #[test]
    fn mutating_unknown_actor_fails() {
        let mut ctx = test_ctx();
        ctx.begin_step("s");
        let err = ctx
            .mutate()
            .set_actor_property("ghost", "name", json!("x"))
            .unwrap_err();
        assert!(matches!(err, ExecutionError::ActorNotFound { .. }));
    }

    #[test]
    fn set_actor_facet_merges_rather_than_overwrites() {
        let mut ctx = test_ctx();
        ctx.begin_step("s");
        ctx.mutate().add_source(Actor::at("/tmp/p"));
        ctx.mutate()
            .set_actor_facet("p", "npm", &FacetScope::with_role("pkg-manager"))
            .unwrap();
        ctx.mutate()
            .set_actor_facet("p", "npm", &FacetScope::with_role("workspace-manager"))
            .unwrap();

        let scope = ctx.sources["p"].facet("npm").unwrap();
        assert!(scope.roles.contains("pkg-manager"));
        assert!(scope.roles.contains("workspace-manager"));
    }

    #[test]
    fn write_file_distinguishes_create_and_modify() {
        let mut ctx = test_ctx();
        ctx.begin_step("s");
        let path = Path::new("/tmp/proj/package.json");

        ctx.mutate().write_file(path, b"{}").unwrap();
        ctx.mutate().write_file(path, b"{\"name\":\"p\"}").unwrap();

        let result = ctx.take_result();
        assert_eq!(result.mutations.fs.len(), 2);
        assert_eq!(result.mutations.fs[0].op, MutationOp::Create);
        assert_eq!(result.mutations.fs[1].op, MutationOp::Modify);
    }

    #[test]
    fn write_file_with_identical_content_emits_nothing() {
        let mut ctx = test_ctx();
        ctx.begin_step("s");
        let path = Path::new("/tmp/proj/.npmrc");
        ctx.mutate().write_file(path, b"registry=x").unwrap();
        ctx.take_result();

        ctx.begin_step("s2");
        ctx.mutate().write_file(path, b"registry=x").unwrap();
        let result = ctx.take_result();
        assert!(result.mutations.is_empty());
    }

    #[test]
    fn record_vcs_injects_kind_into_payload() {
        let mut ctx = test_ctx();
        ctx.begin_step("s");
        ctx.mutate()
            .record_vcs("git", MutationOp::Add, "p", json!({"file": "a.txt"}));

        let result = ctx.take_result();
        assert_eq!(result.mutations.vcs.len(), 1);
        assert_eq!(result.mutations.vcs[0].payload["vcs"], "git");
    }
}
