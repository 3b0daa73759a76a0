//! The ambient run context.
//!
//! One `WhimbrelContext` is threaded through materialization and execution:
//! working directory, actor maps, focus refs, facet registry, filesystem,
//! log sink, and the emission path that collects every mutation and journal
//! entry of the currently executing step. The dry-run sandbox is just a
//! second context value sharing the immutable parts and substituting the
//! filesystem and log.

mod mutator;

pub use mutator::ContextMutator;

use crate::actor::Actor;
use crate::facet::FacetRegistry;
use crate::fs::{DiskFileSystem, FileSystem, MemFileSystem};
use crate::journal::{JournalEntry, Mutation, StepExecutionResult};
use crate::logging::{ApplicationLog, ConsoleLog, NullLog};
use crate::plan::ExecutionStep;
use crate::whimbrel_config::RunOptions;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// The live project model and services for one run.
pub struct WhimbrelContext {
    pub cwd: PathBuf,
    pub options: RunOptions,
    /// Actors under analysis, by id
    pub sources: BTreeMap<String, Actor>,
    /// Actors under mutation, by id
    pub targets: BTreeMap<String, Actor>,
    /// Focus refs: the "current" actor of each role
    pub source: Option<String>,
    pub target: Option<String>,
    pub root_target: Option<String>,
    pub registry: Arc<FacetRegistry>,
    pub fs: Arc<dyn FileSystem>,
    pub log: Arc<dyn ApplicationLog>,
    /// Journal + mutations of the step currently executing
    collector: StepCollector,
}

#[derive(Default)]
struct StepCollector {
    origin: String,
    result: StepExecutionResult,
}

impl WhimbrelContext {
    pub fn new(cwd: PathBuf, registry: Arc<FacetRegistry>) -> Self {
        Self {
            cwd,
            options: RunOptions::default(),
            sources: BTreeMap::new(),
            targets: BTreeMap::new(),
            source: None,
            target: None,
            root_target: None,
            registry,
            fs: Arc::new(DiskFileSystem),
            log: Arc::new(ConsoleLog::new()),
            collector: StepCollector::default(),
        }
    }

    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_log(mut self, log: Arc<dyn ApplicationLog>) -> Self {
        self.log = log;
        self
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Start collecting for a step. Any previous collection is discarded.
    pub fn begin_step(&mut self, origin: &str) {
        self.collector = StepCollector {
            origin: origin.to_string(),
            result: StepExecutionResult::default(),
        };
    }

    /// Take the collected result of the step started by `begin_step`.
    pub fn take_result(&mut self) -> StepExecutionResult {
        std::mem::take(&mut self.collector).result
    }

    /// Id of the step currently collecting.
    pub fn origin(&self) -> &str {
        &self.collector.origin
    }

    /// Record a mutation. All mutations flow through here, which is what
    /// makes trial and real executions comparable.
    pub fn accept_mutation(&mut self, mutation: Mutation) {
        self.collector.result.mutations.push(mutation);
    }

    /// Record a journal entry.
    pub fn accept_journal_entry(&mut self, entry: JournalEntry) {
        self.collector.result.journal.push(entry);
    }

    /// Journal a computed value ("let name = value") for the current step.
    pub fn journal(&mut self, kind: &str, name: &str, value: Value) {
        let origin = self.collector.origin.clone();
        self.accept_journal_entry(JournalEntry::new(&origin, kind, name, value));
    }

    /// Journal a private note, excluded from idempotency comparison.
    pub fn journal_note(&mut self, name: &str) {
        let origin = self.collector.origin.clone();
        self.accept_journal_entry(JournalEntry::new(&origin, "note", name, Value::Null).private());
    }

    /// Look up an actor in either map.
    pub fn actor(&self, id: &str) -> Option<&Actor> {
        self.sources.get(id).or_else(|| self.targets.get(id))
    }

    /// The focus actor of a role (`source` or `target`).
    pub fn focus_actor(&self, role: &str) -> Option<&Actor> {
        let id = match role {
            "source" => self.source.as_deref(),
            "target" => self.target.as_deref(),
            _ => None,
        }?;
        self.actor(id)
    }

    /// Resolve the actor a step concerns: the bind's role→actor entry if
    /// resolved, the role's focus actor otherwise.
    pub fn bound_actor(&self, step: &ExecutionStep) -> Option<&Actor> {
        let role = step.bind.get("key")?;
        if let Some(id) = step.bind.get(role) {
            return self.actor(id);
        }
        self.focus_actor(role)
    }

    /// Open the mutation facade. All structural changes to actors and the
    /// actor maps go through it, never through direct field assignment.
    pub fn mutate(&mut self) -> ContextMutator<'_> {
        ContextMutator::new(self)
    }

    /// Fork an isolated context for a dry run: same logical actor state,
    /// writes captured by an in-memory shadow filesystem, log silenced.
    pub fn fork_for_dry_run(&self) -> WhimbrelContext {
        WhimbrelContext {
            cwd: self.cwd.clone(),
            options: self.options.clone(),
            sources: self.sources.clone(),
            targets: self.targets.clone(),
            source: self.source.clone(),
            target: self.target.clone(),
            root_target: self.root_target.clone(),
            registry: Arc::clone(&self.registry),
            fs: Arc::new(MemFileSystem::shadowing(Arc::clone(&self.fs))),
            log: Arc::new(NullLog),
            collector: StepCollector::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::{MutationKind, MutationOp};
    use serde_json::json;
    use std::path::Path;

    fn test_ctx() -> WhimbrelContext {
        WhimbrelContext::new(PathBuf::from("/tmp/proj"), Arc::new(FacetRegistry::new()))
            .with_fs(Arc::new(MemFileSystem::new()))
            .with_log(Arc::new(NullLog))
    }

    #[test]
    fn collector_scopes_results_to_steps() {
        let mut ctx = test_ctx();
        ctx.begin_step("a");
        ctx.journal("let", "x", json!(1));
        let a = ctx.take_result();
        assert_eq!(a.journal.len(), 1);
        assert_eq!(a.journal[0].origin, "a");

        ctx.begin_step("b");
        let b = ctx.take_result();
        assert!(b.journal.is_empty());
    }

    #[test]
    fn accept_mutation_routes_to_category() {
        let mut ctx = test_ctx();
        ctx.begin_step("s");
        ctx.accept_mutation(Mutation::new(
            MutationKind::Ctx,
            MutationOp::Add,
            "sources",
            json!("p"),
        ));
        let result = ctx.take_result();
        assert_eq!(result.mutations.ctx.len(), 1);
        assert!(result.mutations.fs.is_empty());
    }

    #[test]
    fn fork_shares_actors_but_isolates_fs() {
        let mut ctx = test_ctx();
        ctx.sources.insert("p".into(), Actor::at("/tmp/p"));
        ctx.source = Some("p".into());

        let fork = ctx.fork_for_dry_run();
        assert!(fork.actor("p").is_some());
        assert_eq!(fork.source.as_deref(), Some("p"));

        fork.fs.write(Path::new("/tmp/proj/x"), b"in fork").unwrap();
        assert!(!ctx.fs.exists(Path::new("/tmp/proj/x")));
    }

    #[test]
    fn focus_actor_follows_refs() {
        let mut ctx = test_ctx();
        ctx.targets.insert("t".into(), Actor::at("/tmp/t"));
        ctx.target = Some("t".into());
        assert_eq!(ctx.focus_actor("target").unwrap().id, "t");
        assert!(ctx.focus_actor("source").is_none());
    }
}
