//! Facet modules and the task registry.
//!
//! A facet is a pluggable capability unit (e.g. "npm", "git") contributing
//! tasks, detection, and queries for one technology. The engine core
//! consumes `tasks` and `task_augmentations`; `detector` and `query_index`
//! are capability hooks invoked by analysis tasks and callers.

use crate::actor::{Actor, FacetScope};
use crate::blueprint::StepBlueprint;
use crate::context::WhimbrelContext;
use crate::errors::{ExecutionError, MaterializeError};
use crate::plan::ExecutionStep;
use crate::task::Task;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Outcome of a facet's detection pass over an actor root.
#[derive(Debug, Clone, Default)]
pub struct DetectionResult {
    pub detected: bool,
    pub scope: FacetScope,
}

impl DetectionResult {
    pub fn found(scope: FacetScope) -> Self {
        Self {
            detected: true,
            scope,
        }
    }

    pub fn not_found() -> Self {
        Self::default()
    }
}

/// Detection hook: inspect a directory and report whether (and how) this
/// facet applies there.
#[async_trait]
pub trait FacetDetector: Send + Sync {
    async fn detect(
        &self,
        ctx: &WhimbrelContext,
        dir: &Path,
    ) -> Result<DetectionResult, ExecutionError>;
}

/// Read-only query hook over an analyzed actor.
pub trait FacetQuery: Send + Sync {
    fn query(
        &self,
        ctx: &WhimbrelContext,
        actor: &Actor,
        params: &Value,
    ) -> Result<Value, ExecutionError>;
}

/// Async predicate gating an augmentation. A falsy result skips the
/// augmentation entirely.
#[async_trait]
pub trait AugmentationCondition: Send + Sync {
    async fn evaluate(
        &self,
        ctx: &WhimbrelContext,
        step: &ExecutionStep,
        actor: Option<&Actor>,
    ) -> Result<bool, MaterializeError>;
}

/// Async producer of augmentation steps, for augmentations that depend on
/// runtime facts about the materializing step's actor.
#[async_trait]
pub trait AugmentationGenerator: Send + Sync {
    async fn generate(
        &self,
        ctx: &WhimbrelContext,
        step: &ExecutionStep,
        actor: Option<&Actor>,
    ) -> Result<Vec<StepBlueprint>, MaterializeError>;
}

/// The two shapes an augmentation's step source can take.
pub enum AugmentationSteps {
    Static(Vec<StepBlueprint>),
    Generator(Arc<dyn AugmentationGenerator>),
}

/// A facet-declared rule: "when task X materializes, also run these
/// additional steps."
pub struct TaskAugmentation {
    pub condition: Option<Arc<dyn AugmentationCondition>>,
    pub steps: AugmentationSteps,
}

impl TaskAugmentation {
    pub fn of_steps(steps: Vec<StepBlueprint>) -> Self {
        Self {
            condition: None,
            steps: AugmentationSteps::Static(steps),
        }
    }

    pub fn generated(generator: Arc<dyn AugmentationGenerator>) -> Self {
        Self {
            condition: None,
            steps: AugmentationSteps::Generator(generator),
        }
    }

    pub fn when(mut self, condition: Arc<dyn AugmentationCondition>) -> Self {
        self.condition = Some(condition);
        self
    }
}

/// One registered facet: tasks, augmentations, and capability hooks.
pub struct FacetModule {
    pub id: String,
    /// Task name (the half after the colon) → definition
    pub tasks: BTreeMap<String, Arc<Task>>,
    /// Augmented task id (full `facet:name`) → augmentations, in
    /// declaration order
    pub task_augmentations: BTreeMap<String, Vec<TaskAugmentation>>,
    pub detector: Option<Arc<dyn FacetDetector>>,
    pub query_index: BTreeMap<String, Arc<dyn FacetQuery>>,
}

impl FacetModule {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            tasks: BTreeMap::new(),
            task_augmentations: BTreeMap::new(),
            detector: None,
            query_index: BTreeMap::new(),
        }
    }

    /// Register a task. The task's id must be namespaced under this facet.
    pub fn task(mut self, task: Task) -> Self {
        debug_assert_eq!(task.facet_id(), self.id);
        let name = task
            .id
            .split_once(':')
            .map(|(_, name)| name.to_string())
            .unwrap_or_else(|| task.id.clone());
        self.tasks.insert(name, Arc::new(task));
        self
    }

    /// Register an augmentation against `task_id` (any facet's task).
    pub fn augment(mut self, task_id: &str, augmentation: TaskAugmentation) -> Self {
        self.task_augmentations
            .entry(task_id.to_string())
            .or_default()
            .push(augmentation);
        self
    }

    pub fn detector(mut self, detector: Arc<dyn FacetDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn query(mut self, query_type: &str, handler: Arc<dyn FacetQuery>) -> Self {
        self.query_index.insert(query_type.to_string(), handler);
        self
    }
}

/// Registry of all facets, in registration order. Registration order is
/// load-bearing: augmentations apply in it.
#[derive(Default)]
pub struct FacetRegistry {
    facets: Vec<Arc<FacetModule>>,
    index: BTreeMap<String, usize>,
}

impl FacetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, module: FacetModule) {
        let id = module.id.clone();
        if let Some(&slot) = self.index.get(&id) {
            self.facets[slot] = Arc::new(module);
            return;
        }
        self.index.insert(id, self.facets.len());
        self.facets.push(Arc::new(module));
    }

    pub fn facet(&self, id: &str) -> Option<&Arc<FacetModule>> {
        self.index.get(id).map(|&slot| &self.facets[slot])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<FacetModule>> {
        self.facets.iter()
    }

    /// Resolve a namespaced task id to its definition.
    pub fn lookup_task(&self, task_id: &str) -> Result<Arc<Task>, MaterializeError> {
        let (facet_id, task_name) =
            task_id
                .split_once(':')
                .ok_or_else(|| MaterializeError::InvalidTaskId {
                    id: task_id.to_string(),
                })?;
        let facet = self
            .facet(facet_id)
            .ok_or_else(|| MaterializeError::UnknownFacet {
                facet: facet_id.to_string(),
                task_id: task_id.to_string(),
            })?;
        facet
            .tasks
            .get(task_name)
            .cloned()
            .ok_or_else(|| MaterializeError::UnknownTask {
                facet: facet_id.to_string(),
                task: task_name.to_string(),
            })
    }

    /// All augmentations registered against `task_id`, across facets, in
    /// facet-registration order.
    pub fn augmentations_for(&self, task_id: &str) -> Vec<(&str, &TaskAugmentation)> {
        self.facets
            .iter()
            .flat_map(|facet| {
                facet
                    .task_augmentations
                    .get(task_id)
                    .into_iter()
                    .flatten()
                    .map(|aug| (facet.id.as_str(), aug))
            })
            .collect()
    }
}
