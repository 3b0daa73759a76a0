//! The runner: drives a materialized plan against the live context.
//!
//! For each step, depth-first: resolve parameters, execute the task's dry
//! variant inside an isolated sandbox context, compare the trial result
//! against the step's expected baseline, and only execute for real when
//! they diverge. Children are evaluated independently of their parent's
//! outcome. Forward-only: a failure aborts the run and nothing already
//! applied is rolled back.

mod compare;

pub use compare::{ComparatorRegistry, VcsEquality, normalize_value, results_match};

use crate::context::WhimbrelContext;
use crate::errors::ExecutionError;
use crate::logging::ApplicationLog;
use crate::params::ensure_step_parameters;
use crate::plan::{ExecutionPlan, ExecutionStep, TreeState, matches_step_id_selector};
use crate::task::TaskHandler;
use futures::future::BoxFuture;

/// Options shaping one runner pass.
#[derive(Debug, Clone, Default)]
pub struct RunnerOptions {
    /// Trial-only mode: dry-run every step and record what it would do,
    /// but never execute for real.
    pub dry_run: bool,
    /// Restrict execution to steps matching this id selector; others are
    /// marked skipped (their children are still considered).
    pub only: Option<String>,
}

/// Tallies of one runner pass, per terminal tree state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub executed: usize,
    pub satisfied: usize,
    pub skipped: usize,
    pub containers: usize,
}

pub struct Runner {
    options: RunnerOptions,
    comparators: ComparatorRegistry,
}

impl Runner {
    pub fn new() -> Self {
        Self {
            options: RunnerOptions::default(),
            comparators: ComparatorRegistry::new(),
        }
    }

    pub fn with_options(options: RunnerOptions) -> Self {
        Self {
            options,
            comparators: ComparatorRegistry::new(),
        }
    }

    /// Install a per-kind VCS equality hook for the comparator.
    pub fn register_vcs_equality(&mut self, hook: std::sync::Arc<dyn VcsEquality>) {
        self.comparators.register_vcs(hook);
    }

    /// Run the plan to completion, or to the first failing step.
    pub async fn run(
        &self,
        ctx: &mut WhimbrelContext,
        plan: &mut ExecutionPlan,
    ) -> Result<RunSummary, ExecutionError> {
        let outcome: Result<(), ExecutionError> = async {
            for step in &mut plan.steps {
                self.run_step(ctx, step).await?;
            }
            Ok(())
        }
        .await;
        ctx.log.clear_status();
        outcome?;

        let mut summary = RunSummary::default();
        fn tally(steps: &[ExecutionStep], summary: &mut RunSummary) {
            for step in steps {
                match &step.tree_state {
                    TreeState::Completed => summary.executed += 1,
                    TreeState::Satisfied { .. } => summary.satisfied += 1,
                    TreeState::Skipped => summary.skipped += 1,
                    TreeState::Default if step.task.handler.is_none() => summary.containers += 1,
                    _ => {}
                }
                tally(&step.children, summary);
            }
        }
        tally(&plan.steps, &mut summary);
        Ok(summary)
    }

    fn run_step<'a>(
        &'a self,
        ctx: &'a mut WhimbrelContext,
        step: &'a mut ExecutionStep,
    ) -> BoxFuture<'a, Result<(), ExecutionError>> {
        Box::pin(async move {
            if let Some(selector) = &self.options.only {
                if !matches_step_id_selector(selector, &step.id) {
                    step.tree_state = TreeState::Skipped;
                    for child in &mut step.children {
                        self.run_step(&mut *ctx, child).await?;
                    }
                    return Ok(());
                }
            }

            if let Some(handler) = step.task.handler.clone() {
                ensure_step_parameters(ctx, step)?;
                ctx.log.set_status(&format!("checking {}", step.name));

                // Trial execution against the sandbox. The sandbox shares
                // the logical actor state but its filesystem and log are
                // disposable; nothing leaks back on the satisfied path.
                let mut sandbox = ctx.fork_for_dry_run();
                sandbox.begin_step(&step.id);
                if let Err(e) = handler.dry_execute(&mut sandbox, step).await {
                    step.tree_state = TreeState::Failed {
                        error: e.to_string(),
                    };
                    return Err(e);
                }
                let trial = sandbox.take_result();

                if results_match(&trial, &step.expected_result, &self.comparators) {
                    step.tree_state = TreeState::Satisfied {
                        reason: "dry run produced no effective change".to_string(),
                    };
                    ctx.log.debug(&format!("step {} already satisfied", step.id));
                } else if self.options.dry_run {
                    // Report what would happen; leave real state alone.
                    step.result = Some(trial);
                } else {
                    ctx.log.set_status(&format!("running {}", step.name));
                    ctx.begin_step(&step.id);
                    match handler.execute(ctx, step).await {
                        Ok(()) => {
                            step.result = Some(ctx.take_result());
                            step.tree_state = TreeState::Completed;
                        }
                        Err(e) => {
                            // Keep the partial journal for the error report.
                            step.result = Some(ctx.take_result());
                            step.tree_state = TreeState::Failed {
                                error: e.to_string(),
                            };
                            return Err(e);
                        }
                    }
                }
            }

            // Children are evaluated independently of this step's outcome.
            if !step.children.is_empty() {
                ctx.log.indent();
                for child in &mut step.children {
                    if let Err(e) = self.run_step(&mut *ctx, child).await {
                        ctx.log.dedent();
                        return Err(e);
                    }
                }
                ctx.log.dedent();
            }
            Ok(())
        })
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}
