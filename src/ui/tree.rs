//! Step tree rendering.
//!
//! Satisfied steps render dimmed: they were checked and needed nothing.

use super::icons;
use crate::plan::{StepReport, TreeState};
use crate::runner::RunSummary;
use console::style;

/// Render a step forest into terminal lines.
pub fn render_step_tree(steps: &[StepReport]) -> String {
    let mut out = String::new();
    for step in steps {
        render_step(step, 0, &mut out);
    }
    out
}

fn render_step(step: &StepReport, depth: usize, out: &mut String) {
    let pad = "  ".repeat(depth);
    let line = match &step.tree_state {
        TreeState::Default => format!(
            "{pad}{}{} {}",
            icons::PENDING,
            step.name,
            style(format!("({})", step.id)).dim()
        ),
        TreeState::Satisfied { reason } => format!(
            "{pad}{}{}",
            icons::SATISFIED,
            style(format!("{} ({})", step.name, reason)).dim()
        ),
        TreeState::Skipped => format!(
            "{pad}{}{}",
            icons::SKIPPED,
            style(format!("{} (skipped by selector)", step.name)).dim()
        ),
        TreeState::Completed => {
            let mutations = step
                .result
                .as_ref()
                .map(|r| r.mutations.len())
                .unwrap_or(0);
            format!(
                "{pad}{}{} {}",
                icons::CHECK,
                step.name,
                style(format!("({mutations} mutations)")).dim()
            )
        }
        TreeState::Failed { error } => format!(
            "{pad}{}{} {}",
            icons::CROSS,
            step.name,
            style(error).red()
        ),
    };
    out.push_str(&line);
    out.push('\n');
    for child in &step.children {
        render_step(child, depth + 1, out);
    }
}

/// One-line run summary.
pub fn render_summary(summary: &RunSummary) -> String {
    format!(
        "{} executed, {} satisfied, {} skipped",
        style(summary.executed).green(),
        style(summary.satisfied).dim(),
        summary.skipped
    )
}
