//! The `plan` command: materialize and print without executing.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use whimbrel::blueprint::Blueprint;
use whimbrel::context::WhimbrelContext;
use whimbrel::facets::builtin_registry;
use whimbrel::logging::ConsoleLog;
use whimbrel::plan::materialize_plan;
use whimbrel::ui::{icons, render_step_tree};

pub async fn cmd_plan(project_dir: PathBuf, blueprint: PathBuf) -> Result<()> {
    let blueprint = Blueprint::load(&blueprint)?;
    let ctx = WhimbrelContext::new(project_dir, Arc::new(builtin_registry()))
        .with_log(Arc::new(ConsoleLog::new()));

    let plan = materialize_plan(&ctx, &blueprint).await?;

    println!(
        "{}{} steps, fs mode '{}'",
        icons::PLAN,
        plan.step_count(),
        plan.fs_mode
    );
    println!();
    print!("{}", render_step_tree(&plan.report()));
    Ok(())
}
