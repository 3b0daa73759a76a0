//! The `run` command: materialize a blueprint and execute it.

use anyhow::{Context, Result};
use console::style;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use whimbrel::audit::{RunRecord, RunReporter};
use whimbrel::blueprint::Blueprint;
use whimbrel::context::WhimbrelContext;
use whimbrel::facets::builtin_registry;
use whimbrel::logging::{ApplicationLog, ConsoleLog};
use whimbrel::plan::materialize_plan;
use whimbrel::runner::{Runner, RunnerOptions};
use whimbrel::ui::{icons, render_step_tree, render_summary};
use whimbrel::whimbrel_config::{RunOptions, WhimbrelConfig};

pub struct RunArgs {
    pub project_dir: PathBuf,
    pub blueprint: PathBuf,
    pub dry_run: bool,
    pub only: Option<String>,
    pub yes: bool,
    pub verbose: bool,
}

pub async fn cmd_run(args: RunArgs) -> Result<()> {
    let config = WhimbrelConfig::load(&args.project_dir)?;
    let blueprint = Blueprint::load(&args.blueprint)?;

    let options = RunOptions {
        yes: args.yes || config.run.yes,
        dry_run: args.dry_run,
        verbose: args.verbose,
    };
    let mut ctx = WhimbrelContext::new(args.project_dir.clone(), Arc::new(builtin_registry()))
        .with_log(Arc::new(ConsoleLog::new()))
        .with_options(options);

    ctx.log.banner(&format!(
        "whimbrel run: {}",
        config
            .project
            .name
            .clone()
            .unwrap_or_else(|| args.blueprint.display().to_string())
    ));

    let mut plan = materialize_plan(&ctx, &blueprint).await?;
    println!(
        "{}{} steps, fs mode '{}'",
        icons::PLAN,
        plan.step_count(),
        plan.fs_mode
    );

    if plan.fs_mode.writes() && !args.dry_run && !ctx.options.yes {
        confirm_write_mode(&args.blueprint)?;
    }

    let report_dir = config.report_dir(&args.project_dir);
    let mut reporter = RunReporter::new(&report_dir);
    reporter.start_run(RunRecord::new(
        &args.blueprint.display().to_string(),
        &plan.fs_mode.to_string(),
        args.dry_run,
    ))?;

    let runner = Runner::with_options(RunnerOptions {
        dry_run: args.dry_run,
        only: args.only.clone(),
    });
    let outcome = runner.run(&mut ctx, &mut plan).await;

    if let Some(record) = reporter.current_run_mut() {
        record.finish(
            plan.report(),
            outcome.as_ref().err().map(|e| e.to_string()),
        );
    }
    let run_file = reporter.finish_run()?;

    println!();
    print!("{}", render_step_tree(&plan.report()));
    println!();

    match outcome {
        Ok(summary) => {
            println!("{}{}", icons::REPORT, render_summary(&summary));
            println!(
                "{}",
                style(format!("Run record: {}", run_file.display())).dim()
            );
            Ok(())
        }
        Err(e) => Err(e).context("Run aborted"),
    }
}

/// List recorded run reports, oldest first.
pub fn cmd_runs(project_dir: PathBuf) -> Result<()> {
    let config = WhimbrelConfig::load(&project_dir)?;
    let reporter = RunReporter::new(&config.report_dir(&project_dir));
    let runs = reporter.list_runs()?;
    if runs.is_empty() {
        println!("No recorded runs.");
        return Ok(());
    }
    for path in runs {
        println!("{}", path.display());
    }
    Ok(())
}

fn confirm_write_mode(blueprint: &Path) -> Result<()> {
    let proceed = dialoguer::Confirm::new()
        .with_prompt(format!(
            "Plan '{}' will write to disk. Continue?",
            blueprint.display()
        ))
        .default(false)
        .interact()
        .context("Failed to read confirmation")?;
    if !proceed {
        anyhow::bail!("Aborted by user");
    }
    Ok(())
}
