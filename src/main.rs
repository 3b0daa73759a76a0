use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(name = "whimbrel")]
#[command(version, about = "Declarative, idempotent task execution for project trees")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project directory to operate on (defaults to the current directory)
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Materialize a blueprint and execute it
    Run {
        /// Blueprint file (JSON or YAML)
        blueprint: PathBuf,

        /// Dry-run every step and report what would change, touching nothing
        #[arg(long)]
        dry_run: bool,

        /// Only execute steps matching this id selector (e.g. `source:*`)
        #[arg(long)]
        only: Option<String>,

        /// Skip the write-mode confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Materialize a blueprint and print the step tree without executing
    Plan {
        /// Blueprint file (JSON or YAML)
        blueprint: PathBuf,
    },
    /// List registered facets and their tasks
    Facets,
    /// List recorded run reports
    Runs,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let project_dir = cli
        .project_dir
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let config_level = whimbrel::whimbrel_config::WhimbrelConfig::load(&project_dir)
        .ok()
        .and_then(|c| c.run.log_level);
    let default_filter = if cli.verbose {
        "debug".to_string()
    } else {
        config_level.unwrap_or_else(|| "warn".to_string())
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter)),
        )
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Run {
            blueprint,
            dry_run,
            only,
            yes,
        } => {
            cmd::cmd_run(cmd::run::RunArgs {
                project_dir,
                blueprint,
                dry_run,
                only,
                yes,
                verbose: cli.verbose,
            })
            .await
        }
        Commands::Plan { blueprint } => cmd::cmd_plan(project_dir, blueprint).await,
        Commands::Facets => cmd::cmd_facets(),
        Commands::Runs => cmd::cmd_runs(project_dir),
    };

    if let Err(e) = result {
        eprintln!("{} {e:#}", console::style("Error:").red().bold());
        std::process::exit(1);
    }
}
