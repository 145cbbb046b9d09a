use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, error};

use dailytopics_runner::config;
use dailytopics_runner::runner::{JobRunner, Trigger};
use dailytopics_runner::schedule::Schedule;
use dailytopics_runner::subprocess::SubprocessManager;

/// Scheduled job runner for the dailytopics news pipeline
#[derive(Parser)]
#[command(name = "dailytopics-runner")]
#[command(about = "Provision, collect news, model topics, commit the data", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to the job file (default: ./dailytopics.yml, falling back
    /// to the built-in pipeline definition)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline once, immediately (manual dispatch)
    Run {
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run on the configured cron schedule until interrupted
    Start,
    /// Print the next scheduled fire times
    ShowSchedule {
        /// Number of fire times to print
        #[arg(short = 'n', long, default_value = "5")]
        count: usize,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(cli.verbose >= 2)
        .init();

    debug!("dailytopics-runner started with verbosity {}", cli.verbose);

    if let Err(e) = run(cli).await {
        error!("fatal error: {}", e);
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = config::load(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Run { json } => {
            let runner = JobRunner::new(config, SubprocessManager::production());
            let report = runner.run_once(Trigger::Manual).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for step in &report.steps {
                    println!("step {:<16} ok ({:?})", step.name, step.duration);
                }
                match &report.commit {
                    dailytopics_runner::commit::CommitOutcome::Clean => {
                        println!("no data changes to commit");
                    }
                    dailytopics_runner::commit::CommitOutcome::Committed { message } => {
                        println!("committed: {message}");
                    }
                }
            }
            Ok(())
        }
        Commands::Start => {
            let runner = JobRunner::new(config, SubprocessManager::production());
            runner.run_scheduled().await?;
            Ok(())
        }
        Commands::ShowSchedule { count } => {
            let schedule = Schedule::parse(&config.schedule)?;
            println!("schedule: {}", schedule.expression());
            for fire in schedule.upcoming(count) {
                println!("  {}", fire.format("%Y-%m-%d %H:%M:%S UTC"));
            }
            Ok(())
        }
    }
}
