use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error};

use skylift::orchestrator::{DeployRequest, DeploymentStatus, Orchestrator, StepStatus};

/// Turn a free-text deployment request into running cloud infrastructure
#[derive(Parser)]
#[command(name = "skylift")]
#[command(about = "Deploy a repository to the cloud from a plain-language request", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Working directory for per-deployment provisioning workspaces
    #[arg(long, global = true)]
    workdir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a repository from a plain-language description
    Deploy {
        /// What to deploy, in plain language (e.g. "deploy my flask api on aws")
        description: String,

        /// Repository to deploy (local path or URL)
        #[arg(short, long)]
        repo: String,

        /// Return the deployment id immediately instead of waiting
        #[arg(long)]
        no_wait: bool,
    },
    /// Show the current status of a deployment
    Status {
        /// Deployment id
        id: String,
    },
    /// Show the step-by-step progress of a deployment
    Steps {
        /// Deployment id
        id: String,
    },
    /// Show captured provisioning logs for a deployment
    Logs {
        /// Deployment id
        id: String,
    },
    /// Show manual replication instructions for a deployment
    Instructions {
        /// Deployment id
        id: String,
    },
    /// List all known deployments
    List,
    /// Tear down a deployment's infrastructure and forget it
    Destroy {
        /// Deployment id
        id: String,
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

    let root = cli.workdir.clone().unwrap_or_else(default_workdir);
    debug!("using provisioning workdir {}", root.display());
    let orchestrator = Orchestrator::production(root);

    let result = match cli.command {
        Commands::Deploy {
            description,
            repo,
            no_wait,
        } => run_deploy(&orchestrator, description, repo, no_wait).await,
        Commands::Status { id } => run_status(&orchestrator, &id).await,
        Commands::Steps { id } => run_steps(&orchestrator, &id).await,
        Commands::Logs { id } => run_logs(&orchestrator, &id).await,
        Commands::Instructions { id } => run_instructions(&orchestrator, &id).await,
        Commands::List => run_list(&orchestrator).await,
        Commands::Destroy { id } => run_destroy(&orchestrator, &id).await,
    };

    if let Err(e) = result {
        error!("Fatal error: {}", e);
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn default_workdir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("skylift")
        .join("deployments")
}

async fn run_deploy(
    orchestrator: &Orchestrator,
    description: String,
    repo: String,
    no_wait: bool,
) -> anyhow::Result<()> {
    let id = orchestrator
        .submit(DeployRequest {
            description,
            repository_url: repo,
        })
        .await?;
    println!("🚀 Deployment accepted: {id}");

    if no_wait {
        println!("Track it with: skylift status {id}");
        return Ok(());
    }

    let mut last_status = None;
    loop {
        let record = orchestrator.status(&id).await?;
        if last_status != Some(record.status) {
            println!("  [{:>3}%] {}", record.progress(), record.status);
            last_status = Some(record.status);
        }
        if record.status.is_terminal() {
            if record.status.is_success() {
                if let Some(url) = &record.public_url {
                    println!("✅ Deployed: {url}");
                }
            } else {
                anyhow::bail!(
                    "deployment failed: {}",
                    record.error.as_deref().unwrap_or("unknown error")
                );
            }
            return Ok(());
        }
        tokio::time::sleep(Duration::from_secs(2)).await;
    }
}

async fn run_status(orchestrator: &Orchestrator, id: &str) -> anyhow::Result<()> {
    let record = orchestrator.status(id).await?;
    println!("Deployment {id}");
    println!("  status:   {} ({}%)", record.status, record.progress());
    println!("  created:  {}", record.created_at.to_rfc3339());
    if let Some(url) = &record.public_url {
        println!("  url:      {url}");
    }
    if let Some(strategy) = &record.strategy {
        println!("  strategy: {}", strategy.kind);
    }
    if let Some(error) = &record.error {
        println!("  error:    {error}");
    }
    Ok(())
}

async fn run_steps(orchestrator: &Orchestrator, id: &str) -> anyhow::Result<()> {
    let steps = orchestrator.steps(id).await?;
    for step in steps {
        let marker = match step.status {
            StepStatus::Pending => " ",
            StepStatus::Running => "…",
            StepStatus::Completed => "✓",
            StepStatus::Failed => "✗",
        };
        println!("[{marker}] {}. {} - {}", step.id, step.title, step.description);
        for detail in &step.details {
            println!("       {detail}");
        }
    }
    Ok(())
}

async fn run_logs(orchestrator: &Orchestrator, id: &str) -> anyhow::Result<()> {
    let logs = orchestrator.logs(id).await?;
    if logs.is_empty() {
        println!("No provisioning logs captured for {id}.");
        return Ok(());
    }
    for block in logs {
        println!("=== {} ===", block.source);
        for line in &block.lines {
            println!("{line}");
        }
    }
    Ok(())
}

async fn run_instructions(orchestrator: &Orchestrator, id: &str) -> anyhow::Result<()> {
    let instructions = orchestrator.instructions(id).await?;
    if instructions.is_empty() {
        println!("No instructions recorded for {id} yet.");
        return Ok(());
    }
    println!("To replicate deployment {id} by hand:");
    for line in instructions {
        println!("  {line}");
    }
    Ok(())
}

async fn run_list(orchestrator: &Orchestrator) -> anyhow::Result<()> {
    let records = orchestrator.list().await;
    if records.is_empty() {
        println!("No deployments in this session.");
        return Ok(());
    }
    for record in records {
        let url = record.public_url.as_deref().unwrap_or("-");
        println!(
            "{}  {:<12} {:>3}%  {}",
            record.id,
            record.status.to_string(),
            record.progress(),
            url
        );
    }
    Ok(())
}

async fn run_destroy(orchestrator: &Orchestrator, id: &str) -> anyhow::Result<()> {
    // Each invocation starts with an empty in-process record table, so pull
    // the record in from disk first when it exists.
    let record = orchestrator.status(id).await?;
    if record.status == DeploymentStatus::Unknown {
        println!("⚠️  {id} reconciled with unknown state; attempting destroy anyway.");
    }
    orchestrator.destroy(id).await?;
    println!("🗑️  Deployment {id} destroyed.");
    Ok(())
}
