//! stackctl - operator CLI for the pointstack e2e test environment.
//!
//! Brings the full test environment up for local debugging (ephemeral
//! databases, backend services, readiness), and checks service health
//! outside a test run.

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use pointstack_harness::{HarnessConfig, ServiceSupervisor, SuiteContext, SupervisorConfig};

#[derive(Parser)]
#[command(name = "stackctl", about = "Pointstack e2e environment control")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision databases and start services, then hold until Ctrl-C.
    ///
    /// Ephemeral databases live only as long as this process, so `up`
    /// is a session: teardown runs when it exits.
    Up,

    /// Probe every health target once and report per-target status.
    Check {
        /// Emit machine-readable JSON instead of the table.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = HarnessConfig::from_env();

    match cli.command {
        Commands::Up => up(config).await,
        Commands::Check { json } => check(config, json).await,
    }
}

async fn up(config: HarnessConfig) -> Result<()> {
    let mut ctx = SuiteContext::new(config);

    if let Err(e) = ctx.setup().await {
        eprintln!("{} {}", "Setup failed:".red().bold(), e);
        std::process::exit(1);
    }

    println!("{}", "Test environment ready".green().bold());
    println!("Database coordinates:");
    for db in ctx.databases() {
        println!(
            "  {:<14} {}",
            db.descriptor.name,
            db.connection_url(&ctx.config().db_user)
        );
    }
    println!("\nPress Ctrl-C to tear down.");

    tokio::signal::ctrl_c().await?;

    ctx.teardown().await;
    println!("{}", "Test environment stopped".green());
    Ok(())
}

async fn check(config: HarnessConfig, json: bool) -> Result<()> {
    let supervisor = ServiceSupervisor::new(SupervisorConfig::from_harness(&config));
    let statuses = supervisor.check_all().await;
    let all_ready = statuses.iter().all(|s| s.ready);

    if json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
    } else {
        for status in &statuses {
            let marker = if status.ready { "✓".green() } else { "✗".red() };
            println!(
                "{marker} {:<14} {:<28} {}",
                status.name, status.url, status.detail
            );
        }
    }

    if !all_ready {
        std::process::exit(1);
    }
    Ok(())
}
