// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! sentinelctl - local inspection CLI for a running `sentineld`.

mod client;
mod color;
mod exit_error;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use output::OutputFormat;
use sentinel_core::{ContainerDescriptor, Incident};

use crate::client::SentinelClient;
use crate::exit_error::ExitError;

#[derive(Parser)]
#[command(name = "sentinelctl", version, about = "Inspect a running SRE Sentinel daemon")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, default_value_t, global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Daemon liveness and a one-line summary of monitored containers and open incidents
    Status,
    /// List monitored containers and their last-known state
    Containers,
    /// List incidents, or show one by id
    Incidents {
        /// Incident id to show in full detail
        id: Option<u64>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let code = e.downcast_ref::<ExitError>().map_or(1, |c| c.code);
        eprintln!("Error: {e}");
        std::process::exit(code);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let client = SentinelClient::from_env();

    match cli.command {
        Commands::Status => status(&client, cli.output).await,
        Commands::Containers => containers(&client, cli.output).await,
        Commands::Incidents { id: Some(id) } => incident(&client, cli.output, id).await,
        Commands::Incidents { id: None } => incidents(&client, cli.output).await,
    }
}

async fn status(client: &SentinelClient, format: OutputFormat) -> Result<()> {
    let healthy = client.is_healthy().await;
    if !healthy {
        return Err(ExitError::new(2, "sentineld is not reachable").into());
    }

    let containers = client.containers().await?;
    let incidents = client.incidents().await?;
    let open = incidents.iter().filter(|i| !i.state.is_terminal()).count();

    output::format_or_json(
        format,
        &serde_json::json!({
            "healthy": healthy,
            "containers": containers.len(),
            "open_incidents": open,
            "total_incidents": incidents.len(),
        }),
        || {
            println!("{}  sentineld is reachable", color::header("status:"));
            println!("  {} containers monitored", containers.len());
            println!("  {open} open incidents ({} total)", incidents.len());
        },
    )
}

async fn containers(client: &SentinelClient, format: OutputFormat) -> Result<()> {
    let containers = client.containers().await?;
    output::handle_list(format, &containers, "no monitored containers", render_containers_table)
}

fn render_containers_table(containers: &[ContainerDescriptor]) {
    println!("{}", color::header(&format!("{:<14} {:<20} {:<10} {:<9} {:>8}", "ID", "SERVICE", "STATUS", "RESTARTS", "MEM%")));
    for c in containers {
        let mem = c.last_sample.as_ref().map(|s| format!("{:.1}", s.memory_percent)).unwrap_or_else(|| "-".to_string());
        println!("{:<14} {:<20} {:<10} {:<9} {:>8}", c.id.short(), c.service, c.status, c.restart_count, mem);
    }
}

async fn incidents(client: &SentinelClient, format: OutputFormat) -> Result<()> {
    let incidents = client.incidents().await?;
    output::handle_list(format, &incidents, "no incidents", render_incidents_table)
}

fn render_incidents_table(incidents: &[Incident]) {
    println!("{}", color::header(&format!("{:<6} {:<14} {:<20} {:<12} {:>8}", "ID", "CONTAINER", "SERVICE", "STATE", "AGE")));
    for i in incidents {
        let is_critical = matches!(i.verdict.severity, sentinel_core::Severity::Critical | sentinel_core::Severity::High);
        println!(
            "{:<6} {:<14} {:<20} {:<12} {:>8}",
            i.id,
            i.container_id.short(),
            i.service,
            color::severity(&i.state.to_string(), is_critical),
            output::format_time_ago(i.detected_at_ms),
        );
    }
}

async fn incident(client: &SentinelClient, format: OutputFormat, id: u64) -> Result<()> {
    let Some(incident) = client.incident(id).await? else {
        return Err(ExitError::new(1, format!("no incident with id {id}")).into());
    };

    output::format_or_json(format, &incident, || {
        println!("{} inc-{}", color::header("incident"), incident.id.0);
        println!("  container: {} ({})", incident.container_id.short(), incident.service);
        println!("  state:     {}", incident.state);
        println!("  detected:  {} ago", output::format_time_ago(incident.detected_at_ms));
        println!("  severity:  {:?} (confidence {:.2})", incident.verdict.severity, incident.verdict.confidence);
        if let Some(root_cause) = &incident.root_cause {
            println!("  root cause: {}", root_cause.root_cause);
        }
        if let Some(plan) = &incident.plan {
            println!("  plan: {} action(s)", plan.actions.len());
        }
        for outcome in &incident.outcomes {
            println!("  - {} -> {}", outcome.action.tool, if outcome.success { "ok" } else { "failed" });
        }
        if let Some(explanation) = &incident.explanation {
            println!("  explanation: {explanation}");
        }
    })
}
