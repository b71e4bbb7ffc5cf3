//! Run one partner discovery from the command line.
//!
//! Reads Firecrawl settings from the environment (or `.env`), runs the
//! pipeline against a seed URL, and prints either a short report or the
//! full outcome as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use partner_discovery::{
    Discovery, DiscoveryMode, DiscoveryOutcome, JobLog, JobLogEntry, Settings,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "discover")]
#[command(about = "Discover a site's partner and integration directory")]
struct Cli {
    /// Seed URL, e.g. https://stripe.com
    seed_url: String,

    /// standard or aggressive
    #[arg(long, default_value = "standard")]
    mode: String,

    /// Client the run is recorded against
    #[arg(long, default_value = "cli")]
    client: String,

    /// Print the full outcome as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,partner_discovery=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mode = DiscoveryMode::from_str_lossy(&cli.mode);

    let settings = Settings::from_env().context("Failed to load settings")?;
    let firecrawl = settings
        .firecrawl_directory()
        .context("Failed to build Firecrawl client")?;
    let discovery = Discovery::new(firecrawl.clone(), firecrawl)
        .with_request_timeout(settings.request_timeout);
    let config = discovery.config(mode).clone();

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; cancelling discovery");
            on_ctrl_c.cancel();
        }
    });

    let jobs = JobLog::new();
    let (job_id, result) = jobs
        .track(
            &cli.client,
            mode,
            config,
            discovery.discover_partners_with_cancel(&cli.seed_url, mode, &cancel),
        )
        .await;

    let job = jobs
        .get(&job_id)
        .context("Discovery job missing from the job log")?;
    tracing::info!(
        job_id = %job.job_id,
        client = %job.client_name,
        status = ?job.status,
        partners = job.partner_count,
        "Discovery job recorded"
    );

    let outcome =
        result.with_context(|| format!("Discovery {} for {} failed", job_id, cli.seed_url))?;

    if cli.json {
        let report = serde_json::json!({ "job": job, "outcome": outcome });
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize outcome")?
        );
    } else {
        print_report(&cli.seed_url, mode, &job, &outcome);
    }

    Ok(())
}

fn print_report(seed_url: &str, mode: DiscoveryMode, job: &JobLogEntry, outcome: &DiscoveryOutcome) {
    println!("Discovery for {} ({})", seed_url, mode);
    println!("  logged:  {} for {}", job.job_id, job.client_name);
    println!("  job:     {}", outcome.job_id);
    println!("  reason:  {}", outcome.termination_reason);
    println!("  found:   {}", outcome.results.len());

    if outcome.from_cache() {
        println!("  source:  cache");
    } else if let Some(summary) = outcome.summary() {
        println!("  shortlisted:        {}", summary.shortlisted_count);
        println!("  pages extracted:    {}", summary.extracted_count);
        println!("  duplicates dropped: {}", summary.dedupe_dropped_count);
        println!("  failed calls:       {}", summary.failed_extractions);
        println!(
            "  agentic fallback:   {}",
            if summary.agentic_ran { "yes" } else { "no" }
        );
    }

    if outcome.results.is_empty() {
        return;
    }
    println!();
    for partner in &outcome.results {
        let category = partner.category.as_deref().unwrap_or("-");
        let website = partner.website.as_deref().unwrap_or("-");
        println!("  {:<32} {:<20} {}", partner.partner_name, category, website);
    }
}
