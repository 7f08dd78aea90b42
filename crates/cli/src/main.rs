//! tagforge command-line entry point.
//!
//! Wires the pipeline together: parse the seed file, validate it, then hand
//! it to the batch orchestrator and print the summary. `--dry-run` stops
//! after validation and never constructs the API client.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use tagforge_api::{ContainerClient, TagManagerClient};
use tagforge_engine::{RunOptions, RunStatus};
use tagforge_types::ValidationFailure;

mod config;
use config::Config;

/// Exit codes shared with wrapper tooling.
const EXIT_SUCCESS: u8 = 0;
/// Parse or configuration problem; the pipeline never started.
const EXIT_FATAL: u8 = 1;
/// The seed failed validation; no remote call was made.
const EXIT_VALIDATION: u8 = 2;
const EXIT_PARTIAL: u8 = 3;
const EXIT_FAILED: u8 = 4;

#[derive(Debug, Parser)]
#[command(
    name = "tagforge",
    about = "Replay a container seed file into a remote tag-management workspace",
    version
)]
struct Cli {
    /// Path to the seed file (.json, .xlsx, or .xls)
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// Workspace name (default: generated from prefix + timestamp)
    #[arg(long, short = 'w')]
    workspace: Option<String>,

    /// Container identifier: numeric id or public GTM-XXXX id
    #[arg(long)]
    container_id: Option<String>,

    /// Account id; resolved from the container identifier when omitted
    #[arg(long)]
    account_id: Option<String>,

    /// Only replay resources of this template type
    #[arg(long)]
    type_filter: Option<String>,

    /// Reuse (and clear) the named workspace instead of creating a new one
    #[arg(long)]
    reuse: bool,

    /// Enable verbose (debug) logging
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Parse and validate only; make no remote calls
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match execute(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            error!(error = %format!("{err:#}"), "aborting");
            eprintln!("Error: {err:#}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

async fn execute(cli: Cli) -> Result<u8> {
    let config = Config::from_env();

    let mut seed = tagforge_ingest::read_seed(&cli.input)?;
    if let Some(type_filter) = &cli.type_filter {
        seed = tagforge_engine::filter_by_type(&seed, type_filter);
        info!(%type_filter, remaining = seed.resource_count(), "type filter applied");
    }

    let errors = tagforge_types::validate_seed(&seed);
    if !errors.is_empty() {
        eprintln!("{}", ValidationFailure { errors });
        return Ok(EXIT_VALIDATION);
    }
    info!(
        variables = seed.variables.len(),
        triggers = seed.triggers.len(),
        tags = seed.tags.len(),
        "seed validated"
    );

    if cli.dry_run {
        println!(
            "Dry run passed: {} variable(s), {} trigger(s), {} tag(s) validated; no remote calls made.",
            seed.variables.len(),
            seed.triggers.len(),
            seed.tags.len()
        );
        return Ok(EXIT_SUCCESS);
    }

    let client = TagManagerClient::from_env().context("could not build the API client")?;

    let container_identifier = cli
        .container_id
        .or(config.container_id)
        .context("no container id provided; pass --container-id or set TAGFORGE_CONTAINER_ID")?;
    let (account_id, container_id) = match cli.account_id.or(config.account_id) {
        Some(account_id) => (account_id, container_identifier),
        None => {
            info!(container = %container_identifier, "resolving account from container identifier");
            client
                .resolve_container(&container_identifier)
                .await
                .context("could not resolve the container identifier")?
        }
    };
    let api = ContainerClient::new(client, account_id, container_id);

    let seed_file_name = cli
        .input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| cli.input.display().to_string());
    let options = RunOptions {
        workspace_name: cli.workspace,
        workspace_prefix: config.workspace_prefix,
        description: format!("Seeded from {seed_file_name}"),
        reuse: cli.reuse,
    };

    match tagforge_engine::run(&seed, &api, &options).await {
        Ok(result) => {
            println!("{}", tagforge_engine::report::render(&result));
            Ok(exit_code_for(result.status()))
        }
        Err(fatal) => {
            error!(error = %fatal, "run aborted before resource creation");
            eprintln!("Error: {fatal}");
            if let Some(source) = std::error::Error::source(&fatal) {
                eprintln!("  caused by: {source}");
            }
            println!("Status: FAILED");
            println!("0 resources created");
            Ok(EXIT_FAILED)
        }
    }
}

fn exit_code_for(status: RunStatus) -> u8 {
    match status {
        RunStatus::Success => EXIT_SUCCESS,
        RunStatus::Partial => EXIT_PARTIAL,
        RunStatus::Failed => EXIT_FAILED,
    }
}
