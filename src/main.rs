//! page-inspector main entry point
//!
//! This is the command-line interface for the page-inspector job pipeline.

use anyhow::Context;
use clap::Parser;
use page_inspector::config::{load_config_with_hash, Config};
use page_inspector::jobs::{CancellationRegistry, ControlResult, JobControl, Worker};
use page_inspector::output::{
    load_statistics, print_job, print_job_page, print_statistics, JobFormat,
};
use page_inspector::state::JobStatus;
use page_inspector::storage::{open_storage, JobQuery, JobSort, SqliteStorage};
use page_inspector::Analyzer;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// page-inspector: asynchronous web page analysis
///
/// Submitted URLs are queued and analyzed one at a time by a background
/// worker: HTML version, title, headings, internal/external links, broken
/// links and login forms.
#[derive(Parser, Debug)]
#[command(name = "page-inspector")]
#[command(version = "1.0.0")]
#[command(about = "Asynchronous web page analysis", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the effective settings without running
    #[arg(long, conflicts_with_all = ["stats", "submit"])]
    dry_run: bool,

    /// Show job statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "submit"])]
    stats: bool,

    /// Queue URLs for analysis and exit
    #[arg(long, value_name = "URL", num_args = 1.., conflicts_with_all = ["dry_run", "stats"])]
    submit: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config, &config_hash);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if !cli.submit.is_empty() {
        handle_submit(&config, &cli.submit)?;
    } else {
        handle_serve(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("page_inspector=info,warn"),
            1 => EnvFilter::new("page_inspector=debug,info"),
            2 => EnvFilter::new("page_inspector=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn open_store(config: &Config) -> anyhow::Result<Arc<SqliteStorage>> {
    let path = Path::new(&config.storage.database_path);
    let storage = open_storage(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    Ok(Arc::new(storage))
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config, config_hash: &str) {
    println!("=== page-inspector Dry Run ===\n");

    println!("Worker:");
    println!("  Poll interval: {}ms", config.worker.poll_interval_ms);
    println!("  Throttle: {}ms", config.worker.throttle_ms);

    println!("\nFetching:");
    println!(
        "  Page: {}ms timeout, {} redirects max",
        config.fetch.page_timeout_ms, config.fetch.page_max_redirects
    );
    println!(
        "  Link probes: {}ms timeout, {} redirects max",
        config.fetch.probe_timeout_ms, config.fetch.probe_max_redirects
    );

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);

    println!("\n✓ Configuration is valid (hash: {})", config_hash);
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let storage = open_store(config)?;
    let stats = load_statistics(&*storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --submit mode: queues URLs without running the worker
fn handle_submit(config: &Config, urls: &[String]) -> anyhow::Result<()> {
    let control = JobControl::new(open_store(config)?, CancellationRegistry::new());

    for url in urls {
        match control.submit(url) {
            Ok(job) => println!("{}  {}", job.id, job.url),
            Err(e) => eprintln!("Rejected {}: {}", url, e),
        }
    }

    Ok(())
}

/// Runs the worker and an interactive console until `quit` or Ctrl-C
async fn handle_serve(config: Config) -> anyhow::Result<()> {
    let store = open_store(&config)?;
    let registry = CancellationRegistry::new();
    let analyzer = Analyzer::from_config(&config).context("Failed to build HTTP clients")?;

    let worker = Worker::new(
        Arc::clone(&store),
        analyzer,
        registry.clone(),
        config.worker.clone(),
    );
    let control = JobControl::new(store, registry);

    let shutdown = CancellationToken::new();
    let worker_handle = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { worker.run(shutdown).await })
    };

    println!("page-inspector ready. Type 'help' for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupt received, shutting down");
                break;
            }
            line = lines.next_line() => {
                match line? {
                    Some(line) => {
                        if !run_command(&control, line.trim()) {
                            break;
                        }
                    }
                    // No console attached; keep serving until interrupted
                    None => {
                        tokio::signal::ctrl_c().await?;
                        tracing::info!("Interrupt received, shutting down");
                        break;
                    }
                }
            }
        }
    }

    shutdown.cancel();
    tracing::info!("Waiting for the worker to finish its current job");
    worker_handle.await.context("Worker task panicked")?;

    Ok(())
}

/// Executes one console command; returns false on `quit`
fn run_command(control: &JobControl<SqliteStorage>, line: &str) -> bool {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return true;
    };
    let args: Vec<String> = parts.map(str::to_string).collect();

    let outcome: ControlResult<()> = match command {
        "quit" | "exit" => return false,
        "help" => {
            print_help();
            Ok(())
        }
        "submit" => args.iter().try_for_each(|url| -> ControlResult<()> {
            let job = control.submit(url)?;
            println!("{}  {}", job.id, job.status);
            Ok(())
        }),
        "show" => show_command(control, &args),
        "list" => list_command(control, &args),
        "stop" => control
            .stop(&args)
            .map(|n| println!("Stopped {} job(s)", n)),
        "rerun" => control
            .rerun(&args)
            .map(|n| println!("Re-queued {} job(s)", n)),
        "delete" => control
            .delete(&args)
            .map(|n| println!("Deleted {} job(s)", n)),
        "stats" => control.list(&JobQuery::default()).map(|page| {
            let counts = page.status_counts;
            for status in JobStatus::all_states() {
                println!("  {:<10} {}", status, counts.get(status));
            }
        }),
        other => {
            println!("Unknown command '{}'. Type 'help' for commands.", other);
            Ok(())
        }
    };

    if let Err(e) = outcome {
        println!("Error: {}", e);
    }
    true
}

/// `show [--json] <id>...`
fn show_command(control: &JobControl<SqliteStorage>, args: &[String]) -> ControlResult<()> {
    let format = if args.iter().any(|arg| arg == "--json") {
        JobFormat::Json
    } else {
        JobFormat::Text
    };

    args.iter()
        .filter(|arg| *arg != "--json")
        .try_for_each(|id| -> ControlResult<()> {
            match control.get(id)? {
                Some(job) => {
                    if let Err(e) = print_job(&job, format) {
                        println!("Cannot render job {}: {}", id, e);
                    }
                }
                None => println!("No job {}", id),
            }
            Ok(())
        })
}

/// `list [status] [page] [sort:<column>[:asc|desc]] [text]`
fn list_command(
    control: &JobControl<SqliteStorage>,
    args: &[String],
) -> ControlResult<()> {
    let mut query = JobQuery::default();
    for arg in args {
        if let Some(ordering) = arg.strip_prefix("sort:") {
            match JobSort::parse(ordering) {
                Some(sort) => query.sort = Some(sort),
                None => {
                    println!(
                        "Unknown sort '{}'; columns: created, updated, url, title, status",
                        ordering
                    );
                    return Ok(());
                }
            }
        } else if let Some(status) = JobStatus::from_db_string(arg) {
            query.status = Some(status);
        } else if let Ok(page) = arg.parse::<u32>() {
            query.page = page.max(1);
        } else {
            query.search = Some(arg.clone());
        }
    }

    print_job_page(&control.list(&query)?);
    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  submit <url>...             queue URLs for analysis");
    println!("  show [--json] <id>...       show a job and its results");
    println!("  list [status] [page] [text] list jobs, newest activity first");
    println!("       [sort:<column>[:asc|desc]]  order by created, updated, url, title or status");
    println!("  stop <id>...                cancel queued or running jobs");
    println!("  rerun <id>...               re-queue finished jobs");
    println!("  delete <id>...              delete jobs");
    println!("  stats                       job counts per status");
    println!("  quit                        stop the worker and exit");
}
