// ABOUTME: Entry point for the rollkeeper CLI application.
// ABOUTME: Parses arguments, wires collaborators from config, and dispatches subcommands.

mod cli;

use clap::Parser;
use cli::{Cli, Commands, LogFormat};
use rollkeeper::config::{Config, RuntimeMode};
use rollkeeper::deploy::Reconciler;
use rollkeeper::error::{Error, Result};
use rollkeeper::health::HttpReadinessGate;
use rollkeeper::registry::{DigestResolver, OciRegistry};
use rollkeeper::runner::Runner;
use rollkeeper::runtime::{DryRunRuntime, PctRuntime, RuntimeAdapter};
use rollkeeper::spec::load_service_specs;
use rollkeeper::state::{FileStateStore, StateStore};
use std::env;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_format);

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins; otherwise `info`, or `debug` with `--verbose`.
fn init_tracing(verbose: bool, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run => {
            let config = load_config(cli.config.as_deref())?;
            let runner = build_runner(&config)?;
            let cancel = CancellationToken::new();
            cancel_on_signal(cancel.clone());
            runner.run(&cancel).await
        }
        Commands::Once => {
            let config = load_config(cli.config.as_deref())?;
            let runner = build_runner(&config)?;
            let cancel = CancellationToken::new();
            cancel_on_signal(cancel.clone());

            let report = runner.run_once(&cancel).await?;
            for (service, outcome) in &report.outcomes {
                println!("{service}: {outcome}");
            }
            for failure in &report.failures {
                println!("{}: FAILED: {}", failure.service, failure.error);
            }
            if report.is_success() {
                Ok(())
            } else {
                Err(Error::ReconcileFailed {
                    failed: report.failures.len(),
                    total: report.attempted(),
                })
            }
        }
        Commands::Validate { services } => {
            let dir = match services {
                Some(dir) => dir,
                None => load_config(cli.config.as_deref())?.runner.services_path,
            };
            let specs = load_service_specs(&dir)?;
            for spec in &specs {
                println!(
                    "{}\tnode={}\tctid={}\timage={}:{}\tstrategy={}",
                    spec.name, spec.node, spec.ctid, spec.image, spec.tag, spec.rollout.strategy
                );
            }
            println!("{} service spec(s) valid", specs.len());
            Ok(())
        }
        Commands::Status => {
            let config = load_config(cli.config.as_deref())?;
            let store = FileStateStore::open(&config.state.path)?;
            let entries = store.list()?;
            if entries.is_empty() {
                println!("No recorded state in {}", config.state.path.display());
                return Ok(());
            }
            println!("CTID\tNODE\tSTATUS\tDIGEST\tUPDATED");
            for entry in entries {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    entry.ctid,
                    entry.node,
                    entry.status,
                    entry.digest,
                    entry.updated_at.to_rfc3339()
                );
            }
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Config::discover(&env::current_dir()?),
    }
}

/// Wire the reconciler and runner from `config`.
fn build_runner(config: &Config) -> Result<Runner> {
    let store = Arc::new(FileStateStore::open(&config.state.path)?);

    let registry = OciRegistry::with_config(
        config.registry.credentials()?,
        config.registry.insecure.clone(),
    );
    if registry.is_anonymous() {
        tracing::debug!("using anonymous registry access");
    }

    let runtime: Arc<dyn RuntimeAdapter> = match config.runtime.mode {
        RuntimeMode::Cli => Arc::new(
            PctRuntime::new(&config.runtime.pct_path)
                .with_span(tracing::info_span!("pct", path = %config.runtime.pct_path.display())),
        ),
        RuntimeMode::DryRun => {
            tracing::warn!("dry-run mode: containers are simulated in memory");
            Arc::new(DryRunRuntime::new())
        }
    };

    let reconciler = Reconciler::new(
        DigestResolver::new(Arc::new(registry)),
        runtime,
        store,
        Arc::new(HttpReadinessGate::http()?),
    )
    .with_options(config.reconciler.options());

    Ok(
        Runner::new(reconciler, &config.runner.services_path, config.runner.interval)
            .with_node(config.runtime.node.clone()),
    )
}

/// Cancel `cancel` on SIGINT or SIGTERM.
fn cancel_on_signal(cancel: CancellationToken) {
    tokio::spawn(async move {
        let interrupt = tokio::signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "cannot listen for SIGTERM");
                    std::future::pending::<()>().await;
                }
            }
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = interrupt => {}
            _ = terminate => {}
        }
        tracing::info!("shutdown requested");
        cancel.cancel();
    });
}
