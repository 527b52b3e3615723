//! ustored: the UStore operator daemon.
//!
//! Single binary over the embedded state store:
//! - Admits workload specs (engine immutability, quantity and path checks)
//! - Runs one reconcile pass on demand
//! - Runs the periodic reconcile loop until Ctrl-C
//!
//! # Usage
//!
//! ```text
//! ustored --data-dir /var/lib/ustore apply --file kv.toml default/kv
//! ustored reconcile default/kv
//! ustored status default/kv
//! ustored run
//! ```

mod commands;
mod daemon;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use ustore_core::config::LogConfig;
use ustore_core::{OperatorConfig, WorkloadId};
use ustore_state::StateStore;

const DEFAULT_FILTER: &str = "info,ustored=debug,ustore=debug";

#[derive(Parser)]
#[command(name = "ustored", about = "UStore operator daemon", version)]
struct Cli {
    /// Data directory for the state store.
    #[arg(long, global = true, default_value = "/var/lib/ustore")]
    data_dir: PathBuf,

    /// Operator config file (TOML). Defaults apply when absent.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Admit or update a workload from a TOML or JSON spec file.
    Apply {
        #[arg(short, long)]
        file: PathBuf,
        /// `namespace/name`, or a bare name in the default namespace.
        workload: WorkloadId,
    },
    /// Run one reconcile pass and print the outcome.
    Reconcile { workload: WorkloadId },
    /// Print the stored status as JSON.
    Status { workload: WorkloadId },
    /// Delete a workload and every object it owns.
    Delete { workload: WorkloadId },
    /// List admitted workloads.
    List,
    /// Print the effective operator config.
    Config,
    /// Reconcile every workload on a timer until Ctrl-C.
    Run,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = OperatorConfig::load(cli.config.as_deref())
        .with_context(|| format!("loading config {:?}", cli.config))?;
    init_tracing(&config.log);

    match cli.command {
        Command::Apply { file, workload } => {
            let store = open_store(&cli.data_dir)?;
            let admitted = commands::apply(&store, &workload, &file)?;
            println!(
                "{workload} admitted (uid {}, generation {})",
                admitted.metadata.uid, admitted.metadata.generation
            );
        }
        Command::Reconcile { workload } => {
            let store = open_store(&cli.data_dir)?;
            let pass = commands::reconcile(&store, &config, &workload)?;
            println!("{}", commands::describe(&workload, &pass));
        }
        Command::Status { workload } => {
            let store = open_store(&cli.data_dir)?;
            let status = commands::status(&store, &workload)?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Command::Delete { workload } => {
            let store = open_store(&cli.data_dir)?;
            let removed = commands::delete(&store, &workload)?;
            println!("{workload} deleted with {removed} dependents");
        }
        Command::List => {
            let store = open_store(&cli.data_dir)?;
            for workload in store.list_workloads()? {
                println!(
                    "{}\t{}\tgeneration {}",
                    workload.id(),
                    workload
                        .spec
                        .engine
                        .map(|engine| engine.to_string())
                        .unwrap_or_default(),
                    workload.metadata.generation
                );
            }
        }
        Command::Config => print!("{}", config.to_toml_string()?),
        Command::Run => daemon::run(open_store(&cli.data_dir)?, config).await?,
    }

    Ok(())
}

fn init_tracing(log: &LogConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(log.filter.as_deref().unwrap_or(DEFAULT_FILTER))
    });
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn open_store(data_dir: &std::path::Path) -> anyhow::Result<StateStore> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;
    let path = data_dir.join("ustore.redb");
    let store = StateStore::open(&path)?;
    info!(path = ?path, "state store opened");
    Ok(store)
}
