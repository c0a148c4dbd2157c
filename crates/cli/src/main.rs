//! `zapflow` CLI entry-point.
//!
//! Available sub-commands:
//! - `worker`: run the scheduler loop.
//! - `migrate`: run pending database migrations.
//! - `validate`: validate an automation definition file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use engine::{
    validate_automation, AutomationDefinition, AutomationStore, ConnectorRegistry, EngineConfig,
    InMemoryStore, PgStore, SchedulerLoop, WebhookRegistrar,
};

#[derive(Parser)]
#[command(
    name = "zapflow",
    about = "Trigger/action automation engine",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the scheduler loop until interrupted.
    Worker {
        #[arg(long, env = "DATABASE_URL", required_unless_present = "in_memory")]
        database_url: Option<String>,
        /// Serve automations from a JSON definition file instead of Postgres.
        #[arg(long, value_name = "FILE")]
        in_memory: Option<PathBuf>,
    },
    /// Run pending database migrations.
    Migrate {
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,
    },
    /// Validate an automation definition JSON file.
    Validate {
        /// File holding one definition or an array of them.
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Worker {
            database_url,
            in_memory,
        } => run_worker(database_url, in_memory).await,
        Command::Migrate { database_url } => {
            info!("running migrations");
            let pool = db::pool::create_pool(&database_url, 2).await?;
            db::pool::run_migrations(&pool).await?;
            info!("migrations applied successfully");
            Ok(())
        }
        Command::Validate { path } => {
            let registry = ConnectorRegistry::with_builtins();
            let mut failed = 0;
            for definition in read_definitions(&path)? {
                match validate_automation(&definition, &registry) {
                    Ok(order) => println!(
                        "✅ '{}' is valid. {} action(s) in order: {order:?}",
                        definition.automation.name,
                        order.len()
                    ),
                    Err(e) => {
                        failed += 1;
                        eprintln!("❌ '{}': {e}", definition.automation.name);
                    }
                }
            }
            if failed > 0 {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

async fn run_worker(database_url: Option<String>, in_memory: Option<PathBuf>) -> Result<()> {
    let config = EngineConfig::from_env()?;
    let registry = Arc::new(ConnectorRegistry::with_builtins());

    let store: Arc<dyn AutomationStore> = match (in_memory, database_url) {
        (Some(path), _) => {
            let store = InMemoryStore::new();
            for definition in read_definitions(&path)? {
                store.insert(definition).await;
            }
            info!(path = %path.display(), "serving automations from file");
            Arc::new(store)
        }
        (None, Some(url)) => Arc::new(PgStore::new(db::pool::create_pool(&url, 5).await?)),
        (None, None) => anyhow::bail!("either --database-url or --in-memory is required"),
    };

    let registrar = WebhookRegistrar::new(Arc::clone(&store), Arc::clone(&registry), config.clone());
    match registrar.register_pending().await {
        Ok(registered) => info!(registered, "pending webhooks registered"),
        Err(e) => error!(error = %e, "webhook registration sweep failed"),
    }

    let scheduler = SchedulerLoop::new(store, registry, config);
    scheduler.preflight().await?;

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received, finishing current cycle");
            let _ = shutdown_tx.send(());
        }
    });

    scheduler.run(shutdown_rx).await;
    Ok(())
}

fn read_definitions(path: &Path) -> Result<Vec<AutomationDefinition>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read file {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&content).with_context(|| format!("invalid JSON in {}", path.display()))?;

    let definitions = if value.is_array() {
        serde_json::from_value(value)?
    } else {
        vec![serde_json::from_value(value)?]
    };
    Ok(definitions)
}
