//! `todo-lists` CLI entry-point.
//!
//! Available sub-commands:
//! - `list`    print every list summary, ordered by name.
//! - `create`  create an empty list and print its id.
//! - `show`    print one list with its items.
//! - `delete`  delete a list by id.
//!
//! Results are printed to stdout as JSON; logs go to stderr (`RUST_LOG`).

use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use todo_store::config::{DEFAULT_COLLECTION, DEFAULT_DATABASE, DEFAULT_URI};
use todo_store::{client, StoreConfig, TodoRepository};

#[derive(Parser)]
#[command(
    name = "todo-lists",
    about = "Manage to-do lists stored in MongoDB",
    version
)]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct StoreArgs {
    /// MongoDB connection string.
    #[arg(long, env = "MONGODB_URI", default_value = DEFAULT_URI, hide_env_values = true)]
    uri: String,

    #[arg(long, env = "TODO_DATABASE", default_value = DEFAULT_DATABASE)]
    database: String,

    #[arg(long, env = "TODO_COLLECTION", default_value = DEFAULT_COLLECTION)]
    collection: String,

    /// Per-operation timeout in milliseconds.
    #[arg(long, env = "TODO_TIMEOUT_MS")]
    timeout_ms: Option<u64>,
}

impl StoreArgs {
    fn into_config(self) -> StoreConfig {
        let timeout = self.timeout_ms.map(Duration::from_millis);
        StoreConfig {
            uri: self.uri,
            database: self.database,
            collection: self.collection,
            server_selection_timeout: timeout,
            operation_timeout: timeout,
            ..StoreConfig::default()
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// List every to-do list with its item count.
    List,
    /// Create an empty list.
    Create {
        name: String,
    },
    /// Show one list with all of its items.
    Show {
        id: String,
    },
    /// Delete a list.
    Delete {
        id: String,
    },
}

#[derive(Serialize)]
struct Created {
    id: String,
}

#[derive(Serialize)]
struct Deleted {
    id: String,
    deleted: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.store.into_config();

    let client = client::connect(&config)
        .await
        .context("invalid MongoDB connection settings")?;
    let database = client.database(&config.database);
    client::ping(&database)
        .await
        .context("MongoDB is not reachable")?;

    let repo = TodoRepository::from_database(&database, &config);

    match cli.command {
        Command::List => {
            let summaries = repo.collect_summaries(None).await?;
            info!("{} lists found", summaries.len());
            print_json(&summaries)?;
        }
        Command::Create { name } => {
            let id = repo.create_list(&name, None).await?;
            info!("Created list {id}");
            print_json(&Created { id })?;
        }
        Command::Show { id } => {
            let list = repo
                .get_list(&id, None)
                .await
                .with_context(|| format!("cannot show list {id}"))?;
            print_json(&list)?;
        }
        Command::Delete { id } => {
            let deleted = repo.delete_list(&id, None).await?;
            print_json(&Deleted { id, deleted })?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
