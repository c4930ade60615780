//! MongoDB client bootstrap.
//!
//! These helpers only build handles; opening, sharing and dropping the client
//! stays with the caller.

use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use tracing::info;

use crate::{DbError, StoreConfig};

/// Create a client for `config.uri`.
///
/// Server selection happens lazily, so this succeeds without a reachable
/// server; call [`ping`] to fail fast.
pub async fn connect(config: &StoreConfig) -> Result<Client, DbError> {
    info!(
        "Connecting to MongoDB (app_name={}, database={})",
        config.app_name, config.database
    );
    let mut options = ClientOptions::parse(&config.uri).await?;
    options.app_name = Some(config.app_name.clone());
    if let Some(timeout) = config.server_selection_timeout {
        options.server_selection_timeout = Some(timeout);
    }
    Ok(Client::with_options(options)?)
}

/// Round-trip a `{ ping: 1 }` command.
pub async fn ping(database: &Database) -> Result<(), DbError> {
    database.run_command(doc! { "ping": 1 }).await?;
    info!("MongoDB database '{}' reachable", database.name());
    Ok(())
}
