//! To-do list repository: whole-list create, enumerate, read and delete.

use std::future::Future;
use std::time::Duration;

use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Bson, Document};
use mongodb::{Collection, Database};
use tracing::{debug, instrument, warn};

use crate::collection::{FindQuery, ListCollection};
use crate::models::{ListSummary, TodoList, FIELD_ID, FIELD_ITEMS, FIELD_ITEM_COUNT, FIELD_NAME};
use crate::{DbError, StoreConfig};

/// Lazy, single-pass sequence of summaries ordered by name.
pub type SummaryStream<'a> = BoxStream<'a, Result<ListSummary, DbError>>;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryConfig {
    /// Bound on each round trip; elapsing yields `DbError::Cancelled`.
    pub operation_timeout: Option<Duration>,
}

// ---------------------------------------------------------------------------
// TodoRepository
// ---------------------------------------------------------------------------

/// Data access for one collection of list documents.
///
/// Holds a clone of the collection handle and nothing else mutable, so one
/// repository can serve any number of concurrent callers. Every operation
/// takes an optional caller-owned session; the repository never starts,
/// commits or aborts one.
#[derive(Clone)]
pub struct TodoRepository<C = Collection<Document>> {
    collection: C,
    config: RepositoryConfig,
}

impl TodoRepository<Collection<Document>> {
    /// Repository over `config.collection` in `database`.
    pub fn from_database(database: &Database, config: &StoreConfig) -> Self {
        Self::with_config(
            database.collection::<Document>(&config.collection),
            config.repository_config(),
        )
    }
}

impl<C: ListCollection> TodoRepository<C> {
    pub fn new(collection: C) -> Self {
        Self::with_config(collection, RepositoryConfig::default())
    }

    pub fn with_config(collection: C, config: RepositoryConfig) -> Self {
        Self { collection, config }
    }

    pub fn collection(&self) -> &C {
        &self.collection
    }

    /// Stream every list as a [`ListSummary`], ordered by name (byte order).
    ///
    /// Only `name` and the computed item count are requested from storage,
    /// never the items themselves. A document that does not convert shows up
    /// as an `Err` element; the stream is not restartable.
    ///
    /// The exception is a stored list with no `items` array: storage cannot
    /// evaluate `$size` for it, so the whole call fails with
    /// `MalformedDocument` (field `items`) before anything is streamed.
    #[instrument(skip_all)]
    pub async fn enumerate_summaries<'a>(
        &'a self,
        session: Option<&'a mut C::Session>,
    ) -> Result<SummaryStream<'a>, DbError> {
        let query = FindQuery {
            filter: doc! {},
            projection: doc! {
                FIELD_NAME: 1,
                FIELD_ITEM_COUNT: { "$size": format!("${FIELD_ITEMS}") },
            },
            sort: doc! { FIELD_NAME: 1 },
        };

        let documents = self
            .bounded(
                "enumerate_summaries",
                self.collection.find_documents(query, session),
            )
            .await?;

        Ok(documents
            .map(|found| found.and_then(|doc| ListSummary::from_document(&doc)))
            .boxed())
    }

    /// Drain [`Self::enumerate_summaries`], stopping at the first error.
    pub async fn collect_summaries(
        &self,
        session: Option<&mut C::Session>,
    ) -> Result<Vec<ListSummary>, DbError> {
        let summaries: Vec<ListSummary> = self
            .enumerate_summaries(session)
            .await?
            .try_collect()
            .await?;
        debug!(count = summaries.len(), "summaries collected");
        Ok(summaries)
    }

    /// Insert an empty list called `name` and return its new id.
    ///
    /// The name is stored verbatim: empty, blank and duplicate names are all
    /// accepted.
    #[instrument(skip(self, session))]
    pub async fn create_list(
        &self,
        name: &str,
        session: Option<&mut C::Session>,
    ) -> Result<String, DbError> {
        let inserted = self
            .bounded(
                "create_list",
                self.collection
                    .insert_document(TodoList::new_document(name), session),
            )
            .await?;

        let id = match inserted {
            Bson::ObjectId(oid) => oid.to_hex(),
            other => {
                return Err(DbError::malformed(
                    FIELD_ID,
                    format!("inserted id {other} is not an ObjectId"),
                ))
            }
        };

        debug!(list_id = %id, "list created");
        Ok(id)
    }

    /// Fetch one list with all of its items.
    ///
    /// # Errors
    /// `InvalidIdentifier` when `id` is not an `ObjectId` hex string,
    /// `NotFound` when no list has that id, `MalformedDocument` when the stored
    /// list does not convert.
    #[instrument(skip(self, session))]
    pub async fn get_list(
        &self,
        id: &str,
        session: Option<&mut C::Session>,
    ) -> Result<TodoList, DbError> {
        let oid = parse_list_id(id)?;

        let found = self
            .bounded(
                "get_list",
                self.collection.find_document(doc! { FIELD_ID: oid }, session),
            )
            .await?
            .ok_or_else(|| DbError::NotFound(id.to_string()))?;

        TodoList::from_document(&found)
    }

    /// Delete one list. Returns `false` (not an error) when nothing matched,
    /// so repeating a delete is harmless.
    #[instrument(skip(self, session))]
    pub async fn delete_list(
        &self,
        id: &str,
        session: Option<&mut C::Session>,
    ) -> Result<bool, DbError> {
        let oid = parse_list_id(id)?;

        let deleted = self
            .bounded(
                "delete_list",
                self.collection
                    .delete_document(doc! { FIELD_ID: oid }, session),
            )
            .await?;

        debug!(deleted, "delete finished");
        Ok(deleted == 1)
    }

    // -----------------------------------------------------------------------
    // Internal: apply the configured operation timeout to one round trip.
    // -----------------------------------------------------------------------

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, DbError>>,
    ) -> Result<T, DbError> {
        let Some(after) = self.config.operation_timeout else {
            return call.await;
        };

        match tokio::time::timeout(after, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!("{operation} timed out after {after:?}");
                Err(DbError::Cancelled { operation, after })
            }
        }
    }
}

fn parse_list_id(id: &str) -> Result<ObjectId, DbError> {
    ObjectId::parse_str(id).map_err(|_| DbError::InvalidIdentifier(id.to_string()))
}
