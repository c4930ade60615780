//! The `ListCollection` trait: the document-storage contract the repository
//! is written against.
//!
//! Two bindings ship with the crate:
//! - `mongodb::Collection<Document>` (see `mongo.rs`) for real deployments.
//! - [`MemoryCollection`] for tests that should not need a running server.

use async_trait::async_trait;
use futures::stream::BoxStream;
use mongodb::bson::{Bson, Document};

use crate::DbError;

pub mod memory;
mod mongo;

pub use memory::{MemoryCollection, MemorySession};

/// Lazy stream of raw documents returned by [`ListCollection::find_documents`].
pub type DocumentStream<'a> = BoxStream<'a, Result<Document, DbError>>;

/// Filter, projection and sort for a multi-document read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindQuery {
    pub filter: Document,
    /// Empty means "return whole documents".
    pub projection: Document,
    /// Empty means "storage order".
    pub sort: Document,
}

/// A handle to one collection of list documents.
///
/// Every method is exactly one round trip. When `session` is `Some`, the call
/// runs inside the caller's session; implementations never start, commit or
/// abort sessions themselves.
#[async_trait]
pub trait ListCollection: Send + Sync {
    /// Transaction context a caller may thread through each call.
    type Session: Send;

    /// Insert one document and return the id the storage engine assigned.
    async fn insert_document(
        &self,
        doc: Document,
        session: Option<&mut Self::Session>,
    ) -> Result<Bson, DbError>;

    /// Run a query and return its results as a lazy stream.
    ///
    /// The stream borrows the session (if any) until it is dropped.
    async fn find_documents<'a>(
        &'a self,
        query: FindQuery,
        session: Option<&'a mut Self::Session>,
    ) -> Result<DocumentStream<'a>, DbError>;

    /// Fetch the first document matching `filter`.
    async fn find_document(
        &self,
        filter: Document,
        session: Option<&mut Self::Session>,
    ) -> Result<Option<Document>, DbError>;

    /// Delete at most one document matching `filter`; returns how many went.
    async fn delete_document(
        &self,
        filter: Document,
        session: Option<&mut Self::Session>,
    ) -> Result<u64, DbError>;
}
