//! `MemoryCollection`: an in-process test double for `ListCollection`.
//!
//! Documents live in an async `RwLock`ed vector. Only the query syntax the
//! repository emits is evaluated:
//! - filters: `{}` or field equality (`{ _id: <oid> }`)
//! - projections: inclusion (`field: 1`) and `{ $size: "$field" }`
//! - sorts: `field: 1 | -1` on string or numeric fields (byte-order strings)
//!
//! Anything else is rejected with `DbError::UnsupportedQuery` rather than
//! silently misread.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{stream, StreamExt};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{Bson, Document};
use tokio::sync::RwLock;

use super::{DocumentStream, FindQuery, ListCollection};
use crate::DbError;

/// Stand-in for a client session. Counts the calls bound to it so tests can
/// check that a caller's session reached every round trip.
#[derive(Debug, Default)]
pub struct MemorySession {
    operations: usize,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of collection calls that ran inside this session.
    pub fn operations(&self) -> usize {
        self.operations
    }
}

#[derive(Default)]
struct Inner {
    documents: RwLock<Vec<Document>>,
    offline: AtomicBool,
    latency_nanos: AtomicU64,
    calls: AtomicUsize,
}

/// Cloneable handle; every clone sees the same documents.
#[derive(Clone, Default)]
pub struct MemoryCollection {
    inner: Arc<Inner>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a document exactly as given, bypassing id assignment. Used to
    /// seed fixtures, including deliberately malformed ones.
    pub async fn insert_raw(&self, doc: Document) {
        self.inner.documents.write().await.push(doc);
    }

    /// Snapshot of the stored documents in storage order.
    pub async fn documents(&self) -> Vec<Document> {
        self.inner.documents.read().await.clone()
    }

    /// While offline, every call fails with `DbError::StorageUnavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, AtomicOrdering::SeqCst);
    }

    /// Delay applied before each call is served. Saturates at `u64::MAX`
    /// nanoseconds.
    pub fn set_latency(&self, latency: Duration) {
        let nanos = u64::try_from(latency.as_nanos()).unwrap_or(u64::MAX);
        self.inner.latency_nanos.store(nanos, AtomicOrdering::SeqCst);
    }

    pub fn latency(&self) -> Duration {
        Duration::from_nanos(self.inner.latency_nanos.load(AtomicOrdering::SeqCst))
    }

    /// Total number of calls received, successful or not.
    pub fn call_count(&self) -> usize {
        self.inner.calls.load(AtomicOrdering::SeqCst)
    }

    async fn begin(&self, session: Option<&mut MemorySession>) -> Result<(), DbError> {
        self.inner.calls.fetch_add(1, AtomicOrdering::SeqCst);
        if let Some(session) = session {
            session.operations += 1;
        }

        let latency = self.latency();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if self.inner.offline.load(AtomicOrdering::SeqCst) {
            return Err(DbError::StorageUnavailable(
                "memory collection is offline".into(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ListCollection for MemoryCollection {
    type Session = MemorySession;

    async fn insert_document(
        &self,
        doc: Document,
        session: Option<&mut MemorySession>,
    ) -> Result<Bson, DbError> {
        self.begin(session).await?;

        // Like the server, put a generated `_id` first. Caller-supplied ids
        // are kept as-is and not checked for uniqueness.
        let (id, stored) = match doc.get("_id").cloned() {
            Some(id) => (id, doc),
            None => {
                let id = Bson::ObjectId(ObjectId::new());
                let mut stored = Document::new();
                stored.insert("_id", id.clone());
                for (key, value) in doc {
                    stored.insert(key, value);
                }
                (id, stored)
            }
        };

        self.inner.documents.write().await.push(stored);
        Ok(id)
    }

    async fn find_documents<'a>(
        &'a self,
        query: FindQuery,
        session: Option<&'a mut MemorySession>,
    ) -> Result<DocumentStream<'a>, DbError> {
        self.begin(session).await?;

        let sort_keys = sort_keys(&query.sort)?;
        let mut matched = Vec::new();
        for doc in self.inner.documents.read().await.iter() {
            if matches_filter(doc, &query.filter)? {
                matched.push(doc.clone());
            }
        }

        matched.sort_by(|a, b| compare_by(a, b, &sort_keys));

        let projected = matched
            .iter()
            .map(|doc| project(doc, &query.projection))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(stream::iter(projected.into_iter().map(Ok)).boxed())
    }

    async fn find_document(
        &self,
        filter: Document,
        session: Option<&mut MemorySession>,
    ) -> Result<Option<Document>, DbError> {
        self.begin(session).await?;

        for doc in self.inner.documents.read().await.iter() {
            if matches_filter(doc, &filter)? {
                return Ok(Some(doc.clone()));
            }
        }
        Ok(None)
    }

    async fn delete_document(
        &self,
        filter: Document,
        session: Option<&mut MemorySession>,
    ) -> Result<u64, DbError> {
        self.begin(session).await?;

        let mut documents = self.inner.documents.write().await;
        let mut position = None;
        for (index, doc) in documents.iter().enumerate() {
            if matches_filter(doc, &filter)? {
                position = Some(index);
                break;
            }
        }

        match position {
            Some(index) => {
                documents.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

// ---------------------------------------------------------------------------
// Query evaluation
// ---------------------------------------------------------------------------

fn matches_filter(doc: &Document, filter: &Document) -> Result<bool, DbError> {
    for (key, expected) in filter {
        if key.starts_with('$') || is_operator_document(expected) {
            return Err(DbError::UnsupportedQuery(format!(
                "filter {key}: {expected}"
            )));
        }
        if doc.get(key) != Some(expected) {
            return Ok(false);
        }
    }
    Ok(true)
}

fn is_operator_document(value: &Bson) -> bool {
    matches!(value, Bson::Document(d) if d.keys().any(|k| k.starts_with('$')))
}

fn is_truthy(value: &Bson) -> Option<bool> {
    match value {
        Bson::Int32(n) => Some(*n != 0),
        Bson::Int64(n) => Some(*n != 0),
        Bson::Boolean(b) => Some(*b),
        _ => None,
    }
}

fn project(doc: &Document, projection: &Document) -> Result<Document, DbError> {
    if projection.is_empty() {
        return Ok(doc.clone());
    }

    let mut out = Document::new();
    let keep_id = match projection.get("_id") {
        Some(flag) => is_truthy(flag).ok_or_else(|| {
            DbError::UnsupportedQuery(format!("projection _id: {flag}"))
        })?,
        None => true,
    };
    if keep_id {
        if let Some(id) = doc.get("_id") {
            out.insert("_id", id.clone());
        }
    }

    for (key, spec) in projection {
        if key == "_id" {
            continue;
        }
        match spec {
            Bson::Document(expr) => {
                out.insert(key.as_str(), evaluate(doc, expr)?);
            }
            flag => match is_truthy(flag) {
                Some(true) => {
                    if let Some(value) = doc.get(key) {
                        out.insert(key.as_str(), value.clone());
                    }
                }
                _ => {
                    return Err(DbError::UnsupportedQuery(format!(
                        "projection {key}: {flag}"
                    )))
                }
            },
        }
    }
    Ok(out)
}

fn evaluate(doc: &Document, expr: &Document) -> Result<Bson, DbError> {
    match expr.get("$size") {
        Some(Bson::String(path)) if expr.len() == 1 && path.starts_with('$') => {
            let field = &path[1..];
            match doc.get(field) {
                Some(Bson::Array(values)) => Ok(Bson::Int32(values.len() as i32)),
                _ => Err(DbError::malformed(field, "is not an array")),
            }
        }
        _ => Err(DbError::UnsupportedQuery(format!("expression {expr}"))),
    }
}

fn sort_keys(sort: &Document) -> Result<Vec<(String, bool)>, DbError> {
    sort.iter()
        .map(|(key, direction)| match direction {
            Bson::Int32(1) | Bson::Int64(1) => Ok((key.clone(), true)),
            Bson::Int32(-1) | Bson::Int64(-1) => Ok((key.clone(), false)),
            other => Err(DbError::UnsupportedQuery(format!("sort {key}: {other}"))),
        })
        .collect()
}

fn compare_by(a: &Document, b: &Document, keys: &[(String, bool)]) -> Ordering {
    for (key, ascending) in keys {
        let ordering = compare_values(a.get(key), b.get(key));
        let ordering = if *ascending { ordering } else { ordering.reverse() };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn compare_values(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Bson::String(x)), Some(Bson::String(y))) => x.as_bytes().cmp(y.as_bytes()),
        (Some(x), Some(y)) => match (as_number(x), as_number(y)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
    }
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use mongodb::bson::doc;

    async fn seeded() -> MemoryCollection {
        let collection = MemoryCollection::new();
        for (name, items) in [("beta", 2), ("Alpha", 0), ("alpha", 1)] {
            let items: Vec<Bson> = (0..items)
                .map(|i| Bson::Document(doc! { "id": i.to_string(), "item": "x", "checked": false }))
                .collect();
            collection
                .insert_document(doc! { "name": name, "items": items }, None)
                .await
                .unwrap();
        }
        collection
    }

    #[tokio::test]
    async fn insert_assigns_object_id_first() {
        let collection = MemoryCollection::new();
        let id = collection
            .insert_document(doc! { "name": "a", "items": [] }, None)
            .await
            .unwrap();

        let stored = collection.documents().await;
        assert!(matches!(id, Bson::ObjectId(_)));
        assert_eq!(stored[0].keys().next().map(String::as_str), Some("_id"));
        assert_eq!(stored[0].get("_id"), Some(&id));
    }

    #[tokio::test]
    async fn sort_is_byte_order() {
        let collection = seeded().await;
        let query = FindQuery {
            sort: doc! { "name": 1 },
            ..FindQuery::default()
        };
        let docs: Vec<Document> = collection
            .find_documents(query, None)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        let names: Vec<_> = docs.iter().map(|d| d.get_str("name").unwrap()).collect();
        assert_eq!(names, ["Alpha", "alpha", "beta"]);
    }

    #[tokio::test]
    async fn size_projection_replaces_items() {
        let collection = seeded().await;
        let query = FindQuery {
            projection: doc! { "name": 1, "item_count": { "$size": "$items" } },
            sort: doc! { "name": -1 },
            ..FindQuery::default()
        };
        let docs: Vec<Document> = collection
            .find_documents(query, None)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(docs[0].get_str("name").unwrap(), "beta");
        assert_eq!(docs[0].get_i32("item_count").unwrap(), 2);
        assert!(docs[0].contains_key("_id"));
        assert!(!docs[0].contains_key("items"));
    }

    #[tokio::test]
    async fn unknown_operators_are_rejected() {
        let collection = seeded().await;

        let err = collection
            .find_document(doc! { "name": { "$regex": "a" } }, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UnsupportedQuery(_)));

        let query = FindQuery {
            projection: doc! { "items": 0 },
            ..FindQuery::default()
        };
        let err = collection.find_documents(query, None).await.err().unwrap();
        assert!(matches!(err, DbError::UnsupportedQuery(_)));
    }

    #[tokio::test]
    async fn delete_removes_at_most_one() {
        let collection = MemoryCollection::new();
        collection.insert_raw(doc! { "name": "dup" }).await;
        collection.insert_raw(doc! { "name": "dup" }).await;

        assert_eq!(collection.delete_document(doc! { "name": "dup" }, None).await.unwrap(), 1);
        assert_eq!(collection.documents().await.len(), 1);
        assert_eq!(collection.delete_document(doc! { "name": "nope" }, None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn session_counts_bound_calls() {
        let collection = MemoryCollection::new();
        let mut session = MemorySession::new();

        collection
            .insert_document(doc! { "name": "a" }, Some(&mut session))
            .await
            .unwrap();
        collection.find_document(doc! {}, None).await.unwrap();
        collection
            .delete_document(doc! { "name": "a" }, Some(&mut session))
            .await
            .unwrap();

        assert_eq!(session.operations(), 2);
        assert_eq!(collection.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn sub_millisecond_latency_is_kept() {
        let collection = MemoryCollection::new();
        collection.set_latency(Duration::from_micros(500));
        assert_eq!(collection.latency(), Duration::from_micros(500));

        let started = tokio::time::Instant::now();
        collection.find_document(doc! {}, None).await.unwrap();
        assert!(started.elapsed() >= Duration::from_micros(500));
    }

    #[test]
    fn huge_latency_saturates() {
        let collection = MemoryCollection::new();
        collection.set_latency(Duration::MAX);
        assert_eq!(collection.latency(), Duration::from_nanos(u64::MAX));
    }

    #[tokio::test]
    async fn offline_collection_fails_every_call() {
        let collection = MemoryCollection::new();
        collection.set_offline(true);

        let err = collection.find_document(doc! {}, None).await.unwrap_err();
        assert!(matches!(err, DbError::StorageUnavailable(_)));

        collection.set_offline(false);
        assert!(collection.find_document(doc! {}, None).await.unwrap().is_none());
    }
}
