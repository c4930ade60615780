//! `ListCollection` for a MongoDB collection handle.
//!
//! `mongodb::Collection` is an `Arc`-backed handle: cloning it is cheap and
//! all clones share the client's connection pool.

use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use mongodb::bson::{Bson, Document};
use mongodb::{ClientSession, Collection};

use super::{DocumentStream, FindQuery, ListCollection};
use crate::DbError;

#[async_trait]
impl ListCollection for Collection<Document> {
    type Session = ClientSession;

    async fn insert_document(
        &self,
        doc: Document,
        session: Option<&mut ClientSession>,
    ) -> Result<Bson, DbError> {
        let action = self.insert_one(doc);
        let result = match session {
            Some(session) => action.session(session).await?,
            None => action.await?,
        };
        Ok(result.inserted_id)
    }

    async fn find_documents<'a>(
        &'a self,
        query: FindQuery,
        session: Option<&'a mut ClientSession>,
    ) -> Result<DocumentStream<'a>, DbError> {
        let FindQuery { filter, projection, sort } = query;

        let mut action = self.find(filter);
        if !projection.is_empty() {
            action = action.projection(projection);
        }
        if !sort.is_empty() {
            action = action.sort(sort);
        }

        match session {
            None => {
                let cursor = action.await?;
                Ok(cursor.map_err(DbError::from).boxed())
            }
            Some(session) => {
                // A session cursor has to be advanced with the same session
                // that opened it, so the stream carries both.
                let cursor = action.session(&mut *session).await?;
                let documents = stream::unfold((cursor, session), |(mut cursor, session)| async move {
                    let next = cursor.next(&mut *session).await?;
                    Some((next.map_err(DbError::from), (cursor, session)))
                });
                Ok(documents.boxed())
            }
        }
    }

    async fn find_document(
        &self,
        filter: Document,
        session: Option<&mut ClientSession>,
    ) -> Result<Option<Document>, DbError> {
        let action = self.find_one(filter);
        let found = match session {
            Some(session) => action.session(session).await?,
            None => action.await?,
        };
        Ok(found)
    }

    async fn delete_document(
        &self,
        filter: Document,
        session: Option<&mut ClientSession>,
    ) -> Result<u64, DbError> {
        let action = self.delete_one(filter);
        let result = match session {
            Some(session) => action.session(session).await?,
            None => action.await?,
        };
        Ok(result.deleted_count)
    }
}
