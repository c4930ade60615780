//! `todo-store` crate: persistence layer for to-do lists kept in MongoDB.
//!
//! Provides typed records for the stored list documents, the
//! [`ListCollection`] storage contract (with MongoDB and in-memory bindings),
//! and [`TodoRepository`] for whole-list create/enumerate/read/delete.
//! No business logic lives here.

pub mod client;
pub mod collection;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;

pub use collection::{ListCollection, MemoryCollection, MemorySession};
pub use config::StoreConfig;
pub use error::DbError;
pub use models::{ListItem, ListSummary, TodoList};
pub use repository::{RepositoryConfig, SummaryStream, TodoRepository};
