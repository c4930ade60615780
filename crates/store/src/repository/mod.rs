//! Repositories: one type per collection.
//!
//! Every operation is a single round trip returning `Result<T, DbError>`.
//! No business rules, no retries: failures reach the caller unchanged.

pub mod lists;

pub use lists::{RepositoryConfig, SummaryStream, TodoRepository};
