//! Repository tests against a live MongoDB server.
//!
//! Enabled with `--features integration`; the server is taken from
//! `MONGODB_URI` (default `mongodb://localhost:27017`). Each test works in a
//! throwaway collection that is dropped afterwards.

#![cfg(feature = "integration")]

use mongodb::bson::oid::ObjectId;
use mongodb::bson::Document;
use mongodb::{Client, Collection};
use todo_store::{client, DbError, StoreConfig, TodoRepository};

async fn scratch_repository() -> (TodoRepository, Collection<Document>, Client) {
    let config = StoreConfig {
        uri: std::env::var("MONGODB_URI").unwrap_or_else(|_| StoreConfig::default().uri),
        database: "todo_store_it".into(),
        collection: format!("lists_{}", ObjectId::new().to_hex()),
        ..StoreConfig::default()
    };
    let client = client::connect(&config).await.expect("client options should parse");
    let database = client.database(&config.database);
    client::ping(&database).await.expect("MongoDB should be reachable");

    let repo = TodoRepository::from_database(&database, &config);
    let collection = database.collection::<Document>(&config.collection);
    (repo, collection, client)
}

#[tokio::test]
async fn groceries_lifecycle_against_mongodb() {
    let (repo, collection, _client) = scratch_repository().await;

    let id = repo.create_list("Groceries", None).await.unwrap();
    let list = repo.get_list(&id, None).await.unwrap();
    assert_eq!(list.name, "Groceries");
    assert!(list.items.is_empty());

    let summaries = repo.collect_summaries(None).await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].item_count, 0);

    assert!(repo.delete_list(&id, None).await.unwrap());
    assert!(!repo.delete_list(&id, None).await.unwrap());
    assert!(matches!(
        repo.get_list(&id, None).await.unwrap_err(),
        DbError::NotFound(_)
    ));

    collection.drop().await.unwrap();
}

#[tokio::test]
async fn summaries_sorted_by_name_against_mongodb() {
    let (repo, collection, _client) = scratch_repository().await;

    for name in ["b", "B", "a"] {
        repo.create_list(name, None).await.unwrap();
    }
    let names: Vec<String> = repo
        .collect_summaries(None)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(names, ["B", "a", "b"]);

    collection.drop().await.unwrap();
}

#[tokio::test]
async fn session_is_threaded_through_against_mongodb() {
    let (repo, collection, client) = scratch_repository().await;
    let mut session = client.start_session().await.unwrap();

    let id = repo.create_list("in-session", Some(&mut session)).await.unwrap();
    let list = repo.get_list(&id, Some(&mut session)).await.unwrap();
    assert_eq!(list.id, id);
    let summaries = repo.collect_summaries(Some(&mut session)).await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert!(repo.delete_list(&id, Some(&mut session)).await.unwrap());

    collection.drop().await.unwrap();
}
