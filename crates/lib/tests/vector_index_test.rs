//! # Vector Index Tests
//!
//! Exercises `SqliteVectorIndex` with the deterministic bag-of-words embedder, so texts
//! that share words rank as similar.

mod common;

use adintel::{
    errors::ProviderError,
    providers::vector::{NewDocument, QueryResult, SqliteVectorIndex, VectorIndex},
};
use adintel_test_utils::{MockEmbedder, TestSetup};
use anyhow::Result;
use serde_json::{json, Map, Value};

fn doc(id: &str, text: &str, metadata: Value) -> NewDocument {
    NewDocument {
        id: Some(id.to_string()),
        document: text.to_string(),
        metadata: metadata.as_object().cloned().unwrap_or_default(),
    }
}

async fn seeded_index(setup: &TestSetup) -> Result<SqliteVectorIndex> {
    let index = setup.vector_index();
    index
        .add_documents(
            "library",
            vec![
                doc(
                    "shoes",
                    "red running shoes on a stadium track",
                    json!({ "type": "image", "category": "inspiration" }),
                ),
                doc(
                    "mug",
                    "blue ceramic coffee mug on a desk",
                    json!({ "type": "image", "category": "content-library" }),
                ),
                doc(
                    "socks",
                    "running socks in red and white stripes",
                    json!({ "type": "video", "category": "inspiration" }),
                ),
            ],
        )
        .await?;
    Ok(index)
}

#[tokio::test]
async fn test_collection_lifecycle() -> Result<()> {
    common::setup_tracing();
    // Arrange
    let setup = TestSetup::new().await?;
    let index = setup.vector_index();

    // Act
    let created = index
        .create_collection("brand", Some(json!({ "owner": "growth" })))
        .await?;
    let duplicate = index.create_collection("brand", None).await;

    // Assert
    assert_eq!(created.name, "brand");
    assert_eq!(created.metadata, Some(json!({ "owner": "growth" })));
    assert_eq!(created.document_count, 0);
    assert!(matches!(duplicate, Err(ProviderError::AlreadyExists(_))));

    let names: Vec<String> = index
        .list_collections()
        .await?
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["brand".to_string()]);

    assert!(index.delete_collection("brand").await?);
    assert!(index.get_collection("brand").await?.is_none());
    assert!(!index.delete_collection("brand").await?);
    Ok(())
}

#[tokio::test]
async fn test_documents_are_inserted_once_per_id() -> Result<()> {
    common::setup_tracing();
    // Arrange
    let setup = TestSetup::new().await?;
    let embedder = MockEmbedder::default();
    let index = SqliteVectorIndex::new(setup.db.clone(), Box::new(embedder.clone()));
    let batch = vec![
        doc("a", "first document", json!({})),
        doc("b", "second document", json!({})),
    ];

    // Act
    let first = index.add_documents("on_demand", batch.clone()).await?;
    let second = index.add_documents("on_demand", batch).await?;

    // Assert
    assert_eq!(first.added, 2);
    assert_eq!(first.ids, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(second.added, 0);
    assert_eq!(second.skipped, 2);
    assert!(second.ids.is_empty());
    // Duplicates are detected before embedding.
    assert_eq!(embedder.calls().len(), 2);

    let info = index.get_collection("on_demand").await?.expect("created on demand");
    assert_eq!(info.document_count, 2);
    Ok(())
}

#[tokio::test]
async fn test_documents_without_ids_get_generated_ones() -> Result<()> {
    common::setup_tracing();
    let setup = TestSetup::new().await?;
    let index = setup.vector_index();

    let result = index
        .add_documents(
            "generated",
            vec![NewDocument {
                id: None,
                document: "no id".to_string(),
                metadata: Map::new(),
            }],
        )
        .await?;

    assert_eq!(result.added, 1);
    let id = &result.ids[0];
    assert!(index.document_exists("generated", id).await?);
    Ok(())
}

#[tokio::test]
async fn test_query_ranks_by_similarity() -> Result<()> {
    common::setup_tracing();
    let setup = TestSetup::new().await?;
    let index = seeded_index(&setup).await?;

    let results = index
        .query("library", &["red running shoes".to_string()], 2, None)
        .await?;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].query, "red running shoes");
    let matches = &results[0].matches;
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].id, "shoes");
    assert_eq!(matches[1].id, "socks");
    let top = matches[0].score.unwrap_or_default();
    let next = matches[1].score.unwrap_or_default();
    assert!(top >= next);
    assert!(top > 0.0);
    Ok(())
}

#[tokio::test]
async fn test_query_applies_the_metadata_filter() -> Result<()> {
    common::setup_tracing();
    let setup = TestSetup::new().await?;
    let index = seeded_index(&setup).await?;
    let filter = json!({ "category": "inspiration", "type": "video" });

    let results = index
        .query(
            "library",
            &["coffee".to_string(), "red".to_string()],
            10,
            filter.as_object(),
        )
        .await?;

    // One result set per query text, each restricted to the filter.
    assert_eq!(results.len(), 2);
    for result in &results {
        let ids: Vec<&str> = result.matches.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["socks"]);
    }
    Ok(())
}

#[tokio::test]
async fn test_blank_query_returns_unscored_documents() -> Result<()> {
    common::setup_tracing();
    let setup = TestSetup::new().await?;
    let index = seeded_index(&setup).await?;

    let results = index.query("library", &[" ".to_string()], 2, None).await?;

    assert_eq!(results[0].matches.len(), 2);
    assert!(results[0].matches.iter().all(|m| m.score.is_none()));
    Ok(())
}

#[tokio::test]
async fn test_missing_collections_are_not_found() -> Result<()> {
    common::setup_tracing();
    let setup = TestSetup::new().await?;
    let index = setup.vector_index();

    let query = index
        .query("ghost", &["anything".to_string()], 5, None)
        .await;
    let documents = index.get_documents("ghost").await;

    assert!(matches!(query, Err(ProviderError::NotFound(_))));
    assert!(matches!(documents, Err(ProviderError::NotFound(_))));
    assert!(!index.document_exists("ghost", "x").await?);
    Ok(())
}

#[tokio::test]
async fn test_delete_document() -> Result<()> {
    common::setup_tracing();
    let setup = TestSetup::new().await?;
    let index = seeded_index(&setup).await?;

    assert!(index.delete_document("library", "mug").await?);
    assert!(!index.delete_document("library", "mug").await?);

    let remaining: Vec<String> = index
        .get_documents("library")
        .await?
        .into_iter()
        .map(|d| d.id)
        .collect();
    assert_eq!(remaining.len(), 2);
    assert!(!remaining.contains(&"mug".to_string()));

    // Collections are removed together with their documents.
    assert!(index.delete_collection("library").await?);
    assert!(!index.document_exists("library", "shoes").await?);
    Ok(())
}

#[tokio::test]
async fn test_filter_compares_booleans_and_numbers() -> Result<()> {
    common::setup_tracing();
    let setup = TestSetup::new().await?;
    let index = setup.vector_index();
    index
        .add_documents(
            "typed",
            vec![
                doc("with", "summer launch", json!({ "hasMedia": true, "rank": 1 })),
                doc("without", "summer launch copy", json!({ "hasMedia": false, "rank": 2 })),
            ],
        )
        .await?;

    let with_media = json!({ "hasMedia": true });
    let second = json!({ "rank": 2 });
    let by_flag = index
        .query("typed", &["summer".to_string()], 10, with_media.as_object())
        .await?;
    let by_rank = index
        .query("typed", &[String::new()], 10, second.as_object())
        .await?;

    let ids = |results: &[QueryResult]| -> Vec<String> {
        results[0].matches.iter().map(|m| m.id.clone()).collect()
    };
    assert_eq!(ids(&by_flag), vec!["with".to_string()]);
    assert_eq!(ids(&by_rank), vec!["without".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_inserts_of_one_id_store_a_single_document() -> Result<()> {
    common::setup_tracing();
    let setup = TestSetup::new().await?;
    let index = setup.vector_index();
    let batch = vec![doc("launch", "launch teaser", json!({ "type": "image" }))];

    let (first, second) = tokio::join!(
        index.add_documents("race", batch.clone()),
        index.add_documents("race", batch)
    );
    let (first, second) = (first?, second?);

    assert_eq!(first.added + second.added, 1);
    assert_eq!(first.skipped + second.skipped, 1);
    assert_eq!(index.get_documents("race").await?.len(), 1);
    Ok(())
}
