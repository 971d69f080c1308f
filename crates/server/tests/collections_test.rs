//! # Vector Collection Endpoint Tests
//!
//! Exercises the `/collections` family against a real server. Embeddings come from the
//! harness mock, which returns one fixed vector for every text.

mod common;

use anyhow::Result;
use common::TestApp;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn test_collection_lifecycle() -> Result<()> {
    // Arrange
    let app = TestApp::spawn().await?;

    // --- Create ---
    let response = app
        .client
        .post(app.url("/collections"))
        .json(&json!({ "name": "brand_assets", "metadata": { "owner": "marketing" } }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Value = response.json().await?;
    assert_eq!(created["result"]["name"], "brand_assets");
    assert_eq!(created["result"]["metadata"]["owner"], "marketing");
    assert_eq!(created["result"]["document_count"], 0);

    // --- Duplicate names conflict ---
    let duplicate = app
        .client
        .post(app.url("/collections"))
        .json(&json!({ "name": "brand_assets" }))
        .send()
        .await?;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    // --- List and get ---
    let listed: Value = app
        .client
        .get(app.url("/collections"))
        .send()
        .await?
        .json()
        .await?;
    let names: Vec<&str> = listed["result"]
        .as_array()
        .expect("result should be an array")
        .iter()
        .filter_map(|c| c["name"].as_str())
        .collect();
    assert!(names.contains(&"brand_assets"));

    let fetched = app
        .client
        .get(app.url("/collections/brand_assets"))
        .send()
        .await?;
    assert_eq!(fetched.status(), StatusCode::OK);

    // --- Delete, then it is gone ---
    let deleted: Value = app
        .client
        .delete(app.url("/collections/brand_assets"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(deleted["result"]["deleted"], true);

    let missing = app
        .client
        .get(app.url("/collections/brand_assets"))
        .send()
        .await?;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let missing_delete = app
        .client
        .delete(app.url("/collections/brand_assets"))
        .send()
        .await?;
    assert_eq!(missing_delete.status(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn test_create_collection_requires_a_name() -> Result<()> {
    let app = TestApp::spawn().await?;

    let response = app
        .client
        .post(app.url("/collections"))
        .json(&json!({ "name": "   " }))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await?;
    assert_eq!(body["error"], "Missing required field: name");
    Ok(())
}

#[tokio::test]
async fn test_documents_are_added_once_per_id() -> Result<()> {
    // Arrange
    let app = TestApp::spawn().await?;
    let documents = json!({
        "documents": [
            { "id": "doc-1", "document": "Sunset beach yoga promo", "metadata": { "type": "image" } },
            { "id": "doc-2", "document": "Winter coat launch video", "metadata": { "type": "video" } }
        ]
    });

    // Act: the collection is created on demand by the first insert.
    let first: Value = app
        .client
        .post(app.url("/collections/on_demand/documents"))
        .json(&documents)
        .send()
        .await?
        .json()
        .await?;
    let second: Value = app
        .client
        .post(app.url("/collections/on_demand/documents"))
        .json(&documents)
        .send()
        .await?
        .json()
        .await?;

    // Assert
    assert_eq!(first["result"]["added"], 2);
    assert_eq!(first["result"]["skipped"], 0);
    assert_eq!(first["result"]["ids"], json!(["doc-1", "doc-2"]));
    assert_eq!(second["result"]["added"], 0);
    assert_eq!(second["result"]["skipped"], 2);

    let stored: Value = app
        .client
        .get(app.url("/collections/on_demand/documents"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(stored["result"].as_array().map(Vec::len), Some(2));

    let info: Value = app
        .client
        .get(app.url("/collections/on_demand"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(info["result"]["document_count"], 2);
    Ok(())
}

#[tokio::test]
async fn test_documents_without_ids_get_generated_ids() -> Result<()> {
    let app = TestApp::spawn().await?;

    let response: Value = app
        .client
        .post(app.url("/collections/generated/documents"))
        .json(&json!({ "documents": [{ "document": "No id here" }] }))
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(response["result"]["added"], 1);
    let id = response["result"]["ids"][0].as_str().unwrap_or_default();
    assert!(!id.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_add_documents_rejects_an_empty_batch() -> Result<()> {
    let app = TestApp::spawn().await?;

    let response = app
        .client
        .post(app.url("/collections/anything/documents"))
        .json(&json!({ "documents": [] }))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_query_filters_on_metadata() -> Result<()> {
    // Arrange
    let app = TestApp::spawn().await?;
    app.client
        .post(app.url("/collections/filtered/documents"))
        .json(&json!({
            "documents": [
                { "id": "a", "document": "Beach towel photo", "metadata": { "category": "inspiration" } },
                { "id": "b", "document": "Beach umbrella photo", "metadata": { "category": "campaigns" } },
                { "id": "c", "document": "Beach chair photo", "metadata": { "category": "inspiration" } }
            ]
        }))
        .send()
        .await?;

    // Act
    let response = app
        .client
        .post(app.url("/collections/filtered/query?debug=true"))
        .json(&json!({
            "query_texts": ["beach"],
            "n_results": 5,
            "where": { "category": "inspiration" }
        }))
        .send()
        .await?;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    let results = body["result"].as_array().expect("result should be an array");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["query"], "beach");
    let mut ids: Vec<&str> = results[0]["matches"]
        .as_array()
        .expect("matches should be an array")
        .iter()
        .filter_map(|m| m["id"].as_str())
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, vec!["a", "c"]);
    assert!(results[0]["matches"][0]["score"].is_number());
    assert_eq!(body["debug"]["where"]["category"], "inspiration");
    Ok(())
}

#[tokio::test]
async fn test_query_validation_and_missing_collection() -> Result<()> {
    let app = TestApp::spawn().await?;

    let empty = app
        .client
        .post(app.url("/collections/whatever/query"))
        .json(&json!({ "query_texts": [] }))
        .send()
        .await?;
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

    let missing = app
        .client
        .post(app.url("/collections/never_created/query"))
        .json(&json!({ "query_texts": ["hello"] }))
        .send()
        .await?;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    Ok(())
}
