//! # Media Endpoint Tests
//!
//! Background analysis, uploads to the (mocked) Supabase Storage API and TikTok link
//! resolution through the (mocked) TikWM API.

mod common;

use anyhow::Result;
use common::{TestApp, SUPABASE_BASE, TIKWM_PATH};
use httpmock::Method::{DELETE, GET, POST};
use reqwest::{multipart, StatusCode};
use serde_json::{json, Value};

const CAPTION: &str = "Two friends laughing over iced coffee on a sunny cafe terrace";

#[tokio::test]
async fn test_analyze_queues_captioning() -> Result<()> {
    // Arrange
    let app = TestApp::spawn().await?;
    let media_url = app.mock_media("/media/cafe.png");
    let caption_mock = app.mock_caption(CAPTION);

    // Act
    let response = app
        .client
        .post(app.url("/media/analyze"))
        .json(&json!({ "url": media_url, "type": "image", "name": "cafe.png", "id": "analyzed-1" }))
        .send()
        .await?;

    // Assert
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let accepted: Value = response.json().await?;
    assert_eq!(accepted["accepted"], true);
    assert_eq!(accepted["item_id"], "analyzed-1");

    let job = app
        .wait_for_job(accepted["job_id"].as_str().unwrap_or_default())
        .await?;
    assert_eq!(job["status"], "done");
    assert_eq!(job["outcome"]["outcome"], "indexed");
    assert_eq!(job["outcome"]["summary"], CAPTION);
    assert_eq!(job["outcome"]["captioned"], true);
    caption_mock.assert();
    Ok(())
}

#[tokio::test]
async fn test_analyze_generates_an_id_when_none_is_given() -> Result<()> {
    let app = TestApp::spawn().await?;
    let media_url = app.mock_media("/media/anon.png");
    app.mock_caption(CAPTION);

    let accepted: Value = app
        .client
        .post(app.url("/media/analyze"))
        .json(&json!({ "url": media_url, "type": "image" }))
        .send()
        .await?
        .json()
        .await?;

    let item_id = accepted["item_id"].as_str().unwrap_or_default();
    assert!(uuid::Uuid::parse_str(item_id).is_ok());
    Ok(())
}

#[tokio::test]
async fn test_analyze_validation() -> Result<()> {
    let app = TestApp::spawn().await?;

    let cases = [
        (json!({ "type": "image" }), "Missing required field: url"),
        (
            json!({ "url": "https://cdn.example.com/a.png" }),
            "Missing required field: type",
        ),
    ];
    for (body, message) in cases {
        let response = app
            .client
            .post(app.url("/media/analyze"))
            .json(&body)
            .send()
            .await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: Value = response.json().await?;
        assert_eq!(error["error"], message);
    }

    let invalid = app
        .client
        .post(app.url("/media/analyze"))
        .json(&json!({ "url": "not a url", "type": "video" }))
        .send()
        .await?;
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_upload_stores_the_file_and_returns_its_public_url() -> Result<()> {
    // Arrange
    let app = TestApp::spawn().await?;
    let storage = app.mock_server.mock(|when, then| {
        when.method(POST)
            .path_contains("/supabase/storage/v1/object/content-library/")
            .header("apikey", "test-supabase-key")
            .header("authorization", "Bearer test-supabase-key")
            .header("x-upsert", "false")
            .header("content-type", "image/png");
        then.status(200).json_body(json!({ "Key": "content-library/object" }));
    });
    let part = multipart::Part::bytes(vec![0x89, b'P', b'N', b'G'])
        .file_name("Promo Banner.PNG")
        .mime_str("image/png")?;
    let form = multipart::Form::new().part("file", part);

    // Act
    let response = app
        .client
        .post(app.url("/media/upload"))
        .multipart(form)
        .send()
        .await?;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    storage.assert();
    let url = body["result"]["url"].as_str().unwrap_or_default();
    let public_root = app
        .mock_server
        .url(&format!("{SUPABASE_BASE}/storage/v1/object/public/content-library/"));
    assert!(url.starts_with(&public_root), "unexpected url {url}");
    assert!(url.ends_with(".png"));
    assert_eq!(body["result"]["file_name"], "Promo Banner.PNG");
    assert_eq!(body["result"]["size"], 4);
    Ok(())
}

#[tokio::test]
async fn test_upload_honours_a_custom_bucket() -> Result<()> {
    let app = TestApp::spawn().await?;
    let storage = app.mock_server.mock(|when, then| {
        when.method(POST)
            .path_contains("/supabase/storage/v1/object/campaign-assets/");
        then.status(200).json_body(json!({}));
    });
    let form = multipart::Form::new()
        .text("bucket", "campaign-assets")
        .part(
            "file",
            multipart::Part::bytes(b"video-bytes".to_vec())
                .file_name("clip.mp4")
                .mime_str("video/mp4")?,
        );

    let body: Value = app
        .client
        .post(app.url("/media/upload?debug=true"))
        .multipart(form)
        .send()
        .await?
        .json()
        .await?;

    storage.assert();
    assert!(body["result"]["url"]
        .as_str()
        .unwrap_or_default()
        .contains("/storage/v1/object/public/campaign-assets/"));
    assert_eq!(body["debug"]["bucket"], "campaign-assets");
    Ok(())
}

#[tokio::test]
async fn test_upload_errors() -> Result<()> {
    let app = TestApp::spawn().await?;

    // No file part at all.
    let missing = app
        .client
        .post(app.url("/media/upload"))
        .multipart(multipart::Form::new().text("bucket", "content-library"))
        .send()
        .await?;
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
    let error: Value = missing.json().await?;
    assert_eq!(error["error"], "No file provided");

    // The storage service rejects the object.
    app.mock_server.mock(|when, then| {
        when.method(POST).path_contains("/supabase/storage/v1/object/");
        then.status(403).body("new row violates row-level security policy");
    });
    let rejected = app
        .client
        .post(app.url("/media/upload"))
        .multipart(multipart::Form::new().part(
            "file",
            multipart::Part::bytes(b"x".to_vec()).file_name("a.txt"),
        ))
        .send()
        .await?;
    assert_eq!(rejected.status(), StatusCode::BAD_GATEWAY);
    Ok(())
}

#[tokio::test]
async fn test_deleting_an_item_removes_its_uploaded_media() -> Result<()> {
    // Arrange: an item whose media lives in the store.
    let app = TestApp::spawn().await?;
    let object_path = "/supabase/storage/v1/object/content-library/1700000000000-abcd1234.png";
    let public_url = app.mock_server.url(
        "/supabase/storage/v1/object/public/content-library/1700000000000-abcd1234.png",
    );
    let removal = app.mock_server.mock(|when, then| {
        when.method(DELETE)
            .path(object_path)
            .header("apikey", "test-supabase-key");
        then.status(200).json_body(json!({ "message": "Successfully deleted" }));
    });
    let created: Value = app
        .client
        .post(app.url("/content-items"))
        .json(&json!({ "type": "link", "name": "Stored banner", "url": public_url }))
        .send()
        .await?
        .json()
        .await?;
    let id = created["result"]["item"]["id"].as_str().unwrap_or_default().to_string();
    app.wait_for_job(created["result"]["job_id"].as_str().unwrap_or_default())
        .await?;

    // Act
    let deleted: Value = app
        .client
        .delete(app.url(&format!("/content-items/{id}?debug=true")))
        .send()
        .await?
        .json()
        .await?;

    // Assert
    removal.assert();
    assert_eq!(deleted["result"]["deleted"], true);
    assert_eq!(deleted["debug"]["media_removed"], true);
    Ok(())
}

#[tokio::test]
async fn test_download_resolves_tiktok_links() -> Result<()> {
    // Arrange
    let app = TestApp::spawn().await?;
    let link = "https://www.tiktok.com/@brand/video/7300000000000000000";
    let tikwm = app.mock_server.mock(|when, then| {
        when.method(GET).path(TIKWM_PATH).query_param("url", link);
        then.status(200).json_body(json!({
            "code": 0,
            "msg": "success",
            "data": { "play": "https://cdn.tikwm.com/video.mp4", "cover": "https://cdn.tikwm.com/cover.jpg" }
        }));
    });

    // Act
    let response = app
        .client
        .post(app.url("/media/download"))
        .json(&json!({ "url": link }))
        .send()
        .await?;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    tikwm.assert();
    let video = &body["result"];
    assert_eq!(video["success"], true);
    assert_eq!(video["videoUrl"], "https://cdn.tikwm.com/video.mp4");
    assert_eq!(video["thumbnail"], "https://cdn.tikwm.com/cover.jpg");
    let filename = video["filename"].as_str().unwrap_or_default();
    assert!(filename.starts_with("video_") && filename.ends_with(".mp4"));
    Ok(())
}

#[tokio::test]
async fn test_download_rejections() -> Result<()> {
    let app = TestApp::spawn().await?;
    let tikwm = app.mock_server.mock(|when, then| {
        when.method(GET).path(TIKWM_PATH);
        then.status(200)
            .json_body(json!({ "code": -1, "msg": "Url parsing is failed!" }));
    });

    let cases = [
        ("", "URL is required"),
        (
            "https://www.youtube.com/watch?v=abc",
            "Only Instagram and TikTok URLs are supported",
        ),
        (
            "https://www.instagram.com/reel/Cabc123/",
            "Instagram video download is currently unavailable. Please try uploading the video directly.",
        ),
        (
            "https://www.tiktok.com/@brand/video/1",
            "Failed to download TikTok video",
        ),
    ];
    for (url, message) in cases {
        let response = app
            .client
            .post(app.url("/media/download"))
            .json(&json!({ "url": url }))
            .send()
            .await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "url {url:?}");
        let error: Value = response.json().await?;
        assert_eq!(error["error"], message);
    }

    // Only the TikTok link reached the resolver.
    assert_eq!(tikwm.hits(), 1);
    Ok(())
}
