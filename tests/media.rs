mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use common::{jpeg, png, Multipart, TestApp, MEDIA_URL};

fn urls(value: &Value) -> Vec<Value> {
    value.as_array().cloned().unwrap_or_default()
}

#[tokio::test]
async fn gallery_images_are_stored_replaced_and_removed_with_the_row() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.admin_token().await?;

    let created = app
        .multipart(
            Method::POST,
            "/galleries",
            Some(&token),
            Multipart::new()
                .text("title_en", "Festival night")
                .file("cover_image", "cover.png", "image/png", &png())
                .file("images[]", "one.jpg", "image/jpeg", &jpeg())
                .file("images[]", "two.jpg", "image/jpeg", &jpeg()),
        )
        .await?;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    let id = created.body["id"].as_i64().unwrap();
    let cover = created.body["cover_image"].clone();
    let images = urls(&created.body["images"]);
    assert_eq!(images.len(), 2);
    assert!(cover.as_str().unwrap().starts_with(MEDIA_URL));
    assert!(app.stored(&cover));
    assert!(images.iter().all(|url| app.stored(url)));

    let first_path = created.body["image_paths"][0].as_str().unwrap().to_string();
    let updated = app
        .multipart(
            Method::PATCH,
            &format!("/galleries/{id}"),
            Some(&token),
            Multipart::new()
                .text("remove_images[]", &first_path)
                .file("images[]", "three.jpg", "image/jpeg", &jpeg())
                .file("cover_image", "cover.jpg", "image/jpeg", &jpeg()),
        )
        .await?;
    assert_eq!(updated.status, StatusCode::OK, "{}", updated.body);
    let after = urls(&updated.body["images"]);
    assert_eq!(after.len(), 2);
    assert_eq!(after[0], images[1]);
    assert!(!app.stored(&images[0]));
    assert!(!app.stored(&cover));
    assert!(app.stored(&updated.body["cover_image"]));

    let deleted = app.delete(&format!("/galleries/{id}"), Some(&token)).await?;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(app.files_in("galleries/images"), 0);
    assert_eq!(app.files_in("galleries/covers"), 0);
    Ok(())
}

#[tokio::test]
async fn a_rejected_upload_leaves_no_row_and_no_file() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.admin_token().await?;

    let rejected = app
        .multipart(
            Method::POST,
            "/galleries",
            Some(&token),
            Multipart::new()
                .text("title_en", "Broken")
                .file("images[]", "fine.jpg", "image/jpeg", &jpeg())
                .file("images[]", "notes.txt", "text/plain", b"not an image"),
        )
        .await?;
    assert_eq!(rejected.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(rejected.body["errors"].get("images.1").is_some(), "{}", rejected.body);
    assert_eq!(app.files_in("galleries/images"), 0);
    assert_eq!(app.get("/galleries", None).await?.body, json!([]));
    Ok(())
}

#[tokio::test]
async fn videos_are_uploaded_or_linked() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.admin_token().await?;

    let uploaded = app
        .multipart(
            Method::POST,
            "/videos",
            Some(&token),
            Multipart::new()
                .text("title_en", "Showreel")
                .file("video", "reel.mp4", "video/mp4", b"\0\0\0\x18ftypmp42"),
        )
        .await?;
    assert_eq!(uploaded.status, StatusCode::CREATED, "{}", uploaded.body);
    assert_eq!(uploaded.body["source_type"], "local");
    assert!(app.stored(&uploaded.body["source_url"]));

    let linked = app
        .json(
            Method::POST,
            "/videos",
            Some(&token),
            json!({ "title_en": "Interview", "source_url": "https://www.youtube.com/watch?v=abc123" }),
        )
        .await?;
    assert_eq!(linked.status, StatusCode::CREATED, "{}", linked.body);
    assert_eq!(linked.body["source_type"], "external");
    assert_eq!(linked.body["source_url"], "https://www.youtube.com/watch?v=abc123");

    let id = uploaded.body["id"].as_i64().unwrap();
    let local = uploaded.body["source_url"].clone();
    let switched = app
        .json(
            Method::PATCH,
            &format!("/videos/{id}"),
            Some(&token),
            json!({ "source_url": "https://vimeo.com/42" }),
        )
        .await?;
    assert_eq!(switched.status, StatusCode::OK, "{}", switched.body);
    assert_eq!(switched.body["source_type"], "external");
    assert!(!app.stored(&local));
    Ok(())
}

#[tokio::test]
async fn deleting_a_talent_removes_application_photos() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.admin_token().await?;

    let talent = app
        .json(
            Method::POST,
            "/talents",
            Some(&token),
            json!({ "title_en": "Casting call", "deadline": "2026-12-31" }),
        )
        .await?;
    assert_eq!(talent.status, StatusCode::CREATED, "{}", talent.body);
    assert_eq!(talent.body["status"], "open");
    let id = talent.body["id"].as_i64().unwrap();

    let applied = app
        .multipart(
            Method::POST,
            &format!("/talents/{id}/applications"),
            None,
            Multipart::new()
                .text("full_name", "Hana Bekele")
                .text("email", "hana@example.com")
                .file("photo", "headshot.jpg", "image/jpeg", &jpeg()),
        )
        .await?;
    assert_eq!(applied.status, StatusCode::CREATED, "{}", applied.body);
    assert!(app.stored(&applied.body["data"]["photo"]));

    let listed = app
        .get(&format!("/talents/{id}/applications"), Some(&token))
        .await?;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.body["total_items"], 1);

    let deleted = app.delete(&format!("/talents/{id}"), Some(&token)).await?;
    assert_eq!(deleted.status, StatusCode::OK);
    assert!(!app.stored(&applied.body["data"]["photo"]));
    assert_eq!(app.files_in("talents/applications"), 0);
    Ok(())
}

#[tokio::test]
async fn closed_talent_calls_refuse_applications() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.admin_token().await?;

    let talent = app
        .json(
            Method::POST,
            "/talents",
            Some(&token),
            json!({ "title_en": "Archived call", "status": "closed" }),
        )
        .await?;
    let id = talent.body["id"].as_i64().unwrap();

    let applied = app
        .json(
            Method::POST,
            &format!("/talents/{id}/applications"),
            None,
            json!({ "full_name": "Late Applicant", "email": "late@example.com" }),
        )
        .await?;
    assert_eq!(applied.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(applied.body["errors"].get("talent").is_some());
    Ok(())
}
