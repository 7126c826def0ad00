mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{Multipart, TestApp};

#[tokio::test]
async fn one_about_section_per_language() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.admin_token().await?;

    let created = app
        .json(
            Method::POST,
            "/about",
            Some(&token),
            json!({ "lang": "en", "title": "About us", "achievements": [{ "year": 2020, "title": "Founded" }] }),
        )
        .await?;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);

    let duplicate = app
        .multipart(
            Method::POST,
            "/about",
            Some(&token),
            Multipart::new()
                .text("lang", "en")
                .text("title", "Second try")
                .file("image", "portrait.jpg", "image/jpeg", &common::jpeg()),
        )
        .await?;
    assert_eq!(duplicate.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(duplicate.body["errors"].get("lang").is_some());
    assert_eq!(app.files_in("about"), 0);

    let shown = app.get("/about?lang=en", None).await?;
    assert_eq!(shown.status, StatusCode::OK);
    assert_eq!(shown.body["title"], "About us");
    assert_eq!(shown.body["achievements"][0]["title"], "Founded");

    let amharic = app.get("/about?lang=am", None).await?;
    assert_eq!(amharic.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn about_sections_are_updated_and_deleted_by_language() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.admin_token().await?;

    let created = app
        .json(Method::POST, "/about", Some(&token), json!({ "lang": "om", "title": "Waa'ee keenya" }))
        .await?;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    assert_eq!(created.body["lang"], "or");

    let updated = app
        .json(Method::PUT, "/about/or", Some(&token), json!({ "subtitle": "Hojii keenya" }))
        .await?;
    assert_eq!(updated.status, StatusCode::OK, "{}", updated.body);
    assert_eq!(updated.body["title"], "Waa'ee keenya");
    assert_eq!(updated.body["subtitle"], "Hojii keenya");

    let moved = app
        .json(Method::PATCH, "/about/or", Some(&token), json!({ "lang": "am" }))
        .await?;
    assert_eq!(moved.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(moved.body["errors"].get("lang").is_some());
    assert_eq!(app.get("/about?lang=or", None).await?.status, StatusCode::OK);

    let deleted = app.delete("/about/or", Some(&token)).await?;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(app.get("/about?lang=or", None).await?.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn contents_get_a_slug_and_resolve_by_it() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.admin_token().await?;

    let created = app
        .json(
            Method::POST,
            "/contents",
            Some(&token),
            json!({ "type": "page", "lang": "en", "title": "Our Story!" }),
        )
        .await?;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    assert_eq!(created.body["slug"], "our-story");

    let found = app.get("/contents/slug/our-story", None).await?;
    assert_eq!(found.status, StatusCode::OK);
    assert_eq!(found.body["title"], "Our Story!");

    let missing = app.get("/contents/slug/nothing-here", None).await?;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn content_listing_follows_the_request_language() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.admin_token().await?;

    for (lang, title) in [("en", "Welcome"), ("am", "እንኳን ደህና መጡ")] {
        let created = app
            .json(
                Method::POST,
                "/contents",
                Some(&token),
                json!({ "type": "hero", "lang": lang, "title": title, "slug": "welcome" }),
            )
            .await?;
        assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    }

    let default = app.get("/contents", None).await?;
    assert_eq!(default.status, StatusCode::OK);
    let rows = default.body.as_array().expect("array");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["lang"], "en");

    let amharic = app.get("/contents?type=hero&lang=am", None).await?;
    let rows = amharic.body.as_array().expect("array");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["title"], "እንኳን ደህና መጡ");

    let other_type = app.get("/contents?type=page", None).await?;
    assert_eq!(other_type.body, json!([]));
    Ok(())
}
