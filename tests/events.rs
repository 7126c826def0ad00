mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn event_lifecycle_projects_lists_and_keeps_every_language_in_detail() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.admin_token().await?;

    let created = app
        .json(
            Method::POST,
            "/events",
            Some(&token),
            json!({
                "title_en": "Launch",
                "title_am": "ማስጀመሪያ",
                "title_or": "Eegalcha",
                "type": "upcoming",
                "date": "2026-11-02",
                "time": "18:30",
                "location": "Addis Ababa",
            }),
        )
        .await?;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    assert_eq!(created.body["title"], json!({ "en": "Launch", "am": "ማስጀመሪያ", "or": "Eegalcha" }));
    let id = created.body["id"].as_i64().unwrap();

    let amharic = app.get("/events?lang=am", None).await?;
    assert_eq!(amharic.status, StatusCode::OK);
    assert_eq!(amharic.body[0]["title"], "ማስጀመሪያ");

    let oromo = app.get("/events?lang=om", None).await?;
    assert_eq!(oromo.body[0]["title"], "Eegalcha");

    let english = app.get("/events", None).await?;
    assert_eq!(english.body[0]["title"], "Launch");

    let updated = app
        .json(
            Method::PATCH,
            &format!("/events/{id}"),
            Some(&token),
            json!({ "location": "Adama" }),
        )
        .await?;
    assert_eq!(updated.status, StatusCode::OK, "{}", updated.body);
    assert_eq!(updated.body["location"], "Adama");
    assert_eq!(updated.body["title"]["am"], "ማስጀመሪያ");

    let deleted = app.delete(&format!("/events/{id}"), Some(&token)).await?;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["message"], "Event deleted successfully");

    let gone = app.get(&format!("/events/{id}"), None).await?;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    assert_eq!(gone.body["message"], "Event not found");
    Ok(())
}

#[tokio::test]
async fn put_with_one_title_leaves_the_other_fields_alone() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.admin_token().await?;

    let created = app
        .json(
            Method::POST,
            "/events",
            Some(&token),
            json!({
                "title_en": "Launch",
                "title_am": "ማስጀመሪያ",
                "title_or": "Eegalcha",
                "type": "upcoming",
                "date": "2026-11-02",
                "location": "Addis Ababa",
            }),
        )
        .await?;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    let id = created.body["id"].as_i64().unwrap();

    let updated = app
        .json(
            Method::PUT,
            &format!("/events/{id}"),
            Some(&token),
            json!({ "title_en": "Album launch" }),
        )
        .await?;
    assert_eq!(updated.status, StatusCode::OK, "{}", updated.body);

    let shown = app.get(&format!("/events/{id}"), None).await?;
    assert_eq!(shown.body["title"]["en"], "Album launch");
    assert_eq!(shown.body["title"]["am"], "ማስጀመሪያ");
    assert_eq!(shown.body["title"]["or"], "Eegalcha");
    assert_eq!(shown.body["location"], "Addis Ababa");
    assert_eq!(shown.body["date"], "2026-11-02");
    assert_eq!(shown.body["type"], "upcoming");
    Ok(())
}

#[tokio::test]
async fn missing_translation_is_null_rather_than_english() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.admin_token().await?;

    let created = app
        .json(
            Method::POST,
            "/events",
            Some(&token),
            json!({ "title_en": "Workshop", "type": "past", "date": "2025-03-01" }),
        )
        .await?;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);

    let listed = app.get("/events?lang=or", None).await?;
    assert!(listed.body[0]["title"].is_null());
    Ok(())
}

#[tokio::test]
async fn every_failing_field_is_reported_and_nothing_is_written() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.admin_token().await?;

    let rejected = app
        .json(
            Method::POST,
            "/events",
            Some(&token),
            json!({ "type": "someday", "time": "late" }),
        )
        .await?;
    assert_eq!(rejected.status, StatusCode::UNPROCESSABLE_ENTITY);
    let errors = &rejected.body["errors"];
    for field in ["title_en", "type", "date", "time"] {
        assert!(errors.get(field).is_some(), "missing error for {field}: {errors}");
    }
    assert_eq!(errors["date"], json!(["The date field is required."]));

    let listed = app.get("/events", None).await?;
    assert_eq!(listed.body, json!([]));
    Ok(())
}

#[tokio::test]
async fn type_filter_and_unknown_language() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.admin_token().await?;

    for (title, kind) in [("Next", "upcoming"), ("Last", "past")] {
        let res = app
            .json(
                Method::POST,
                "/events",
                Some(&token),
                json!({ "title_en": title, "type": kind, "date": "2025-06-01" }),
            )
            .await?;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    }

    let past = app.get("/events?type=past", None).await?;
    assert_eq!(past.body.as_array().unwrap().len(), 1);
    assert_eq!(past.body[0]["title"], "Last");

    let unknown = app.get("/events?lang=fr", None).await?;
    assert_eq!(unknown.status, StatusCode::UNPROCESSABLE_ENTITY);
    Ok(())
}

#[tokio::test]
async fn reads_are_public_but_writes_need_a_token() -> Result<()> {
    let app = TestApp::spawn().await?;

    let listed = app.get("/events", None).await?;
    assert_eq!(listed.status, StatusCode::OK);

    let anonymous = app
        .json(
            Method::POST,
            "/events",
            None,
            json!({ "title_en": "Nope", "type": "past", "date": "2025-06-01" }),
        )
        .await?;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

fn launch(image: Vec<u8>) -> common::Multipart {
    common::Multipart::new()
        .text("title_en", "Launch")
        .text("title_am", "ማስጀመሪያ")
        .text("title_or", "Eegalcha")
        .text("type", "upcoming")
        .text("location", "Addis Ababa")
        .text("date", "2025-01-01")
        .text("time", "18:00")
        .file("image", "poster.jpg", "image/jpeg", &image)
}

fn jpeg_of(size: usize) -> Vec<u8> {
    let mut data = common::jpeg();
    data.resize(size, 0);
    data
}

#[tokio::test]
async fn event_image_is_served_and_removed_with_the_event() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.admin_token().await?;

    let created = app
        .multipart(Method::POST, "/events", Some(&token), launch(jpeg_of(2 * 1024 * 1024)))
        .await?;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    let id = created.body["id"].as_i64().unwrap();
    let image = created.body["image"].clone();
    assert!(app.stored(&image));

    let listed = app.get("/events?lang=en", None).await?;
    assert_eq!(listed.body[0]["title"], "Launch");
    assert_eq!(listed.body[0]["type"], "upcoming");
    assert_eq!(listed.body[0]["image"], image);

    let renamed = app
        .json(Method::PUT, &format!("/events/{id}"), Some(&token), json!({ "title_en": "Launch v2" }))
        .await?;
    assert_eq!(renamed.status, StatusCode::OK, "{}", renamed.body);
    assert_eq!(renamed.body["title"]["en"], "Launch v2");
    assert_eq!(renamed.body["title"]["am"], "ማስጀመሪያ");
    assert_eq!(renamed.body["location"], "Addis Ababa");
    assert_eq!(renamed.body["date"], "2025-01-01");
    assert_eq!(renamed.body["image"], image);

    app.delete(&format!("/events/{id}"), Some(&token)).await?;
    assert!(!app.stored(&image));
    Ok(())
}

#[tokio::test]
async fn oversized_image_is_rejected_before_anything_is_written() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.admin_token().await?;

    let rejected = app
        .multipart(Method::POST, "/events", Some(&token), launch(jpeg_of(5 * 1024 * 1024)))
        .await?;
    assert_eq!(rejected.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        rejected.body["errors"]["image"],
        json!(["The image must not be greater than 2048 kilobytes."])
    );
    assert_eq!(app.files_in("events"), 0);
    assert_eq!(app.get("/events", None).await?.body, json!([]));
    Ok(())
}
