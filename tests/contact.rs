mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn visitors_submit_and_staff_work_the_inbox() -> Result<()> {
    let app = TestApp::spawn().await?;

    for n in 1..=3 {
        let sent = app
            .json(
                Method::POST,
                "/contact",
                None,
                json!({
                    "name": format!("Visitor {n}"),
                    "email": format!("visitor{n}@example.com"),
                    "subject": "Booking",
                    "message": "Are you available in December?",
                }),
            )
            .await?;
        assert_eq!(sent.status, StatusCode::CREATED, "{}", sent.body);
    }

    assert_eq!(app.get("/contact", None).await?.status, StatusCode::UNAUTHORIZED);

    let token = app.admin_token().await?;
    let page = app.get("/contact?limit=2", Some(&token)).await?;
    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(page.body["total_items"], 3);
    assert_eq!(page.body["total_pages"], 2);
    assert_eq!(page.body["data"].as_array().unwrap().len(), 2);

    let id = page.body["data"][0]["id"].as_i64().unwrap();
    let read = app
        .json(Method::PATCH, &format!("/contact/{id}"), Some(&token), json!({}))
        .await?;
    assert_eq!(read.status, StatusCode::OK, "{}", read.body);

    let unread = app.get("/contact?unread=true", Some(&token)).await?;
    assert_eq!(unread.body["total_items"], 2);

    let deleted = app.delete(&format!("/contact/{id}"), Some(&token)).await?;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(
        app.get(&format!("/contact/{id}"), Some(&token)).await?.status,
        StatusCode::NOT_FOUND
    );
    Ok(())
}

#[tokio::test]
async fn incomplete_messages_are_rejected() -> Result<()> {
    let app = TestApp::spawn().await?;

    let res = app
        .json(Method::POST, "/contact", None, json!({ "email": "not-an-email" }))
        .await?;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    for field in ["name", "email", "message"] {
        assert!(res.body["errors"].get(field).is_some(), "{}", res.body);
    }
    Ok(())
}
