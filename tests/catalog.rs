mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use common::TestApp;

async fn create(app: &TestApp, token: &str, path: &str, body: Value) -> Result<()> {
    let created = app.json(Method::POST, path, Some(token), body).await?;
    anyhow::ensure!(
        created.status == StatusCode::CREATED,
        "POST {path} failed: {}",
        created.body
    );
    Ok(())
}

fn column(body: &Value, key: &str) -> Vec<Value> {
    body.as_array()
        .map(|rows| rows.iter().map(|row| row[key].clone()).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn services_and_projects_follow_sort_order() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.admin_token().await?;

    for (title, order) in [("Mastering", 3), ("Recording", 1), ("Mixing", 2)] {
        create(&app, &token, "/services", json!({ "title_en": title, "sort_order": order })).await?;
        create(&app, &token, "/projects", json!({ "title_en": title, "sort_order": order })).await?;
    }

    let services = app.get("/services", None).await?;
    assert_eq!(services.status, StatusCode::OK);
    assert_eq!(column(&services.body, "title"), vec![json!("Recording"), json!("Mixing"), json!("Mastering")]);

    let projects = app.get("/projects", None).await?;
    assert_eq!(column(&projects.body, "sort_order"), vec![json!(1), json!(2), json!(3)]);
    Ok(())
}

#[tokio::test]
async fn awards_list_newest_first_and_filter_by_year() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.admin_token().await?;

    for year in [2015, 2021, 2018] {
        create(
            &app,
            &token,
            "/awards",
            json!({
                "title_en": format!("Award {year}"),
                "title_am": format!("ሽልማት {year}"),
                "title_or": format!("Badhaasa {year}"),
                "year": year,
            }),
        )
        .await?;
    }

    let awards = app.get("/awards", None).await?;
    assert_eq!(column(&awards.body, "year"), vec![json!(2021), json!(2018), json!(2015)]);

    let oromo = app.get("/awards?year=2018&lang=or", None).await?;
    assert_eq!(column(&oromo.body, "title"), vec![json!("Badhaasa 2018")]);

    let partial = app
        .json(Method::POST, "/awards", Some(&token), json!({ "title_en": "Only English" }))
        .await?;
    assert_eq!(partial.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(partial.body["errors"].get("title_am").is_some());
    assert!(partial.body["errors"].get("title_or").is_some());
    Ok(())
}
