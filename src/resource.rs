//! Generic CRUD over localized records with managed media.
//!
//! Each content type implements [`Resource`]; [`routes`] turns that into the
//! uniform REST surface:
//!
//! | Verb        | Path            | Handler   |
//! |-------------|-----------------|-----------|
//! | GET         | `/{path}`       | [`index`] |
//! | GET         | `/{path}/{id}`  | [`show`]  |
//! | POST        | `/{path}`       | [`store`] |
//! | PUT / PATCH | `/{path}/{id}`  | [`update`]|
//! | DELETE      | `/{path}/{id}`  | [`destroy`]|
//!
//! Payload rules are checked in full before any file is stored or any row is
//! written. Files are staged first; the row write then either commits (and
//! the files the row no longer references are removed) or fails (and the
//! freshly staged files are removed).

use async_trait::async_trait;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use chrono::{NaiveDateTime, Utc};
use sea_orm::{ActiveValue, DatabaseConnection, DbErr, Set};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use utoipa::{
    openapi::path::{Parameter, ParameterIn},
    IntoParams,
};

use crate::error::{AppError, AppResult};
use crate::i18n::{Lang, LocalizedDraft, RequestLang};
use crate::middleware::auth::AuthContext;
use crate::services::auth::CONTENT_MANAGE;
use crate::services::media::{MediaRef, MediaStore, Staging};
use crate::state::AppState;
use crate::validation::{FormData, Mode};

#[async_trait]
pub trait Resource: Send + Sync + 'static {
    type Model: Clone + Send + Sync + 'static;
    type Draft: Send + 'static;
    /// Entity-specific list filters taken from the query string.
    type Filter: DeserializeOwned + IntoParams + Send + Sync + 'static;

    /// Singular display name, used in messages ("Event not found").
    const NAME: &'static str;
    /// Collection path, e.g. `/events`.
    const PATH: &'static str;
    /// OpenAPI tag.
    const TAG: &'static str;
    /// Permission required to mutate.
    const PERMISSION: &'static str = CONTENT_MANAGE;

    fn id(model: &Self::Model) -> i32;

    /// Coerces and validates a payload, reporting every failing field.
    fn read(form: &FormData, mode: Mode) -> AppResult<Self::Draft>;

    /// Update-time read for rules that depend on the stored row.
    fn read_update(form: &FormData, _current: &Self::Model) -> AppResult<Self::Draft> {
        Self::read(form, Mode::Update)
    }

    /// Rows for the collection. `lang` is the resolved request language; only
    /// single-language tables filter on it.
    async fn list(
        db: &DatabaseConnection,
        filter: &Self::Filter,
        lang: Lang,
    ) -> Result<Vec<Self::Model>, DbErr>;

    async fn find(db: &DatabaseConnection, id: i32) -> Result<Option<Self::Model>, DbErr>;

    async fn insert(
        db: &DatabaseConnection,
        draft: Self::Draft,
        staging: &mut Staging,
    ) -> AppResult<Self::Model>;

    async fn update(
        db: &DatabaseConnection,
        current: Self::Model,
        draft: Self::Draft,
        staging: &mut Staging,
    ) -> AppResult<Self::Model>;

    async fn remove(db: &DatabaseConnection, model: &Self::Model) -> Result<(), DbErr>;

    /// Files owned by the row itself.
    fn media(model: &Self::Model) -> Vec<MediaRef>;

    /// Files owned by child rows that go away with this one.
    async fn dependent_media(
        _db: &DatabaseConnection,
        _model: &Self::Model,
    ) -> Result<Vec<MediaRef>, DbErr> {
        Ok(Vec::new())
    }

    /// Single-language view used by list responses.
    fn summary(model: &Self::Model, lang: Lang, media: &MediaStore) -> Value;

    /// All-language view used by detail and mutation responses.
    fn detail(model: &Self::Model, media: &MediaStore) -> Value;
}

pub async fn fetch<R: Resource>(db: &DatabaseConnection, id: i32) -> AppResult<R::Model> {
    R::find(db, id)
        .await?
        .ok_or_else(|| AppError::not_found(R::NAME))
}

pub async fn create<R: Resource>(state: &AppState, form: &FormData) -> AppResult<R::Model> {
    let draft = R::read(form, Mode::Create)?;
    let mut staging = state.media.staging();
    match R::insert(&state.db, draft, &mut staging).await {
        Ok(model) => {
            staging.commit().await;
            Ok(model)
        }
        Err(e) => {
            staging.rollback().await;
            Err(e)
        }
    }
}

pub async fn modify<R: Resource>(state: &AppState, id: i32, form: &FormData) -> AppResult<R::Model> {
    let current = fetch::<R>(&state.db, id).await?;
    let draft = R::read_update(form, &current)?;
    let mut staging = state.media.staging();
    match R::update(&state.db, current, draft, &mut staging).await {
        Ok(model) => {
            staging.commit().await;
            Ok(model)
        }
        Err(e) => {
            staging.rollback().await;
            Err(e)
        }
    }
}

/// Deletes the row, then its files. File removal is best-effort.
pub async fn delete<R: Resource>(state: &AppState, id: i32) -> AppResult<()> {
    let model = fetch::<R>(&state.db, id).await?;
    let mut files = R::media(&model);
    files.extend(R::dependent_media(&state.db, &model).await?);

    R::remove(&state.db, &model).await?;

    for file in &files {
        state.media.delete(file).await;
    }
    Ok(())
}

pub async fn index<R: Resource>(
    State(state): State<AppState>,
    RequestLang(lang): RequestLang,
    Query(filter): Query<R::Filter>,
) -> AppResult<Json<Value>> {
    let models = R::list(&state.db, &filter, lang).await?;
    let items: Vec<Value> = models
        .iter()
        .map(|model| R::summary(model, lang, &state.media))
        .collect();
    Ok(Json(Value::Array(items)))
}

pub async fn show<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Value>> {
    let model = fetch::<R>(&state.db, id).await?;
    Ok(Json(R::detail(&model, &state.media)))
}

pub async fn store<R: Resource>(
    State(state): State<AppState>,
    auth: AuthContext,
    form: FormData,
) -> AppResult<(StatusCode, Json<Value>)> {
    auth.require(R::PERMISSION)?;
    let model = create::<R>(&state, &form).await?;
    tracing::info!(entity = R::NAME, id = R::id(&model), user_id = auth.user.id, "Created");
    Ok((StatusCode::CREATED, Json(R::detail(&model, &state.media))))
}

pub async fn update<R: Resource>(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
    form: FormData,
) -> AppResult<Json<Value>> {
    auth.require(R::PERMISSION)?;
    let model = modify::<R>(&state, id, &form).await?;
    tracing::info!(entity = R::NAME, id, user_id = auth.user.id, "Updated");
    Ok(Json(R::detail(&model, &state.media)))
}

pub async fn destroy<R: Resource>(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
) -> AppResult<Json<Value>> {
    auth.require(R::PERMISSION)?;
    delete::<R>(&state, id).await?;
    tracing::info!(entity = R::NAME, id, user_id = auth.user.id, "Deleted");
    Ok(Json(json!({
        "message": format!("{} deleted successfully", R::NAME),
    })))
}

pub fn routes<R: Resource>() -> Router<AppState> {
    Router::new()
        .route(R::PATH, get(index::<R>).post(store::<R>))
        .route(
            &format!("{}/{{id}}", R::PATH),
            get(show::<R>)
                .put(update::<R>)
                .patch(update::<R>)
                .delete(destroy::<R>),
        )
}

/// Filter for collections without query filters.
#[derive(Debug, Default, serde::Deserialize)]
pub struct NoFilter {}

impl IntoParams for NoFilter {
    fn into_params(_: impl Fn() -> Option<ParameterIn>) -> Vec<Parameter> {
        Vec::new()
    }
}

pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Writes `value` into the slot when the payload supplied it.
pub fn patch<V: Into<sea_orm::Value>>(slot: &mut ActiveValue<V>, value: Option<V>) {
    if let Some(value) = value {
        *slot = Set(value);
    }
}

pub fn patch_localized(
    en: &mut ActiveValue<Option<String>>,
    am: &mut ActiveValue<Option<String>>,
    or: &mut ActiveValue<Option<String>>,
    draft: LocalizedDraft,
) {
    patch(en, draft.en);
    patch(am, draft.am);
    patch(or, draft.or);
}

/// Value for a newly created row: the supplied one or the column default.
pub fn or_default<V: Into<sea_orm::Value>>(value: Option<V>, default: V) -> ActiveValue<V> {
    Set(value.unwrap_or(default))
}

/// Applies `remove_*` and new uploads to an ordered path list. Removed
/// paths are handed to the staging area for deletion on commit.
pub fn merge_paths(
    current: Vec<String>,
    removed: Option<Vec<String>>,
    added: Vec<String>,
    staging: &mut Staging,
) -> Vec<String> {
    let removed = removed.unwrap_or_default();
    let (dropped, mut kept): (Vec<String>, Vec<String>) =
        current.into_iter().partition(|p| removed.contains(p));
    staging.supersede(dropped.into_iter().map(MediaRef::Local));
    kept.extend(added);
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::storage::LocalDiskStorage;
    use std::sync::Arc;

    #[tokio::test]
    async fn merge_paths_appends_and_supersedes_removed() {
        let dir = tempfile::tempdir().unwrap();
        let media = MediaStore::new(Arc::new(LocalDiskStorage::new(dir.path())), "http://x/storage");
        let mut staging = media.staging();

        let merged = merge_paths(
            vec!["g/a.jpg".into(), "g/b.jpg".into(), "g/c.jpg".into()],
            Some(vec!["g/b.jpg".into(), "g/unknown.jpg".into()]),
            vec!["g/d.jpg".into()],
            &mut staging,
        );

        assert_eq!(merged, ["g/a.jpg", "g/c.jpg", "g/d.jpg"]);
        staging.commit().await;
    }

    #[test]
    fn patch_leaves_unsupplied_fields_alone() {
        let mut slot: ActiveValue<Option<String>> = ActiveValue::Unchanged(Some("Addis Ababa".into()));
        patch(&mut slot, None);
        assert_eq!(slot, ActiveValue::Unchanged(Some("Addis Ababa".into())));

        patch(&mut slot, Some(None));
        assert_eq!(slot, ActiveValue::Set(None));
    }
}
