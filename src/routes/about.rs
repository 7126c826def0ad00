//! About page, stored one row per language with `lang` as the natural key.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde_json::{json, Value};
use validator::Validate;

use crate::entities::about_section::{self, Entity as AboutSection};
use crate::error::{AppError, AppResult, FieldErrors};
use crate::i18n::{Lang, LangQuery, RequestLang};
use crate::middleware::auth::AuthContext;
use crate::resource::{now, patch};
use crate::services::auth::CONTENT_MANAGE;
use crate::services::media::{Category, MediaRef, MediaStore, Staging, UploadedFile};
use crate::state::AppState;
use crate::validation::{present, FormData, FormReader, Mode};

const IMAGES: Category = Category::image("about");
const NAME: &str = "About section";

#[derive(Debug, Validate)]
pub struct AboutDraft {
    lang: Option<Lang>,
    #[validate(length(max = 255))]
    title: Option<String>,
    #[validate(length(max = 255))]
    subtitle: Option<Option<String>>,
    body: Option<Option<String>>,
    achievements: Option<Option<Value>>,
    philosophies: Option<Option<Value>>,
    image: Option<UploadedFile>,
}

impl AboutDraft {
    fn read(form: &FormData, mode: Mode) -> AppResult<Self> {
        let mut reader = FormReader::new(form, mode);
        let lang = match reader.text("lang").flatten() {
            None => None,
            Some(_) if mode == Mode::Update => {
                reader.reject("lang", "The lang is taken from the URL and cannot be changed.");
                None
            }
            Some(raw) => match raw.parse::<Lang>() {
                Ok(lang) => Some(lang),
                Err(e) => {
                    reader.reject("lang", e.to_string());
                    None
                }
            },
        };
        let draft = AboutDraft {
            lang,
            title: reader.required_text("title"),
            subtitle: reader.text("subtitle"),
            body: reader.text("body"),
            achievements: reader.structured("achievements"),
            philosophies: reader.structured("philosophies"),
            image: reader.file("image", IMAGES),
        };
        reader.finish(draft)
    }
}

fn about_json(model: &about_section::Model, media: &MediaStore) -> Value {
    json!({
        "id": model.id,
        "lang": model.lang,
        "title": model.title,
        "subtitle": model.subtitle,
        "body": model.body,
        "image": media.url_for(&model.image),
        "achievements": model.achievements,
        "philosophies": model.philosophies,
        "created_at": model.created_at,
        "updated_at": model.updated_at,
    })
}

fn path_lang(raw: &str) -> AppResult<Lang> {
    raw.parse()
        .map_err(|e: crate::i18n::UnknownLang| AppError::Validation(FieldErrors::single("lang", e.to_string())))
}

async fn find(db: &DatabaseConnection, lang: Lang) -> AppResult<about_section::Model> {
    AboutSection::find()
        .filter(about_section::Column::Lang.eq(lang.code()))
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found(NAME))
}

async fn insert(
    db: &DatabaseConnection,
    draft: AboutDraft,
    staging: &mut Staging,
) -> AppResult<about_section::Model> {
    let lang = draft.lang.unwrap_or_default();
    let image = match &draft.image {
        Some(file) => Some(staging.stage(file, IMAGES).await?),
        None => None,
    };
    let timestamp = now();

    about_section::ActiveModel {
        lang: Set(lang.code().to_string()),
        title: Set(present(draft.title, "title")?),
        subtitle: Set(draft.subtitle.flatten()),
        body: Set(draft.body.flatten()),
        image: Set(image),
        achievements: Set(draft.achievements.flatten()),
        philosophies: Set(draft.philosophies.flatten()),
        created_at: Set(timestamp),
        updated_at: Set(timestamp),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| {
        AppError::unique_violation(
            e,
            "lang",
            &format!("An about section for '{lang}' already exists."),
        )
    })
}

async fn apply(
    db: &DatabaseConnection,
    current: about_section::Model,
    draft: AboutDraft,
    staging: &mut Staging,
) -> AppResult<about_section::Model> {
    let image = staging
        .stage_replacement(&current.image, draft.image.as_ref(), IMAGES)
        .await?;

    let mut active: about_section::ActiveModel = current.into();
    patch(&mut active.title, draft.title);
    patch(&mut active.subtitle, draft.subtitle);
    patch(&mut active.body, draft.body);
    patch(&mut active.achievements, draft.achievements);
    patch(&mut active.philosophies, draft.philosophies);
    active.image = Set(image);
    active.updated_at = Set(now());

    Ok(active.update(db).await?)
}

/// About section for the requested language
#[utoipa::path(
    get,
    path = "/about",
    params(LangQuery),
    responses(
        (status = 200, description = "About section"),
        (status = 404, description = "No about section for this language"),
        (status = 422, description = "Unknown language")
    ),
    tag = "About"
)]
pub async fn show(
    State(state): State<AppState>,
    RequestLang(lang): RequestLang,
) -> AppResult<Json<Value>> {
    let model = find(&state.db, lang).await?;
    Ok(Json(about_json(&model, &state.media)))
}

/// Create the about section for one language
#[utoipa::path(
    post,
    path = "/about",
    request_body(content_type = "multipart/form-data", description = "lang, title, subtitle, body, image, achievements, philosophies"),
    responses(
        (status = 201, description = "Created"),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Missing content.manage"),
        (status = 422, description = "Invalid payload or language already present")
    ),
    security(("bearer_auth" = [])),
    tag = "About"
)]
pub async fn store(
    State(state): State<AppState>,
    auth: AuthContext,
    form: FormData,
) -> AppResult<(StatusCode, Json<Value>)> {
    auth.require(CONTENT_MANAGE)?;
    let draft = AboutDraft::read(&form, Mode::Create)?;

    let mut staging = state.media.staging();
    let model = match insert(&state.db, draft, &mut staging).await {
        Ok(model) => {
            staging.commit().await;
            model
        }
        Err(e) => {
            staging.rollback().await;
            return Err(e);
        }
    };

    tracing::info!(entity = NAME, lang = %model.lang, user_id = auth.user.id, "Created");
    Ok((StatusCode::CREATED, Json(about_json(&model, &state.media))))
}

/// Update the about section of one language
#[utoipa::path(
    put,
    path = "/about/{lang}",
    params(("lang" = String, Path, description = "en, am or or")),
    request_body(content_type = "multipart/form-data", description = "Any subset of the create fields"),
    responses(
        (status = 200, description = "Updated"),
        (status = 404, description = "No about section for this language"),
        (status = 422, description = "Invalid payload")
    ),
    security(("bearer_auth" = [])),
    tag = "About"
)]
pub async fn update(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(lang): Path<String>,
    form: FormData,
) -> AppResult<Json<Value>> {
    auth.require(CONTENT_MANAGE)?;
    let lang = path_lang(&lang)?;
    let current = find(&state.db, lang).await?;
    let draft = AboutDraft::read(&form, Mode::Update)?;

    let mut staging = state.media.staging();
    let model = match apply(&state.db, current, draft, &mut staging).await {
        Ok(model) => {
            staging.commit().await;
            model
        }
        Err(e) => {
            staging.rollback().await;
            return Err(e);
        }
    };

    tracing::info!(entity = NAME, lang = %lang, user_id = auth.user.id, "Updated");
    Ok(Json(about_json(&model, &state.media)))
}

/// Delete the about section of one language
#[utoipa::path(
    delete,
    path = "/about/{lang}",
    params(("lang" = String, Path, description = "en, am or or")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 404, description = "No about section for this language")
    ),
    security(("bearer_auth" = [])),
    tag = "About"
)]
pub async fn destroy(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(lang): Path<String>,
) -> AppResult<Json<Value>> {
    auth.require(CONTENT_MANAGE)?;
    let lang = path_lang(&lang)?;
    let model = find(&state.db, lang).await?;

    AboutSection::delete_by_id(model.id).exec(&state.db).await?;
    if let Some(image) = MediaRef::local(&model.image) {
        state.media.delete(&image).await;
    }

    tracing::info!(entity = NAME, lang = %lang, user_id = auth.user.id, "Deleted");
    Ok(Json(json!({ "message": "About section deleted successfully" })))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/about", get(show).post(store))
        .route("/about/{lang}", axum::routing::put(update).patch(update).delete(destroy))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lang_in_payload_is_checked() {
        let form = FormData::default()
            .with_field("title", "About me")
            .with_field("lang", "de");
        let Err(AppError::Validation(errors)) = AboutDraft::read(&form, Mode::Create) else {
            panic!("expected a validation error");
        };
        assert!(errors.contains("lang"));
    }

    #[test]
    fn lang_defaults_to_english() {
        let form = FormData::default().with_field("title", "About me");
        let draft = AboutDraft::read(&form, Mode::Create).unwrap();
        assert_eq!(draft.lang.unwrap_or_default(), Lang::En);
    }

    #[test]
    fn lang_cannot_be_changed_by_an_update() {
        let form = FormData::default()
            .with_field("title", "About me")
            .with_field("lang", "am");
        let Err(AppError::Validation(errors)) = AboutDraft::read(&form, Mode::Update) else {
            panic!("expected a validation error");
        };
        assert!(errors.contains("lang"));

        let form = FormData::default().with_field("subtitle", "Hello");
        assert!(AboutDraft::read(&form, Mode::Update).is_ok());
    }

    #[test]
    fn achievements_accept_json_strings() {
        let form = FormData::default()
            .with_field("title", "About me")
            .with_field("achievements", r#"[{"label":"Albums","value":4}]"#);
        let draft = AboutDraft::read(&form, Mode::Create).unwrap();
        assert_eq!(
            draft.achievements,
            Some(Some(json!([{ "label": "Albums", "value": 4 }])))
        );
    }
}
