//! Free-form page content, one row per `(type, slug, lang)`.

use async_trait::async_trait;
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use crate::entities::content::{self, Entity as Content};
use crate::error::{AppError, AppResult};
use crate::i18n::{Lang, LangQuery, RequestLang};
use crate::resource::{now, patch, Resource};
use crate::services::media::{Category, MediaRef, MediaStore, Staging, UploadedFile};
use crate::state::AppState;
use crate::validation::{present, FormData, FormReader, Mode};

const IMAGES: Category = Category::image("contents");
const DUPLICATE_SLUG: &str = "The slug has already been taken for this type and language.";

pub struct Contents;

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct ContentFilter {
    /// Content type, e.g. `page` or `hero`
    #[serde(rename = "type")]
    pub content_type: Option<String>,
}

#[derive(Debug, Validate)]
pub struct ContentDraft {
    #[validate(length(max = 50))]
    content_type: Option<String>,
    #[validate(length(max = 255))]
    slug: Option<String>,
    lang: Option<Lang>,
    #[validate(length(max = 255))]
    title: Option<String>,
    body: Option<Option<String>>,
    features: Option<Option<Value>>,
    image: Option<UploadedFile>,
}

/// Lowercases, keeps letters and digits of any script and joins the rest
/// with single hyphens.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[async_trait]
impl Resource for Contents {
    type Model = content::Model;
    type Draft = ContentDraft;
    type Filter = ContentFilter;

    const NAME: &'static str = "Content";
    const PATH: &'static str = "/contents";
    const TAG: &'static str = "Contents";

    fn id(model: &content::Model) -> i32 {
        model.id
    }

    fn read(form: &FormData, mode: Mode) -> AppResult<ContentDraft> {
        let mut reader = FormReader::new(form, mode);
        let lang = match reader.text("lang").flatten() {
            None => None,
            Some(raw) => match raw.parse::<Lang>() {
                Ok(lang) => Some(lang),
                Err(e) => {
                    reader.reject("lang", e.to_string());
                    None
                }
            },
        };
        let content_type = reader.required_text("type");
        let title = reader.required_text("title");

        let slug = match reader.text("slug") {
            Some(Some(raw)) => Some(slugify(&raw)),
            Some(None) if mode == Mode::Update => Some(String::new()),
            _ if mode == Mode::Create => title.as_deref().map(slugify),
            _ => None,
        };
        if slug.as_deref() == Some("") {
            reader.reject("slug", "The slug must contain at least one letter or digit.");
        }

        let draft = ContentDraft {
            content_type,
            slug,
            lang,
            title,
            body: reader.text("body"),
            features: reader.structured("features"),
            image: reader.file("image", IMAGES),
        };
        reader.finish(draft)
    }

    async fn list(
        db: &DatabaseConnection,
        filter: &ContentFilter,
        lang: Lang,
    ) -> Result<Vec<content::Model>, DbErr> {
        let mut query = Content::find();
        if let Some(kind) = &filter.content_type {
            query = query.filter(content::Column::ContentType.eq(kind.as_str()));
        }
        query
            .filter(content::Column::Lang.eq(lang.code()))
            .order_by_asc(content::Column::ContentType)
            .order_by_asc(content::Column::Slug)
            .all(db)
            .await
    }

    async fn find(db: &DatabaseConnection, id: i32) -> Result<Option<content::Model>, DbErr> {
        Content::find_by_id(id).one(db).await
    }

    async fn insert(
        db: &DatabaseConnection,
        draft: ContentDraft,
        staging: &mut Staging,
    ) -> AppResult<content::Model> {
        let image = match &draft.image {
            Some(file) => Some(staging.stage(file, IMAGES).await?),
            None => None,
        };
        let timestamp = now();

        content::ActiveModel {
            content_type: Set(present(draft.content_type, "type")?),
            slug: Set(present(draft.slug, "slug")?),
            lang: Set(draft.lang.unwrap_or_default().code().to_string()),
            title: Set(present(draft.title, "title")?),
            body: Set(draft.body.flatten()),
            image: Set(image),
            features: Set(draft.features.flatten()),
            created_at: Set(timestamp),
            updated_at: Set(timestamp),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(|e| AppError::unique_violation(e, "slug", DUPLICATE_SLUG))
    }

    async fn update(
        db: &DatabaseConnection,
        current: content::Model,
        draft: ContentDraft,
        staging: &mut Staging,
    ) -> AppResult<content::Model> {
        let image = staging
            .stage_replacement(&current.image, draft.image.as_ref(), IMAGES)
            .await?;

        let mut active: content::ActiveModel = current.into();
        patch(&mut active.content_type, draft.content_type);
        patch(&mut active.slug, draft.slug);
        patch(&mut active.lang, draft.lang.map(|l| l.code().to_string()));
        patch(&mut active.title, draft.title);
        patch(&mut active.body, draft.body);
        patch(&mut active.features, draft.features);
        active.image = Set(image);
        active.updated_at = Set(now());

        active
            .update(db)
            .await
            .map_err(|e| AppError::unique_violation(e, "slug", DUPLICATE_SLUG))
    }

    async fn remove(db: &DatabaseConnection, model: &content::Model) -> Result<(), DbErr> {
        Content::delete_by_id(model.id).exec(db).await?;
        Ok(())
    }

    fn media(model: &content::Model) -> Vec<MediaRef> {
        MediaRef::local(&model.image).into_iter().collect()
    }

    /// Rows are already single-language; the requested language only filters.
    fn summary(model: &content::Model, _lang: Lang, media: &MediaStore) -> Value {
        json!({
            "id": model.id,
            "type": model.content_type,
            "slug": model.slug,
            "lang": model.lang,
            "title": model.title,
            "body": model.body,
            "image": media.url_for(&model.image),
            "features": model.features,
        })
    }

    fn detail(model: &content::Model, media: &MediaStore) -> Value {
        json!({
            "id": model.id,
            "type": model.content_type,
            "slug": model.slug,
            "lang": model.lang,
            "title": model.title,
            "body": model.body,
            "image": media.url_for(&model.image),
            "features": model.features,
            "created_at": model.created_at,
            "updated_at": model.updated_at,
        })
    }
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct SlugQuery {
    #[serde(rename = "type")]
    pub content_type: Option<String>,
}

/// Look up content by its natural key
#[utoipa::path(
    get,
    path = "/contents/slug/{slug}",
    params(("slug" = String, Path, description = "Content slug"), LangQuery, SlugQuery),
    responses(
        (status = 200, description = "Content in the requested language"),
        (status = 404, description = "Content not found")
    ),
    tag = "Contents"
)]
pub async fn show_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    RequestLang(lang): RequestLang,
    Query(query): Query<SlugQuery>,
) -> AppResult<Json<Value>> {
    let mut select = Content::find()
        .filter(content::Column::Slug.eq(slug.as_str()))
        .filter(content::Column::Lang.eq(lang.code()));
    if let Some(kind) = &query.content_type {
        select = select.filter(content::Column::ContentType.eq(kind.as_str()));
    }
    let model = select
        .order_by_asc(content::Column::Id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found(Contents::NAME))?;

    Ok(Json(Contents::detail(&model, &state.media)))
}

pub fn slug_routes() -> Router<AppState> {
    Router::new().route("/contents/slug/{slug}", get(show_by_slug))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Hello, World!  "), "hello-world");
        assert_eq!(slugify("Music & Film -- 2024"), "music-film-2024");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn slugify_keeps_non_latin_letters() {
        assert_eq!(slugify("ስለ እኛ"), "ስለ-እኛ");
    }

    #[test]
    fn slug_is_derived_from_title_on_create() {
        let form = FormData::default()
            .with_field("type", "page")
            .with_field("title", "Our Story");
        let draft = Contents::read(&form, Mode::Create).unwrap();
        assert_eq!(draft.slug.as_deref(), Some("our-story"));
        assert_eq!(draft.lang, None);
    }

    #[test]
    fn update_keeps_slug_when_only_title_changes() {
        let form = FormData::default().with_field("title", "Renamed");
        let draft = Contents::read(&form, Mode::Update).unwrap();
        assert_eq!(draft.slug, None);
    }

    #[test]
    fn unsluggable_title_is_rejected() {
        let form = FormData::default()
            .with_field("type", "page")
            .with_field("title", "!!!");
        let Err(AppError::Validation(errors)) = Contents::read(&form, Mode::Create) else {
            panic!("expected a validation error");
        };
        assert!(errors.contains("slug"));
    }
}
