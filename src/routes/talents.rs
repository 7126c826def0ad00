use async_trait::async_trait;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get},
    Router,
};
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use crate::entities::talent::{self, Entity as Talent, TalentStatus};
use crate::entities::talent_application::{self, Entity as TalentApplication};
use crate::error::{AppError, AppResult, FieldErrors};
use crate::i18n::{Lang, Localized, LocalizedDraft};
use crate::middleware::auth::AuthContext;
use crate::pagination::{PaginatedResponse, Pagination};
use crate::resource::{self, now, patch, patch_localized, Resource};
use crate::services::auth::APPLICATIONS_MANAGE;
use crate::services::media::{Category, MediaRef, MediaStore, Staging, UploadedFile};
use crate::state::AppState;
use crate::validation::{present, FormData, FormReader, Mode, Presence};

const IMAGES: Category = Category::image("talents");
const PHOTOS: Category = Category::image("talents/applications");

pub struct Talents;

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct TalentFilter {
    pub status: Option<TalentStatus>,
    pub category: Option<String>,
}

#[derive(Debug, Validate)]
pub struct TalentDraft {
    title: LocalizedDraft,
    description: LocalizedDraft,
    requirements: LocalizedDraft,
    #[validate(length(max = 255))]
    category: Option<Option<String>>,
    status: Option<TalentStatus>,
    deadline: Option<Option<NaiveDate>>,
    image: Option<UploadedFile>,
}

#[async_trait]
impl Resource for Talents {
    type Model = talent::Model;
    type Draft = TalentDraft;
    type Filter = TalentFilter;

    const NAME: &'static str = "Talent";
    const PATH: &'static str = "/talents";
    const TAG: &'static str = "Talents";

    fn id(model: &talent::Model) -> i32 {
        model.id
    }

    fn read(form: &FormData, mode: Mode) -> AppResult<TalentDraft> {
        let mut reader = FormReader::new(form, mode);
        let draft = TalentDraft {
            title: reader.localized("title", Presence::English, Some(255)),
            description: reader.localized("description", Presence::Optional, None),
            requirements: reader.localized("requirements", Presence::Optional, None),
            category: reader.text("category"),
            status: reader.choice("status"),
            deadline: reader.date("deadline"),
            image: reader.file("image", IMAGES),
        };
        reader.finish(draft)
    }

    async fn list(
        db: &DatabaseConnection,
        filter: &TalentFilter,
        _lang: Lang,
    ) -> Result<Vec<talent::Model>, DbErr> {
        let mut query = Talent::find();
        if let Some(status) = filter.status {
            query = query.filter(talent::Column::Status.eq(status));
        }
        if let Some(category) = &filter.category {
            query = query.filter(talent::Column::Category.eq(category.as_str()));
        }
        query.order_by_desc(talent::Column::Id).all(db).await
    }

    async fn find(db: &DatabaseConnection, id: i32) -> Result<Option<talent::Model>, DbErr> {
        Talent::find_by_id(id).one(db).await
    }

    async fn insert(
        db: &DatabaseConnection,
        draft: TalentDraft,
        staging: &mut Staging,
    ) -> AppResult<talent::Model> {
        let image = match &draft.image {
            Some(file) => Some(staging.stage(file, IMAGES).await?),
            None => None,
        };
        let (title_en, title_am, title_or) = draft.title.into_columns();
        let (description_en, description_am, description_or) = draft.description.into_columns();
        let (requirements_en, requirements_am, requirements_or) = draft.requirements.into_columns();
        let timestamp = now();

        let model = talent::ActiveModel {
            title_en: Set(title_en),
            title_am: Set(title_am),
            title_or: Set(title_or),
            description_en: Set(description_en),
            description_am: Set(description_am),
            description_or: Set(description_or),
            requirements_en: Set(requirements_en),
            requirements_am: Set(requirements_am),
            requirements_or: Set(requirements_or),
            category: Set(draft.category.flatten()),
            status: Set(draft.status.unwrap_or(TalentStatus::Open)),
            deadline: Set(draft.deadline.flatten()),
            image: Set(image),
            created_at: Set(timestamp),
            updated_at: Set(timestamp),
            ..Default::default()
        }
        .insert(db)
        .await?;
        Ok(model)
    }

    async fn update(
        db: &DatabaseConnection,
        current: talent::Model,
        draft: TalentDraft,
        staging: &mut Staging,
    ) -> AppResult<talent::Model> {
        let image = staging
            .stage_replacement(&current.image, draft.image.as_ref(), IMAGES)
            .await?;

        let mut active: talent::ActiveModel = current.into();
        patch_localized(&mut active.title_en, &mut active.title_am, &mut active.title_or, draft.title);
        patch_localized(
            &mut active.description_en,
            &mut active.description_am,
            &mut active.description_or,
            draft.description,
        );
        patch_localized(
            &mut active.requirements_en,
            &mut active.requirements_am,
            &mut active.requirements_or,
            draft.requirements,
        );
        patch(&mut active.category, draft.category);
        patch(&mut active.status, draft.status);
        patch(&mut active.deadline, draft.deadline);
        active.image = Set(image);
        active.updated_at = Set(now());

        Ok(active.update(db).await?)
    }

    async fn remove(db: &DatabaseConnection, model: &talent::Model) -> Result<(), DbErr> {
        Talent::delete_by_id(model.id).exec(db).await?;
        Ok(())
    }

    fn media(model: &talent::Model) -> Vec<MediaRef> {
        MediaRef::local(&model.image).into_iter().collect()
    }

    /// Applications are removed by the foreign-key cascade; their photos are not.
    async fn dependent_media(db: &DatabaseConnection, model: &talent::Model) -> Result<Vec<MediaRef>, DbErr> {
        let photos: Vec<Option<String>> = TalentApplication::find()
            .select_only()
            .column(talent_application::Column::Photo)
            .filter(talent_application::Column::TalentId.eq(model.id))
            .into_tuple()
            .all(db)
            .await?;
        Ok(photos.iter().filter_map(MediaRef::local).collect())
    }

    fn summary(model: &talent::Model, lang: Lang, media: &MediaStore) -> Value {
        json!({
            "id": model.id,
            "title": title(model).project(lang),
            "description": description(model).project(lang),
            "requirements": requirements(model).project(lang),
            "category": model.category,
            "status": model.status,
            "deadline": model.deadline,
            "image": media.url_for(&model.image),
        })
    }

    fn detail(model: &talent::Model, media: &MediaStore) -> Value {
        json!({
            "id": model.id,
            "title": title(model).to_json(),
            "description": description(model).to_json(),
            "requirements": requirements(model).to_json(),
            "category": model.category,
            "status": model.status,
            "deadline": model.deadline,
            "image": media.url_for(&model.image),
            "created_at": model.created_at,
            "updated_at": model.updated_at,
        })
    }
}

fn title(model: &talent::Model) -> Localized<'_> {
    Localized::new(&model.title_en, &model.title_am, &model.title_or)
}

fn description(model: &talent::Model) -> Localized<'_> {
    Localized::new(&model.description_en, &model.description_am, &model.description_or)
}

fn requirements(model: &talent::Model) -> Localized<'_> {
    Localized::new(&model.requirements_en, &model.requirements_am, &model.requirements_or)
}

#[derive(Debug, Validate)]
pub struct ApplicationDraft {
    #[validate(length(max = 255))]
    full_name: Option<String>,
    #[validate(email, length(max = 255))]
    email: Option<String>,
    #[validate(length(max = 50))]
    phone: Option<Option<String>>,
    #[validate(length(max = 5000))]
    message: Option<Option<String>>,
    photo: Option<UploadedFile>,
}

impl ApplicationDraft {
    fn read(form: &FormData) -> AppResult<Self> {
        let mut reader = FormReader::new(form, Mode::Create);
        let draft = ApplicationDraft {
            full_name: reader.required_text("full_name"),
            email: reader.required_text("email"),
            phone: reader.text("phone"),
            message: reader.text("message"),
            photo: reader.file("photo", PHOTOS),
        };
        reader.finish(draft)
    }
}

fn application_json(model: &talent_application::Model, media: &MediaStore) -> Value {
    json!({
        "id": model.id,
        "talent_id": model.talent_id,
        "full_name": model.full_name,
        "email": model.email,
        "phone": model.phone,
        "message": model.message,
        "photo": media.url_for(&model.photo),
        "created_at": model.created_at,
    })
}

async fn insert_application(
    db: &DatabaseConnection,
    talent_id: i32,
    draft: ApplicationDraft,
    staging: &mut Staging,
) -> AppResult<talent_application::Model> {
    let photo = match &draft.photo {
        Some(file) => Some(staging.stage(file, PHOTOS).await?),
        None => None,
    };
    let timestamp = now();

    let model = talent_application::ActiveModel {
        talent_id: Set(talent_id),
        full_name: Set(present(draft.full_name, "full_name")?),
        email: Set(present(draft.email, "email")?),
        phone: Set(draft.phone.flatten()),
        message: Set(draft.message.flatten()),
        photo: Set(photo),
        created_at: Set(timestamp),
        updated_at: Set(timestamp),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(model)
}

/// Submit an application for an open talent call
#[utoipa::path(
    post,
    path = "/talents/{id}/applications",
    params(("id" = i32, Path, description = "Talent id")),
    request_body(content_type = "multipart/form-data", description = "full_name, email, phone, message, photo"),
    responses(
        (status = 201, description = "Application received"),
        (status = 404, description = "Talent not found"),
        (status = 422, description = "Invalid payload or talent closed")
    ),
    tag = "Talents"
)]
pub async fn apply(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    form: FormData,
) -> AppResult<(StatusCode, Json<Value>)> {
    let talent = resource::fetch::<Talents>(&state.db, id).await?;
    if talent.status == TalentStatus::Closed {
        return Err(AppError::Validation(FieldErrors::single(
            "talent",
            "This talent call is closed and no longer accepts applications.",
        )));
    }

    let draft = ApplicationDraft::read(&form)?;
    let mut staging = state.media.staging();
    let application = match insert_application(&state.db, talent.id, draft, &mut staging).await {
        Ok(model) => {
            staging.commit().await;
            model
        }
        Err(e) => {
            staging.rollback().await;
            return Err(e);
        }
    };

    tracing::info!(talent_id = id, application_id = application.id, "Talent application received");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Application submitted successfully",
            "data": application_json(&application, &state.media),
        })),
    ))
}

/// List applications for a talent call
#[utoipa::path(
    get,
    path = "/talents/{id}/applications",
    params(("id" = i32, Path, description = "Talent id"), Pagination),
    responses(
        (status = 200, description = "Paginated applications"),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Missing applications.manage"),
        (status = 404, description = "Talent not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Talents"
)]
pub async fn list_applications(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<PaginatedResponse<Value>>> {
    auth.require(APPLICATIONS_MANAGE)?;
    let talent = resource::fetch::<Talents>(&state.db, id).await?;

    let select = TalentApplication::find()
        .filter(talent_application::Column::TalentId.eq(talent.id))
        .order_by_desc(talent_application::Column::CreatedAt)
        .order_by_desc(talent_application::Column::Id);
    let page = pagination.fetch(&state.db, select).await?;

    Ok(Json(page.map(|a| application_json(&a, &state.media))))
}

/// Delete an application and its photo
#[utoipa::path(
    delete,
    path = "/talent-applications/{id}",
    params(("id" = i32, Path, description = "Application id")),
    responses(
        (status = 200, description = "Application deleted"),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Missing applications.manage"),
        (status = 404, description = "Application not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Talents"
)]
pub async fn delete_application(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
) -> AppResult<Json<Value>> {
    auth.require(APPLICATIONS_MANAGE)?;
    let application = TalentApplication::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found("Application"))?;

    TalentApplication::delete_by_id(application.id)
        .exec(&state.db)
        .await?;
    if let Some(photo) = MediaRef::local(&application.photo) {
        state.media.delete(&photo).await;
    }

    tracing::info!(id, user_id = auth.user.id, "Deleted talent application");
    Ok(Json(json!({ "message": "Application deleted successfully" })))
}

pub fn application_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/talents/{id}/applications",
            get(list_applications).post(apply),
        )
        .route("/talent-applications/{id}", delete(delete_application))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn application_requires_name_and_valid_email() {
        let form = FormData::default().with_field("email", "not-an-email");
        let Err(AppError::Validation(errors)) = ApplicationDraft::read(&form) else {
            panic!("expected a validation error");
        };
        assert!(errors.contains("full_name"));
        assert_eq!(
            errors.get("email").unwrap(),
            ["The email must be a valid email address."]
        );
    }

    #[test]
    fn status_outside_open_and_closed_is_rejected() {
        let form = FormData::default()
            .with_field("title_en", "Casting call")
            .with_field("status", "archived");
        let Err(AppError::Validation(errors)) = Talents::read(&form, Mode::Create) else {
            panic!("expected a validation error");
        };
        assert_eq!(
            errors.get("status").unwrap(),
            ["The status must be one of: open, closed."]
        );
    }
}
