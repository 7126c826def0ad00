use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use crate::entities::contact_message::{self, Entity as ContactMessage};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthContext;
use crate::pagination::{PaginatedResponse, Pagination};
use crate::resource::now;
use crate::services::auth::MESSAGES_MANAGE;
use crate::state::AppState;
use crate::validation::{present, FormData, FormReader, Mode};

#[derive(Debug, Validate)]
pub struct MessageDraft {
    #[validate(length(max = 255))]
    name: Option<String>,
    #[validate(email, length(max = 255))]
    email: Option<String>,
    #[validate(length(max = 255))]
    subject: Option<Option<String>>,
    #[validate(length(max = 5000))]
    message: Option<String>,
}

impl MessageDraft {
    fn read(form: &FormData) -> AppResult<Self> {
        let mut reader = FormReader::new(form, Mode::Create);
        let draft = MessageDraft {
            name: reader.required_text("name"),
            email: reader.required_text("email"),
            subject: reader.text("subject"),
            message: reader.required_text("message"),
        };
        reader.finish(draft)
    }
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct InboxQuery {
    #[param(default = 1, minimum = 1)]
    pub page: Option<u64>,
    #[param(default = 15, minimum = 1, maximum = 100)]
    pub limit: Option<u64>,
    /// Only messages not yet marked as read
    pub unread: Option<bool>,
}

async fn find(state: &AppState, id: i32) -> AppResult<contact_message::Model> {
    ContactMessage::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found("Message"))
}

/// Send a message through the contact form
#[utoipa::path(
    post,
    path = "/contact",
    request_body(content_type = "application/json", description = "name, email, subject, message"),
    responses(
        (status = 201, description = "Message received", body = contact_message::Model),
        (status = 422, description = "Invalid payload")
    ),
    tag = "Contact"
)]
pub async fn submit(
    State(state): State<AppState>,
    form: FormData,
) -> AppResult<(StatusCode, Json<Value>)> {
    let draft = MessageDraft::read(&form)?;
    let timestamp = now();

    let message = contact_message::ActiveModel {
        name: Set(present(draft.name, "name")?),
        email: Set(present(draft.email, "email")?),
        subject: Set(draft.subject.flatten()),
        message: Set(present(draft.message, "message")?),
        is_read: Set(false),
        created_at: Set(timestamp),
        updated_at: Set(timestamp),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    tracing::info!(id = message.id, "Contact message received");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Message sent successfully",
            "data": message,
        })),
    ))
}

/// List contact messages, newest first
#[utoipa::path(
    get,
    path = "/contact",
    params(InboxQuery),
    responses(
        (status = 200, description = "Paginated messages", body = PaginatedResponse<contact_message::Model>),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Missing messages.manage")
    ),
    security(("bearer_auth" = [])),
    tag = "Contact"
)]
pub async fn index(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<InboxQuery>,
) -> AppResult<Json<PaginatedResponse<contact_message::Model>>> {
    auth.require(MESSAGES_MANAGE)?;

    let mut select = ContactMessage::find();
    if query.unread == Some(true) {
        select = select.filter(contact_message::Column::IsRead.eq(false));
    }
    let select = select
        .order_by_desc(contact_message::Column::CreatedAt)
        .order_by_desc(contact_message::Column::Id);

    let pagination = Pagination {
        page: query.page,
        limit: query.limit,
    };
    Ok(Json(pagination.fetch(&state.db, select).await?))
}

/// Read one message
#[utoipa::path(
    get,
    path = "/contact/{id}",
    params(("id" = i32, Path, description = "Message id")),
    responses(
        (status = 200, description = "Message", body = contact_message::Model),
        (status = 404, description = "Message not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Contact"
)]
pub async fn show(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
) -> AppResult<Json<contact_message::Model>> {
    auth.require(MESSAGES_MANAGE)?;
    Ok(Json(find(&state, id).await?))
}

/// Mark a message read or unread
#[utoipa::path(
    patch,
    path = "/contact/{id}",
    params(("id" = i32, Path, description = "Message id")),
    request_body(content_type = "application/json", description = "is_read (defaults to true)"),
    responses(
        (status = 200, description = "Updated message", body = contact_message::Model),
        (status = 404, description = "Message not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Contact"
)]
pub async fn update(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
    form: FormData,
) -> AppResult<Json<contact_message::Model>> {
    auth.require(MESSAGES_MANAGE)?;
    let current = find(&state, id).await?;

    let is_read = read_flag(&form)?;

    let mut active: contact_message::ActiveModel = current.into();
    active.is_read = Set(is_read);
    active.updated_at = Set(now());
    let message = active.update(&state.db).await?;

    tracing::info!(id, is_read, user_id = auth.user.id, "Updated contact message");
    Ok(Json(message))
}

/// `is_read` from the payload; an empty body marks the message read.
fn read_flag(form: &FormData) -> AppResult<bool> {
    let mut reader = FormReader::new(form, Mode::Update);
    let is_read = reader.boolean("is_read").unwrap_or(true);
    reader.check()?;
    Ok(is_read)
}

/// Delete a message
#[utoipa::path(
    delete,
    path = "/contact/{id}",
    params(("id" = i32, Path, description = "Message id")),
    responses(
        (status = 200, description = "Message deleted"),
        (status = 404, description = "Message not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Contact"
)]
pub async fn destroy(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
) -> AppResult<Json<Value>> {
    auth.require(MESSAGES_MANAGE)?;
    let message = find(&state, id).await?;
    ContactMessage::delete_by_id(message.id).exec(&state.db).await?;

    tracing::info!(id, user_id = auth.user.id, "Deleted contact message");
    Ok(Json(json!({ "message": "Message deleted successfully" })))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/contact", get(index).post(submit))
        .route("/contact/{id}", get(show).patch(update).delete(destroy))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_missing_field_is_reported() {
        let form = FormData::default().with_field("email", "someone@example");
        let Err(AppError::Validation(errors)) = MessageDraft::read(&form) else {
            panic!("expected a validation error");
        };
        assert!(errors.contains("name"));
        assert!(errors.contains("message"));
        assert!(!errors.contains("subject"));
    }

    #[test]
    fn read_flag_defaults_to_read_and_rejects_garbage() {
        assert!(read_flag(&FormData::default()).unwrap());
        assert!(!read_flag(&FormData::default().with_field("is_read", "false")).unwrap());

        let form = FormData::default().with_field("is_read", "maybe");
        let Err(AppError::Validation(errors)) = read_flag(&form) else {
            panic!("expected a validation error");
        };
        assert!(errors.contains("is_read"));
    }
}
