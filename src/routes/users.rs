use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, patch},
    Router,
};
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use crate::entities::user::{self, Entity as User};
use crate::error::{AppError, AppResult, FieldErrors};
use crate::middleware::auth::AuthContext;
use crate::pagination::{PaginatedResponse, Pagination};
use crate::resource::now;
use crate::routes::auth::UserResponse;
use crate::services::auth::{self as accounts, NewUser, EDITOR_ROLE, USERS_MANAGE};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 255))]
    name: String,
    #[validate(email, length(max = 255))]
    email: String,
    #[validate(length(min = 8))]
    password: String,
    is_active: Option<bool>,
    /// Role names; defaults to `editor`.
    roles: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 255))]
    name: Option<String>,
    #[validate(length(min = 8))]
    password: Option<String>,
    is_active: Option<bool>,
    roles: Option<Vec<String>>,
}

async fn find(state: &AppState, id: i32) -> AppResult<user::Model> {
    User::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found("User"))
}

async fn describe(state: &AppState, user: user::Model) -> AppResult<UserResponse> {
    Ok(accounts::load_principal(&state.db, user).await?.into())
}

/// List users
#[utoipa::path(
    get,
    path = "/users",
    params(Pagination),
    responses(
        (status = 200, description = "Paginated users", body = PaginatedResponse<UserResponse>),
        (status = 403, description = "Missing users.manage")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn index(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<PaginatedResponse<UserResponse>>> {
    auth.require(USERS_MANAGE)?;
    let page = pagination
        .fetch(&state.db, User::find().order_by_asc(user::Column::Id))
        .await?;

    let mut data = Vec::with_capacity(page.data.len());
    for user in page.data {
        data.push(describe(&state, user).await?);
    }
    Ok(Json(PaginatedResponse {
        data,
        total_items: page.total_items,
        total_pages: page.total_pages,
        current_page: page.current_page,
        page_size: page.page_size,
    }))
}

/// Create a user
#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 403, description = "Missing users.manage"),
        (status = 422, description = "Invalid payload or email taken")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn store(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(payload): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    auth.require(USERS_MANAGE)?;
    payload.validate()?;

    let user = accounts::create_user(
        &state.db,
        NewUser {
            name: payload.name,
            email: payload.email,
            password: payload.password,
            is_active: payload.is_active.unwrap_or(true),
            roles: payload
                .roles
                .unwrap_or_else(|| vec![EDITOR_ROLE.to_string()]),
        },
    )
    .await?;

    tracing::info!(user_id = user.id, by = auth.user.id, "Created user");
    Ok((StatusCode::CREATED, Json(describe(&state, user).await?)))
}

/// Update name, password, status or roles of a user
#[utoipa::path(
    patch,
    path = "/users/{id}",
    params(("id" = i32, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 404, description = "User not found"),
        (status = 422, description = "Invalid payload")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    auth.require(USERS_MANAGE)?;
    payload.validate()?;
    let current = find(&state, id).await?;

    if id == auth.user.id && payload.is_active == Some(false) {
        return Err(AppError::Validation(FieldErrors::single(
            "is_active",
            "You cannot disable your own account.",
        )));
    }

    let mut active: user::ActiveModel = current.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(password) = &payload.password {
        active.password = Set(accounts::hash_password(password)?);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(now());
    let user = active.update(&state.db).await?;

    if let Some(roles) = &payload.roles {
        accounts::sync_roles(&state.db, user.id, roles).await?;
    }
    if payload.is_active == Some(false) || payload.password.is_some() {
        let revoked = accounts::revoke_all(&state.db, user.id).await?;
        tracing::info!(user_id = user.id, revoked, "Revoked sessions after account change");
    }

    tracing::info!(user_id = user.id, by = auth.user.id, "Updated user");
    Ok(Json(describe(&state, user).await?))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = i32, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 404, description = "User not found"),
        (status = 422, description = "Attempt to delete own account")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn destroy(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
) -> AppResult<Json<Value>> {
    auth.require(USERS_MANAGE)?;
    if id == auth.user.id {
        return Err(AppError::Validation(FieldErrors::single(
            "id",
            "You cannot delete your own account.",
        )));
    }
    let user = find(&state, id).await?;
    User::delete_by_id(user.id).exec(&state.db).await?;

    tracing::info!(user_id = id, by = auth.user.id, "Deleted user");
    Ok(Json(json!({ "message": "User deleted successfully" })))
}

/// Revoke every token of a user
#[utoipa::path(
    delete,
    path = "/users/{id}/tokens",
    params(("id" = i32, Path, description = "User id")),
    responses(
        (status = 200, description = "Tokens revoked"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn revoke_tokens(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i32>,
) -> AppResult<Json<Value>> {
    auth.require(USERS_MANAGE)?;
    let user = find(&state, id).await?;
    let revoked = accounts::revoke_all(&state.db, user.id).await?;

    tracing::info!(user_id = id, revoked, by = auth.user.id, "Revoked user tokens");
    Ok(Json(json!({
        "message": "Tokens revoked successfully",
        "revoked": revoked,
    })))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(index).post(store))
        .route("/users/{id}", patch(update).delete(destroy))
        .route("/users/{id}/tokens", delete(revoke_tokens))
}
