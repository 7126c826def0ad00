use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::entities::user;
use crate::error::AppResult;
use crate::middleware::auth::AuthContext;
use crate::services::auth::{self as accounts, Principal};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    email: String,
    #[validate(length(min = 1))]
    password: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub is_active: bool,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub created_at: NaiveDateTime,
}

impl UserResponse {
    pub fn new(user: user::Model, roles: Vec<String>, permissions: Vec<String>) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            is_active: user.is_active,
            roles,
            permissions,
            created_at: user.created_at,
        }
    }
}

impl From<Principal> for UserResponse {
    fn from(principal: Principal) -> Self {
        Self::new(
            principal.user,
            principal.roles,
            principal.permissions.into_iter().collect(),
        )
    }
}

impl From<AuthContext> for UserResponse {
    fn from(ctx: AuthContext) -> Self {
        Self::new(ctx.user, ctx.roles, ctx.permissions.into_iter().collect())
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    token: String,
    token_type: &'static str,
    user: UserResponse,
    roles: Vec<String>,
    permissions: Vec<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    message: String,
}

/// Exchange credentials for a bearer token
///
/// Logging in revokes every token previously issued to the account.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account disabled"),
        (status = 422, description = "Malformed credentials")
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    payload.validate()?;
    let issued = accounts::authenticate(
        &state.db,
        &payload.email,
        &payload.password,
        state.config.token_ttl_hours,
    )
    .await?;

    let user = UserResponse::from(issued.principal);
    Ok(Json(LoginResponse {
        token: issued.token,
        token_type: "Bearer",
        roles: user.roles.clone(),
        permissions: user.permissions.clone(),
        user,
    }))
}

/// Revoke the token used for this request
#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Unauthenticated")
    ),
    security(("bearer_auth" = [])),
    tag = "Authentication"
)]
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthContext,
) -> AppResult<Json<MessageResponse>> {
    accounts::revoke_token(&state.db, auth.token_id).await?;
    tracing::info!(user_id = auth.user.id, "Logged out");
    Ok(Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    }))
}

/// The authenticated user with roles and permissions
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Unauthenticated")
    ),
    security(("bearer_auth" = [])),
    tag = "Authentication"
)]
pub async fn me(auth: AuthContext) -> Json<UserResponse> {
    Json(auth.into())
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}
