use std::collections::BTreeSet;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use crate::entities::user;
use crate::error::AppError;
use crate::services::auth::{self, Principal};
use crate::state::AppState;

/// The verified caller of a protected endpoint, built once per request from
/// the `Authorization: Bearer` header.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub token_id: i32,
    pub user: user::Model,
    pub roles: Vec<String>,
    pub permissions: BTreeSet<String>,
}

impl AuthContext {
    fn from_principal(token_id: i32, principal: Principal) -> Self {
        Self {
            token_id,
            user: principal.user,
            roles: principal.roles,
            permissions: principal.permissions,
        }
    }

    pub fn can(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    /// Fails with 403 unless one of the caller's roles grants `permission`.
    pub fn require(&self, permission: &str) -> Result<&Self, AppError> {
        if self.can(permission) {
            Ok(self)
        } else {
            tracing::warn!(
                user_id = self.user.id,
                permission,
                "Access denied: missing permission"
            );
            Err(AppError::Forbidden(
                "This action is unauthorized.".to_string(),
            ))
        }
    }
}

pub fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|value| {
            value
                .strip_prefix("Bearer ")
                .or_else(|| value.strip_prefix("bearer "))
        })
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("Unauthenticated.".to_string()))?;

        let (record, principal) = auth::resolve_token(&state.db, token).await?;
        Ok(AuthContext::from_principal(record.id, principal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::{CONTENT_MANAGE, USERS_MANAGE};
    use axum::http::Request;

    fn editor() -> AuthContext {
        let now = chrono::Utc::now().naive_utc();
        AuthContext {
            token_id: 1,
            user: user::Model {
                id: 7,
                name: "Editor".into(),
                email: "editor@example.com".into(),
                password: String::new(),
                is_active: true,
                created_at: now,
                updated_at: now,
            },
            roles: vec!["editor".into()],
            permissions: [CONTENT_MANAGE.to_string()].into_iter().collect(),
        }
    }

    #[test]
    fn require_checks_the_flattened_permission_set() {
        let ctx = editor();
        assert!(ctx.require(CONTENT_MANAGE).is_ok());
        assert!(matches!(ctx.require(USERS_MANAGE), Err(AppError::Forbidden(_))));
    }

    #[test]
    fn bearer_token_ignores_other_schemes_and_blank_values() {
        let parts = |value: &str| {
            Request::builder()
                .header(header::AUTHORIZATION, value)
                .body(())
                .unwrap()
                .into_parts()
                .0
        };
        assert_eq!(bearer_token(&parts("Bearer abc123")), Some("abc123"));
        assert_eq!(bearer_token(&parts("Basic abc123")), None);
        assert_eq!(bearer_token(&parts("Bearer   ")), None);
    }
}
