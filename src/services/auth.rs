//! Credential checks, opaque bearer tokens and the flat role/permission model.

use std::collections::BTreeSet;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    JoinType, ModelTrait, QueryFilter, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use sha2::{Digest, Sha256};

use crate::entities::{
    access_token, permission, role, role_permission,
    user::{self, Entity as User},
    user_role,
};
use crate::error::{AppError, AppResult, FieldErrors};

pub const CONTENT_MANAGE: &str = "content.manage";
pub const MESSAGES_MANAGE: &str = "messages.manage";
pub const APPLICATIONS_MANAGE: &str = "applications.manage";
pub const USERS_MANAGE: &str = "users.manage";

pub const ALL_PERMISSIONS: [&str; 4] = [
    CONTENT_MANAGE,
    MESSAGES_MANAGE,
    APPLICATIONS_MANAGE,
    USERS_MANAGE,
];

pub const ADMIN_ROLE: &str = "admin";
pub const EDITOR_ROLE: &str = "editor";

const INVALID_CREDENTIALS: &str = "Invalid credentials";
const UNAUTHENTICATED: &str = "Unauthenticated.";

/// An authenticated user together with everything their roles grant.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user: user::Model,
    pub roles: Vec<String>,
    pub permissions: BTreeSet<String>,
}

#[derive(Debug)]
pub struct IssuedToken {
    pub token: String,
    pub principal: Principal,
}

pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub is_active: bool,
    pub roles: Vec<String>,
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::error!(error = %e, "Stored password hash is unreadable");
            false
        }
    }
}

fn generate_token() -> String {
    let mut random_bytes = [0u8; 32];
    rand::thread_rng().fill(&mut random_bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(random_bytes)
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Checks credentials and opens a fresh session, revoking every earlier one.
///
/// Unknown email and wrong password produce the same error. A disabled
/// account is only reported once the password has been verified.
pub async fn authenticate(
    db: &DatabaseConnection,
    email: &str,
    password: &str,
    ttl_hours: Option<i64>,
) -> AppResult<IssuedToken> {
    let email = email.trim().to_lowercase();
    let Some(user) = User::find()
        .filter(user::Column::Email.eq(&email))
        .one(db)
        .await?
    else {
        tracing::info!("Login failed: unknown account");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    if !verify_password(password, &user.password) {
        tracing::info!(user_id = user.id, "Login failed: wrong password");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    if !user.is_active {
        tracing::info!(user_id = user.id, "Login refused: account disabled");
        return Err(AppError::Forbidden(
            "This account has been disabled".to_string(),
        ));
    }

    let token = issue_token(db, user.id, ttl_hours).await?;
    let principal = load_principal(db, user).await?;
    tracing::info!(user_id = principal.user.id, "Login successful");

    Ok(IssuedToken { token, principal })
}

/// Replaces all tokens of `user_id` with a single new one.
pub async fn issue_token(
    db: &DatabaseConnection,
    user_id: i32,
    ttl_hours: Option<i64>,
) -> Result<String, DbErr> {
    let token = generate_token();
    let now = Utc::now().naive_utc();

    let txn = db.begin().await?;
    access_token::Entity::delete_many()
        .filter(access_token::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?;
    access_token::ActiveModel {
        user_id: Set(user_id),
        token_hash: Set(hash_token(&token)),
        created_at: Set(now),
        last_used_at: Set(None),
        expires_at: Set(ttl_hours.map(|hours| now + Duration::hours(hours))),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    Ok(token)
}

/// Resolves a bearer value to its token row and active user.
pub async fn resolve_token(
    db: &DatabaseConnection,
    token: &str,
) -> AppResult<(access_token::Model, Principal)> {
    let unauthenticated = || AppError::Unauthorized(UNAUTHENTICATED.to_string());

    let record = access_token::Entity::find()
        .filter(access_token::Column::TokenHash.eq(hash_token(token)))
        .one(db)
        .await?
        .ok_or_else(unauthenticated)?;

    let now = Utc::now().naive_utc();
    if record.expires_at.is_some_and(|expires| expires <= now) {
        record.clone().delete(db).await?;
        return Err(unauthenticated());
    }

    let user = User::find_by_id(record.user_id)
        .one(db)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(unauthenticated)?;

    let mut touched: access_token::ActiveModel = record.clone().into();
    touched.last_used_at = Set(Some(now));
    let record = touched.update(db).await?;

    Ok((record, load_principal(db, user).await?))
}

pub async fn revoke_token(db: &DatabaseConnection, token_id: i32) -> Result<(), DbErr> {
    access_token::Entity::delete_by_id(token_id).exec(db).await?;
    Ok(())
}

/// Administrative revocation of every session of a user.
pub async fn revoke_all(db: &DatabaseConnection, user_id: i32) -> Result<u64, DbErr> {
    let result = access_token::Entity::delete_many()
        .filter(access_token::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

pub async fn load_principal(db: &DatabaseConnection, user: user::Model) -> Result<Principal, DbErr> {
    let roles = user.find_related(role::Entity).all(db).await?;
    let role_ids: Vec<i32> = roles.iter().map(|r| r.id).collect();

    let permissions = if role_ids.is_empty() {
        BTreeSet::new()
    } else {
        permission::Entity::find()
            .join(JoinType::InnerJoin, permission::Relation::RolePermission.def())
            .filter(role_permission::Column::RoleId.is_in(role_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|p| p.name)
            .collect()
    };

    let mut roles: Vec<String> = roles.into_iter().map(|r| r.name).collect();
    roles.sort();

    Ok(Principal {
        user,
        roles,
        permissions,
    })
}

/// Creates the default permissions and roles if they are missing. Safe to run
/// repeatedly.
pub async fn seed_defaults<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    let mut permission_ids = Vec::with_capacity(ALL_PERMISSIONS.len());
    for name in ALL_PERMISSIONS {
        permission_ids.push((name, find_or_create_permission(db, name).await?));
    }

    let defaults: [(&str, &str, &[&str]); 2] = [
        (ADMIN_ROLE, "Full access", &ALL_PERMISSIONS),
        (
            EDITOR_ROLE,
            "Manages content, messages and applications",
            &[CONTENT_MANAGE, MESSAGES_MANAGE, APPLICATIONS_MANAGE],
        ),
    ];

    for (name, description, granted) in defaults {
        let role_id = find_or_create_role(db, name, description).await?;
        for (permission, permission_id) in &permission_ids {
            if !granted.contains(permission) {
                continue;
            }
            let linked = role_permission::Entity::find_by_id((role_id, *permission_id))
                .one(db)
                .await?
                .is_some();
            if !linked {
                role_permission::ActiveModel {
                    role_id: Set(role_id),
                    permission_id: Set(*permission_id),
                }
                .insert(db)
                .await?;
            }
        }
    }

    tracing::debug!("Default roles and permissions are in place");
    Ok(())
}

async fn find_or_create_permission<C: ConnectionTrait>(db: &C, name: &str) -> Result<i32, DbErr> {
    if let Some(existing) = permission::Entity::find()
        .filter(permission::Column::Name.eq(name))
        .one(db)
        .await?
    {
        return Ok(existing.id);
    }
    let created = permission::ActiveModel {
        name: Set(name.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(created.id)
}

async fn find_or_create_role<C: ConnectionTrait>(
    db: &C,
    name: &str,
    description: &str,
) -> Result<i32, DbErr> {
    if let Some(existing) = role::Entity::find()
        .filter(role::Column::Name.eq(name))
        .one(db)
        .await?
    {
        return Ok(existing.id);
    }
    let created = role::ActiveModel {
        name: Set(name.to_string()),
        description: Set(Some(description.to_string())),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(created.id)
}

pub async fn create_user(db: &DatabaseConnection, new_user: NewUser) -> AppResult<user::Model> {
    let role_ids = role_ids(db, &new_user.roles).await?;
    let password = hash_password(&new_user.password)?;
    let now = Utc::now().naive_utc();

    let txn = db.begin().await?;
    let created = user::ActiveModel {
        name: Set(new_user.name),
        email: Set(new_user.email.trim().to_lowercase()),
        password: Set(password),
        is_active: Set(new_user.is_active),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| AppError::unique_violation(e, "email", "The email has already been taken."))?;
    link_roles(&txn, created.id, &role_ids).await?;
    txn.commit().await?;

    tracing::info!(user_id = created.id, "User created");
    Ok(created)
}

/// Replaces the role set of a user.
pub async fn sync_roles(db: &DatabaseConnection, user_id: i32, roles: &[String]) -> AppResult<()> {
    let role_ids = role_ids(db, roles).await?;
    let txn = db.begin().await?;
    user_role::Entity::delete_many()
        .filter(user_role::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?;
    link_roles(&txn, user_id, &role_ids).await?;
    txn.commit().await?;
    Ok(())
}

async fn link_roles<C: ConnectionTrait>(db: &C, user_id: i32, role_ids: &[i32]) -> Result<(), DbErr> {
    for role_id in role_ids {
        user_role::ActiveModel {
            user_id: Set(user_id),
            role_id: Set(*role_id),
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

/// Looks up role names, rejecting any that do not exist.
async fn role_ids(db: &DatabaseConnection, names: &[String]) -> AppResult<Vec<i32>> {
    let mut ids = Vec::with_capacity(names.len());
    let mut errors = FieldErrors::new();
    for (index, name) in names.iter().enumerate() {
        match role::Entity::find()
            .filter(role::Column::Name.eq(name.as_str()))
            .one(db)
            .await?
        {
            Some(role) if !ids.contains(&role.id) => ids.push(role.id),
            Some(_) => {}
            None => errors.add(
                format!("roles.{index}"),
                format!("The selected role '{name}' does not exist."),
            ),
        }
    }
    if errors.is_empty() {
        Ok(ids)
    } else {
        Err(AppError::Validation(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_random_and_url_safe() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn token_hash_is_stable_hex() {
        let hash = hash_token("abc");
        assert_eq!(hash, hash_token("abc"));
        assert_eq!(hash.len(), 64);
        assert_ne!(hash, hash_token("abd"));
    }

    #[test]
    fn password_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("battery staple", &hash));
        assert!(!verify_password("correct horse", "not-a-hash"));
    }
}
