pub mod config;
pub mod entities;
pub mod error;
pub mod i18n;
pub mod middleware;
pub mod pagination;
pub mod resource;
pub mod routes;
pub mod services;
pub mod state;
pub mod validation;

use std::sync::Arc;

use axum::Router;
use sea_orm::DatabaseConnection;

use crate::config::{Config, MediaDriver};
use crate::services::media::MediaStore;
use crate::services::s3::S3Storage;
use crate::services::storage::{LocalDiskStorage, StorageBackend};
use crate::state::AppState;

/// Media store for the configured driver.
pub async fn media_store(config: &Config) -> MediaStore {
    let backend: Arc<dyn StorageBackend> = match &config.media {
        MediaDriver::Local { root } => Arc::new(LocalDiskStorage::new(root.clone())),
        MediaDriver::S3(settings) => Arc::new(S3Storage::new(settings).await),
    };
    MediaStore::new(backend, config.media_base_url())
}

/// The complete HTTP application over an already migrated database.
pub async fn build_app(db: DatabaseConnection, config: Config) -> Router {
    let media = media_store(&config).await;
    routes::create_routes(AppState::new(db, media, config))
}
