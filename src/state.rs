use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::Config;
use crate::services::media::MediaStore;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub media: MediaStore,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, media: MediaStore, config: Config) -> Self {
        Self {
            db,
            media,
            config: Arc::new(config),
        }
    }
}
