use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "festivals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title_en: Option<String>,
    pub title_am: Option<String>,
    pub title_or: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub description_en: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub description_am: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub description_or: Option<String>,
    pub location: Option<String>,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub cover_image: Option<String>,
    /// Ordered list of relative image paths.
    pub gallery: Json,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
