use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "talents")]
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
    #[sea_orm(column_type = "Text", nullable)]
    pub requirements_en: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub requirements_am: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub requirements_or: Option<String>,
    pub category: Option<String>,
    pub status: TalentStatus,
    pub deadline: Option<Date>,
    pub image: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(EnumIter, DeriveActiveEnum, Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, utoipa::ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum TalentStatus {
    #[sea_orm(string_value = "open")]
    Open,
    #[sea_orm(string_value = "closed")]
    Closed,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::talent_application::Entity")]
    TalentApplication,
}

impl Related<super::talent_application::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TalentApplication.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
