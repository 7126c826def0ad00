use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use crate::entities::project::{self, Entity as Project};
use crate::error::AppResult;
use crate::i18n::{Lang, Localized, LocalizedDraft};
use crate::resource::{now, or_default, patch, patch_localized, Resource};
use crate::services::media::{Category, MediaRef, MediaStore, Staging, UploadedFile};
use crate::validation::{FormData, FormReader, Mode, Presence};

const IMAGES: Category = Category::image("projects");

pub struct Projects;

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct ProjectFilter {
    pub category: Option<String>,
}

#[derive(Debug, Validate)]
pub struct ProjectDraft {
    title: LocalizedDraft,
    description: LocalizedDraft,
    #[validate(length(max = 255))]
    category: Option<Option<String>>,
    #[validate(url)]
    project_url: Option<Option<String>>,
    technologies: Option<Option<Value>>,
    sort_order: Option<i32>,
    image: Option<UploadedFile>,
}

#[async_trait]
impl Resource for Projects {
    type Model = project::Model;
    type Draft = ProjectDraft;
    type Filter = ProjectFilter;

    const NAME: &'static str = "Project";
    const PATH: &'static str = "/projects";
    const TAG: &'static str = "Projects";

    fn id(model: &project::Model) -> i32 {
        model.id
    }

    fn read(form: &FormData, mode: Mode) -> AppResult<ProjectDraft> {
        let mut reader = FormReader::new(form, mode);
        let draft = ProjectDraft {
            title: reader.localized("title", Presence::English, Some(255)),
            description: reader.localized("description", Presence::Optional, None),
            category: reader.text("category"),
            project_url: reader.text("project_url"),
            technologies: reader.structured("technologies"),
            sort_order: reader.integer("sort_order").flatten(),
            image: reader.file("image", IMAGES),
        };
        reader.finish(draft)
    }

    async fn list(
        db: &DatabaseConnection,
        filter: &ProjectFilter,
        _lang: Lang,
    ) -> Result<Vec<project::Model>, DbErr> {
        let mut query = Project::find();
        if let Some(category) = &filter.category {
            query = query.filter(project::Column::Category.eq(category.as_str()));
        }
        query
            .order_by_asc(project::Column::SortOrder)
            .order_by_desc(project::Column::Id)
            .all(db)
            .await
    }

    async fn find(db: &DatabaseConnection, id: i32) -> Result<Option<project::Model>, DbErr> {
        Project::find_by_id(id).one(db).await
    }

    async fn insert(
        db: &DatabaseConnection,
        draft: ProjectDraft,
        staging: &mut Staging,
    ) -> AppResult<project::Model> {
        let image = match &draft.image {
            Some(file) => Some(staging.stage(file, IMAGES).await?),
            None => None,
        };
        let (title_en, title_am, title_or) = draft.title.into_columns();
        let (description_en, description_am, description_or) = draft.description.into_columns();
        let timestamp = now();

        let model = project::ActiveModel {
            title_en: Set(title_en),
            title_am: Set(title_am),
            title_or: Set(title_or),
            description_en: Set(description_en),
            description_am: Set(description_am),
            description_or: Set(description_or),
            category: Set(draft.category.flatten()),
            project_url: Set(draft.project_url.flatten()),
            technologies: Set(draft.technologies.flatten().unwrap_or_else(|| json!([]))),
            sort_order: or_default(draft.sort_order, 0),
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
        current: project::Model,
        draft: ProjectDraft,
        staging: &mut Staging,
    ) -> AppResult<project::Model> {
        let image = staging
            .stage_replacement(&current.image, draft.image.as_ref(), IMAGES)
            .await?;

        let mut active: project::ActiveModel = current.into();
        patch_localized(&mut active.title_en, &mut active.title_am, &mut active.title_or, draft.title);
        patch_localized(
            &mut active.description_en,
            &mut active.description_am,
            &mut active.description_or,
            draft.description,
        );
        patch(&mut active.category, draft.category);
        patch(&mut active.project_url, draft.project_url);
        patch(
            &mut active.technologies,
            draft.technologies.map(|t| t.unwrap_or_else(|| json!([]))),
        );
        patch(&mut active.sort_order, draft.sort_order);
        active.image = Set(image);
        active.updated_at = Set(now());

        Ok(active.update(db).await?)
    }

    async fn remove(db: &DatabaseConnection, model: &project::Model) -> Result<(), DbErr> {
        Project::delete_by_id(model.id).exec(db).await?;
        Ok(())
    }

    fn media(model: &project::Model) -> Vec<MediaRef> {
        MediaRef::local(&model.image).into_iter().collect()
    }

    fn summary(model: &project::Model, lang: Lang, media: &MediaStore) -> Value {
        json!({
            "id": model.id,
            "title": title(model).project(lang),
            "description": description(model).project(lang),
            "category": model.category,
            "project_url": model.project_url,
            "technologies": model.technologies,
            "sort_order": model.sort_order,
            "image": media.url_for(&model.image),
        })
    }

    fn detail(model: &project::Model, media: &MediaStore) -> Value {
        json!({
            "id": model.id,
            "title": title(model).to_json(),
            "description": description(model).to_json(),
            "category": model.category,
            "project_url": model.project_url,
            "technologies": model.technologies,
            "sort_order": model.sort_order,
            "image": media.url_for(&model.image),
            "created_at": model.created_at,
            "updated_at": model.updated_at,
        })
    }
}

fn title(model: &project::Model) -> Localized<'_> {
    Localized::new(&model.title_en, &model.title_am, &model.title_or)
}

fn description(model: &project::Model) -> Localized<'_> {
    Localized::new(&model.description_en, &model.description_am, &model.description_or)
}
