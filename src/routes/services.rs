use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, QueryOrder, Set};
use serde_json::{json, Value};
use validator::Validate;

use crate::entities::service::{self, Entity as Service};
use crate::error::AppResult;
use crate::i18n::{Lang, Localized, LocalizedDraft};
use crate::resource::{now, or_default, patch, patch_localized, NoFilter, Resource};
use crate::services::media::{Category, MediaRef, MediaStore, Staging, UploadedFile};
use crate::validation::{FormData, FormReader, Mode, Presence};

const ICONS: Category = Category::image("services");

pub struct Services;

#[derive(Debug, Validate)]
pub struct ServiceDraft {
    title: LocalizedDraft,
    description: LocalizedDraft,
    features: Option<Option<Value>>,
    sort_order: Option<i32>,
    icon: Option<UploadedFile>,
}

#[async_trait]
impl Resource for Services {
    type Model = service::Model;
    type Draft = ServiceDraft;
    type Filter = NoFilter;

    const NAME: &'static str = "Service";
    const PATH: &'static str = "/services";
    const TAG: &'static str = "Services";

    fn id(model: &service::Model) -> i32 {
        model.id
    }

    fn read(form: &FormData, mode: Mode) -> AppResult<ServiceDraft> {
        let mut reader = FormReader::new(form, mode);
        let draft = ServiceDraft {
            title: reader.localized("title", Presence::English, Some(255)),
            description: reader.localized("description", Presence::Optional, None),
            features: reader.structured("features"),
            sort_order: reader.integer("sort_order").flatten(),
            icon: reader.file("icon", ICONS),
        };
        reader.finish(draft)
    }

    async fn list(
        db: &DatabaseConnection,
        _filter: &NoFilter,
        _lang: Lang,
    ) -> Result<Vec<service::Model>, DbErr> {
        Service::find()
            .order_by_asc(service::Column::SortOrder)
            .order_by_asc(service::Column::Id)
            .all(db)
            .await
    }

    async fn find(db: &DatabaseConnection, id: i32) -> Result<Option<service::Model>, DbErr> {
        Service::find_by_id(id).one(db).await
    }

    async fn insert(
        db: &DatabaseConnection,
        draft: ServiceDraft,
        staging: &mut Staging,
    ) -> AppResult<service::Model> {
        let icon = match &draft.icon {
            Some(file) => Some(staging.stage(file, ICONS).await?),
            None => None,
        };
        let (title_en, title_am, title_or) = draft.title.into_columns();
        let (description_en, description_am, description_or) = draft.description.into_columns();
        let timestamp = now();

        let model = service::ActiveModel {
            title_en: Set(title_en),
            title_am: Set(title_am),
            title_or: Set(title_or),
            description_en: Set(description_en),
            description_am: Set(description_am),
            description_or: Set(description_or),
            features: Set(draft.features.flatten().unwrap_or_else(|| json!([]))),
            sort_order: or_default(draft.sort_order, 0),
            icon: Set(icon),
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
        current: service::Model,
        draft: ServiceDraft,
        staging: &mut Staging,
    ) -> AppResult<service::Model> {
        let icon = staging
            .stage_replacement(&current.icon, draft.icon.as_ref(), ICONS)
            .await?;

        let mut active: service::ActiveModel = current.into();
        patch_localized(&mut active.title_en, &mut active.title_am, &mut active.title_or, draft.title);
        patch_localized(
            &mut active.description_en,
            &mut active.description_am,
            &mut active.description_or,
            draft.description,
        );
        patch(
            &mut active.features,
            draft.features.map(|f| f.unwrap_or_else(|| json!([]))),
        );
        patch(&mut active.sort_order, draft.sort_order);
        active.icon = Set(icon);
        active.updated_at = Set(now());

        Ok(active.update(db).await?)
    }

    async fn remove(db: &DatabaseConnection, model: &service::Model) -> Result<(), DbErr> {
        Service::delete_by_id(model.id).exec(db).await?;
        Ok(())
    }

    fn media(model: &service::Model) -> Vec<MediaRef> {
        MediaRef::local(&model.icon).into_iter().collect()
    }

    fn summary(model: &service::Model, lang: Lang, media: &MediaStore) -> Value {
        json!({
            "id": model.id,
            "title": title(model).project(lang),
            "description": description(model).project(lang),
            "features": model.features,
            "sort_order": model.sort_order,
            "icon": media.url_for(&model.icon),
        })
    }

    fn detail(model: &service::Model, media: &MediaStore) -> Value {
        json!({
            "id": model.id,
            "title": title(model).to_json(),
            "description": description(model).to_json(),
            "features": model.features,
            "sort_order": model.sort_order,
            "icon": media.url_for(&model.icon),
            "created_at": model.created_at,
            "updated_at": model.updated_at,
        })
    }
}

fn title(model: &service::Model) -> Localized<'_> {
    Localized::new(&model.title_en, &model.title_am, &model.title_or)
}

fn description(model: &service::Model) -> Localized<'_> {
    Localized::new(&model.description_en, &model.description_am, &model.description_or)
}
