use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use crate::entities::event::{self, Entity as Event, EventType};
use crate::error::AppResult;
use crate::i18n::{Lang, Localized, LocalizedDraft};
use crate::resource::{now, patch, patch_localized, Resource};
use crate::services::media::{Category, MediaRef, MediaStore, Staging, UploadedFile};
use crate::validation::{present, FormData, FormReader, Mode, Presence};

const IMAGES: Category = Category::image("events");

pub struct Events;

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct EventFilter {
    /// `upcoming` or `past`
    #[serde(rename = "type")]
    pub event_type: Option<String>,
}

#[derive(Debug, Validate)]
pub struct EventDraft {
    title: LocalizedDraft,
    description: LocalizedDraft,
    event_type: Option<EventType>,
    #[validate(length(max = 255))]
    location: Option<Option<String>>,
    date: Option<NaiveDate>,
    time: Option<Option<String>>,
    image: Option<UploadedFile>,
}

#[async_trait]
impl Resource for Events {
    type Model = event::Model;
    type Draft = EventDraft;
    type Filter = EventFilter;

    const NAME: &'static str = "Event";
    const PATH: &'static str = "/events";
    const TAG: &'static str = "Events";

    fn id(model: &event::Model) -> i32 {
        model.id
    }

    fn read(form: &FormData, mode: Mode) -> AppResult<EventDraft> {
        let mut reader = FormReader::new(form, mode);
        let draft = EventDraft {
            title: reader.localized("title", Presence::English, Some(255)),
            description: reader.localized("description", Presence::Optional, None),
            event_type: reader.required_choice("type"),
            location: reader.text("location"),
            date: reader.required_date("date"),
            time: reader.time("time"),
            image: reader.file("image", IMAGES),
        };
        reader.finish(draft)
    }

    async fn list(
        db: &DatabaseConnection,
        filter: &EventFilter,
        _lang: Lang,
    ) -> Result<Vec<event::Model>, DbErr> {
        let mut query = Event::find();
        if let Some(kind) = &filter.event_type {
            query = query.filter(event::Column::EventType.eq(kind.as_str()));
        }
        query
            .order_by_desc(event::Column::Date)
            .order_by_desc(event::Column::Id)
            .all(db)
            .await
    }

    async fn find(db: &DatabaseConnection, id: i32) -> Result<Option<event::Model>, DbErr> {
        Event::find_by_id(id).one(db).await
    }

    async fn insert(
        db: &DatabaseConnection,
        draft: EventDraft,
        staging: &mut Staging,
    ) -> AppResult<event::Model> {
        let image = match &draft.image {
            Some(file) => Some(staging.stage(file, IMAGES).await?),
            None => None,
        };
        let (title_en, title_am, title_or) = draft.title.into_columns();
        let (description_en, description_am, description_or) = draft.description.into_columns();
        let timestamp = now();

        let model = event::ActiveModel {
            title_en: Set(title_en),
            title_am: Set(title_am),
            title_or: Set(title_or),
            description_en: Set(description_en),
            description_am: Set(description_am),
            description_or: Set(description_or),
            event_type: Set(present(draft.event_type, "type")?),
            location: Set(draft.location.flatten()),
            date: Set(present(draft.date, "date")?),
            time: Set(draft.time.flatten()),
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
        current: event::Model,
        draft: EventDraft,
        staging: &mut Staging,
    ) -> AppResult<event::Model> {
        let image = staging
            .stage_replacement(&current.image, draft.image.as_ref(), IMAGES)
            .await?;

        let mut active: event::ActiveModel = current.into();
        patch_localized(&mut active.title_en, &mut active.title_am, &mut active.title_or, draft.title);
        patch_localized(
            &mut active.description_en,
            &mut active.description_am,
            &mut active.description_or,
            draft.description,
        );
        patch(&mut active.event_type, draft.event_type);
        patch(&mut active.location, draft.location);
        patch(&mut active.date, draft.date);
        patch(&mut active.time, draft.time);
        active.image = Set(image);
        active.updated_at = Set(now());

        Ok(active.update(db).await?)
    }

    async fn remove(db: &DatabaseConnection, model: &event::Model) -> Result<(), DbErr> {
        Event::delete_by_id(model.id).exec(db).await?;
        Ok(())
    }

    fn media(model: &event::Model) -> Vec<MediaRef> {
        MediaRef::local(&model.image).into_iter().collect()
    }

    fn summary(model: &event::Model, lang: Lang, media: &MediaStore) -> Value {
        json!({
            "id": model.id,
            "title": title(model).project(lang),
            "description": description(model).project(lang),
            "type": model.event_type,
            "location": model.location,
            "date": model.date,
            "time": model.time,
            "image": media.url_for(&model.image),
            "created_at": model.created_at,
        })
    }

    fn detail(model: &event::Model, media: &MediaStore) -> Value {
        json!({
            "id": model.id,
            "title": title(model).to_json(),
            "description": description(model).to_json(),
            "type": model.event_type,
            "location": model.location,
            "date": model.date,
            "time": model.time,
            "image": media.url_for(&model.image),
            "created_at": model.created_at,
            "updated_at": model.updated_at,
        })
    }
}

fn title(model: &event::Model) -> Localized<'_> {
    Localized::new(&model.title_en, &model.title_am, &model.title_or)
}

fn description(model: &event::Model) -> Localized<'_> {
    Localized::new(&model.description_en, &model.description_am, &model.description_or)
}
