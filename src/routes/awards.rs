use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use crate::entities::award::{self, Entity as Award};
use crate::error::AppResult;
use crate::i18n::{Lang, Localized, LocalizedDraft};
use crate::resource::{now, patch, patch_localized, Resource};
use crate::services::media::{Category, MediaRef, MediaStore, Staging, UploadedFile};
use crate::validation::{FormData, FormReader, Mode, Presence};

const IMAGES: Category = Category::image("awards");

pub struct Awards;

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct AwardFilter {
    pub year: Option<i32>,
}

#[derive(Debug, Validate)]
pub struct AwardDraft {
    title: LocalizedDraft,
    description: LocalizedDraft,
    #[validate(length(max = 255))]
    organization: Option<Option<String>>,
    #[validate(range(min = 1900, max = 2100))]
    year: Option<Option<i32>>,
    image: Option<UploadedFile>,
}

#[async_trait]
impl Resource for Awards {
    type Model = award::Model;
    type Draft = AwardDraft;
    type Filter = AwardFilter;

    const NAME: &'static str = "Award";
    const PATH: &'static str = "/awards";
    const TAG: &'static str = "Awards";

    fn id(model: &award::Model) -> i32 {
        model.id
    }

    fn read(form: &FormData, mode: Mode) -> AppResult<AwardDraft> {
        let mut reader = FormReader::new(form, mode);
        let draft = AwardDraft {
            title: reader.localized("title", Presence::All, Some(255)),
            description: reader.localized("description", Presence::Optional, None),
            organization: reader.text("organization"),
            year: reader.integer("year"),
            image: reader.file("image", IMAGES),
        };
        reader.finish(draft)
    }

    async fn list(
        db: &DatabaseConnection,
        filter: &AwardFilter,
        _lang: Lang,
    ) -> Result<Vec<award::Model>, DbErr> {
        let mut query = Award::find();
        if let Some(year) = filter.year {
            query = query.filter(award::Column::Year.eq(year));
        }
        query
            .order_by_desc(award::Column::Year)
            .order_by_desc(award::Column::Id)
            .all(db)
            .await
    }

    async fn find(db: &DatabaseConnection, id: i32) -> Result<Option<award::Model>, DbErr> {
        Award::find_by_id(id).one(db).await
    }

    async fn insert(
        db: &DatabaseConnection,
        draft: AwardDraft,
        staging: &mut Staging,
    ) -> AppResult<award::Model> {
        let image = match &draft.image {
            Some(file) => Some(staging.stage(file, IMAGES).await?),
            None => None,
        };
        let (title_en, title_am, title_or) = draft.title.into_columns();
        let (description_en, description_am, description_or) = draft.description.into_columns();
        let timestamp = now();

        let model = award::ActiveModel {
            title_en: Set(title_en),
            title_am: Set(title_am),
            title_or: Set(title_or),
            description_en: Set(description_en),
            description_am: Set(description_am),
            description_or: Set(description_or),
            organization: Set(draft.organization.flatten()),
            year: Set(draft.year.flatten()),
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
        current: award::Model,
        draft: AwardDraft,
        staging: &mut Staging,
    ) -> AppResult<award::Model> {
        let image = staging
            .stage_replacement(&current.image, draft.image.as_ref(), IMAGES)
            .await?;

        let mut active: award::ActiveModel = current.into();
        patch_localized(&mut active.title_en, &mut active.title_am, &mut active.title_or, draft.title);
        patch_localized(
            &mut active.description_en,
            &mut active.description_am,
            &mut active.description_or,
            draft.description,
        );
        patch(&mut active.organization, draft.organization);
        patch(&mut active.year, draft.year);
        active.image = Set(image);
        active.updated_at = Set(now());

        Ok(active.update(db).await?)
    }

    async fn remove(db: &DatabaseConnection, model: &award::Model) -> Result<(), DbErr> {
        Award::delete_by_id(model.id).exec(db).await?;
        Ok(())
    }

    fn media(model: &award::Model) -> Vec<MediaRef> {
        MediaRef::local(&model.image).into_iter().collect()
    }

    fn summary(model: &award::Model, lang: Lang, media: &MediaStore) -> Value {
        json!({
            "id": model.id,
            "title": title(model).project(lang),
            "description": description(model).project(lang),
            "organization": model.organization,
            "year": model.year,
            "image": media.url_for(&model.image),
        })
    }

    fn detail(model: &award::Model, media: &MediaStore) -> Value {
        json!({
            "id": model.id,
            "title": title(model).to_json(),
            "description": description(model).to_json(),
            "organization": model.organization,
            "year": model.year,
            "image": media.url_for(&model.image),
            "created_at": model.created_at,
            "updated_at": model.updated_at,
        })
    }
}

fn title(model: &award::Model) -> Localized<'_> {
    Localized::new(&model.title_en, &model.title_am, &model.title_or)
}

fn description(model: &award::Model) -> Localized<'_> {
    Localized::new(&model.description_en, &model.description_am, &model.description_or)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn errors_for(form: &FormData, mode: Mode) -> crate::error::FieldErrors {
        match Awards::read(form, mode) {
            Err(AppError::Validation(errors)) => errors,
            _ => panic!("expected a validation error"),
        }
    }

    #[test]
    fn title_is_needed_in_every_language() {
        let form = FormData::default().with_field("title_en", "Best Album");
        let errors = errors_for(&form, Mode::Create);
        assert!(errors.contains("title_am"));
        assert!(errors.contains("title_or"));
        assert!(!errors.contains("title_en"));
    }

    #[test]
    fn year_must_be_plausible() {
        let form = FormData::default()
            .with_field("title_en", "Best Album")
            .with_field("title_am", "ምርጥ አልበም")
            .with_field("title_or", "Albamii Filatamaa")
            .with_field("year", "1850");
        let errors = errors_for(&form, Mode::Create);
        assert!(errors.contains("year"));

        let form = form.with_field("year", 2019);
        let draft = Awards::read(&form, Mode::Create).unwrap();
        assert_eq!(draft.year, Some(Some(2019)));
    }

    #[test]
    fn update_checks_only_supplied_titles() {
        let form = FormData::default().with_field("organization", "Music Awards");
        assert!(Awards::read(&form, Mode::Update).is_ok());

        let form = FormData::default().with_field("title_am", "");
        assert!(errors_for(&form, Mode::Update).contains("title_am"));
    }
}
