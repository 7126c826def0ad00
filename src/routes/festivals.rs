use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, QueryOrder, Set,
};
use serde_json::{json, Value};
use validator::Validate;

use crate::entities::festival::{self, Entity as Festival};
use crate::error::AppResult;
use crate::i18n::{Lang, Localized, LocalizedDraft};
use crate::resource::{merge_paths, now, patch, patch_localized, NoFilter, Resource};
use crate::services::media::{paths_from_json, Category, MediaRef, MediaStore, Staging, UploadedFile};
use crate::validation::{present, FormData, FormReader, Mode, Presence};

const COVERS: Category = Category::image("festivals/covers");
const GALLERY: Category = Category::image("festivals/gallery");

pub struct Festivals;

#[derive(Debug, Validate)]
pub struct FestivalDraft {
    title: LocalizedDraft,
    description: LocalizedDraft,
    #[validate(length(max = 255))]
    location: Option<Option<String>>,
    start_date: Option<NaiveDate>,
    end_date: Option<Option<NaiveDate>>,
    cover_image: Option<UploadedFile>,
    gallery: Vec<UploadedFile>,
    remove_gallery: Option<Vec<String>>,
}

/// Reads a festival payload. On update `stored` holds the row's current
/// dates so a single supplied date is still compared against the other.
fn read_with(
    form: &FormData,
    mode: Mode,
    stored: Option<(NaiveDate, Option<NaiveDate>)>,
) -> AppResult<FestivalDraft> {
    let mut reader = FormReader::new(form, mode);
    let draft = FestivalDraft {
        title: reader.localized("title", Presence::English, Some(255)),
        description: reader.localized("description", Presence::Optional, None),
        location: reader.text("location"),
        start_date: reader.required_date("start_date"),
        end_date: reader.date("end_date"),
        cover_image: reader.file("cover_image", COVERS),
        gallery: reader.files("gallery", GALLERY),
        remove_gallery: reader.string_list("remove_gallery"),
    };

    if !reader.has_error("start_date") && !reader.has_error("end_date") {
        let start = draft.start_date.or(stored.map(|(start, _)| start));
        let end = draft.end_date.unwrap_or(stored.and_then(|(_, end)| end));
        if let (Some(start), Some(end)) = (start, end) {
            if end < start {
                reader.reject(
                    "end_date",
                    "The end date must be a date after or equal to start date.",
                );
            }
        }
    }
    reader.finish(draft)
}

#[async_trait]
impl Resource for Festivals {
    type Model = festival::Model;
    type Draft = FestivalDraft;
    type Filter = NoFilter;

    const NAME: &'static str = "Festival";
    const PATH: &'static str = "/festivals";
    const TAG: &'static str = "Festivals";

    fn id(model: &festival::Model) -> i32 {
        model.id
    }

    fn read(form: &FormData, mode: Mode) -> AppResult<FestivalDraft> {
        read_with(form, mode, None)
    }

    fn read_update(form: &FormData, current: &festival::Model) -> AppResult<FestivalDraft> {
        read_with(form, Mode::Update, Some((current.start_date, current.end_date)))
    }

    async fn list(
        db: &DatabaseConnection,
        _filter: &NoFilter,
        _lang: Lang,
    ) -> Result<Vec<festival::Model>, DbErr> {
        Festival::find()
            .order_by_desc(festival::Column::StartDate)
            .order_by_desc(festival::Column::Id)
            .all(db)
            .await
    }

    async fn find(db: &DatabaseConnection, id: i32) -> Result<Option<festival::Model>, DbErr> {
        Festival::find_by_id(id).one(db).await
    }

    async fn insert(
        db: &DatabaseConnection,
        draft: FestivalDraft,
        staging: &mut Staging,
    ) -> AppResult<festival::Model> {
        let start_date = present(draft.start_date, "start_date")?;
        let end_date = draft.end_date.flatten();

        let cover_image = match &draft.cover_image {
            Some(file) => Some(staging.stage(file, COVERS).await?),
            None => None,
        };
        let gallery = staging.stage_all(&draft.gallery, GALLERY).await?;
        let (title_en, title_am, title_or) = draft.title.into_columns();
        let (description_en, description_am, description_or) = draft.description.into_columns();
        let timestamp = now();

        let model = festival::ActiveModel {
            title_en: Set(title_en),
            title_am: Set(title_am),
            title_or: Set(title_or),
            description_en: Set(description_en),
            description_am: Set(description_am),
            description_or: Set(description_or),
            location: Set(draft.location.flatten()),
            start_date: Set(start_date),
            end_date: Set(end_date),
            cover_image: Set(cover_image),
            gallery: Set(json!(gallery)),
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
        current: festival::Model,
        draft: FestivalDraft,
        staging: &mut Staging,
    ) -> AppResult<festival::Model> {
        let start_date = draft.start_date.unwrap_or(current.start_date);
        let end_date = draft.end_date.unwrap_or(current.end_date);

        let cover_image = staging
            .stage_replacement(&current.cover_image, draft.cover_image.as_ref(), COVERS)
            .await?;
        let added = staging.stage_all(&draft.gallery, GALLERY).await?;
        let gallery = merge_paths(
            paths_from_json(&current.gallery),
            draft.remove_gallery,
            added,
            staging,
        );

        let mut active: festival::ActiveModel = current.into();
        patch_localized(&mut active.title_en, &mut active.title_am, &mut active.title_or, draft.title);
        patch_localized(
            &mut active.description_en,
            &mut active.description_am,
            &mut active.description_or,
            draft.description,
        );
        patch(&mut active.location, draft.location);
        active.start_date = Set(start_date);
        active.end_date = Set(end_date);
        active.cover_image = Set(cover_image);
        active.gallery = Set(json!(gallery));
        active.updated_at = Set(now());

        Ok(active.update(db).await?)
    }

    async fn remove(db: &DatabaseConnection, model: &festival::Model) -> Result<(), DbErr> {
        Festival::delete_by_id(model.id).exec(db).await?;
        Ok(())
    }

    fn media(model: &festival::Model) -> Vec<MediaRef> {
        let mut files: Vec<MediaRef> = MediaRef::local(&model.cover_image).into_iter().collect();
        files.extend(MediaRef::locals(&paths_from_json(&model.gallery)));
        files
    }

    fn summary(model: &festival::Model, lang: Lang, media: &MediaStore) -> Value {
        json!({
            "id": model.id,
            "title": title(model).project(lang),
            "description": description(model).project(lang),
            "location": model.location,
            "start_date": model.start_date,
            "end_date": model.end_date,
            "cover_image": media.url_for(&model.cover_image),
            "gallery": media.urls_for(&paths_from_json(&model.gallery)),
        })
    }

    fn detail(model: &festival::Model, media: &MediaStore) -> Value {
        json!({
            "id": model.id,
            "title": title(model).to_json(),
            "description": description(model).to_json(),
            "location": model.location,
            "start_date": model.start_date,
            "end_date": model.end_date,
            "cover_image": media.url_for(&model.cover_image),
            "gallery": media.urls_for(&paths_from_json(&model.gallery)),
            "gallery_paths": model.gallery,
            "created_at": model.created_at,
            "updated_at": model.updated_at,
        })
    }
}

fn title(model: &festival::Model) -> Localized<'_> {
    Localized::new(&model.title_en, &model.title_am, &model.title_or)
}

fn description(model: &festival::Model) -> Localized<'_> {
    Localized::new(&model.description_en, &model.description_am, &model.description_or)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn date(raw: &str) -> NaiveDate {
        raw.parse().unwrap()
    }

    #[test]
    fn end_before_start_is_reported_with_the_other_failures() {
        let form = FormData::default()
            .with_field("start_date", "2025-05-10")
            .with_field("end_date", "2025-05-01");
        let Err(AppError::Validation(errors)) = Festivals::read(&form, Mode::Create) else {
            panic!("expected a validation error");
        };
        assert!(errors.contains("title_en"));
        assert_eq!(
            errors.get("end_date").unwrap(),
            ["The end date must be a date after or equal to start date."]
        );
    }

    #[test]
    fn update_compares_a_single_date_with_the_stored_one() {
        let stored = Some((date("2025-05-10"), Some(date("2025-05-12"))));

        let early_end = FormData::default().with_field("end_date", "2025-05-09");
        let Err(AppError::Validation(errors)) = read_with(&early_end, Mode::Update, stored) else {
            panic!("expected a validation error");
        };
        assert!(errors.contains("end_date"));

        let late_start = FormData::default().with_field("start_date", "2025-05-13");
        assert!(read_with(&late_start, Mode::Update, stored).is_err());

        let cleared_end = FormData::default()
            .with_field("start_date", "2025-05-13")
            .with_field("end_date", serde_json::Value::Null);
        assert!(read_with(&cleared_end, Mode::Update, stored).is_ok());
    }

    #[test]
    fn same_day_festival_is_valid() {
        let form = FormData::default()
            .with_field("title_en", "Timket")
            .with_field("start_date", "2026-01-19")
            .with_field("end_date", "2026-01-19");
        let draft = Festivals::read(&form, Mode::Create).unwrap();
        assert_eq!(draft.end_date, Some(Some(date("2026-01-19"))));
    }
}
