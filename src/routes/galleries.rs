use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use crate::entities::gallery::{self, Entity as Gallery};
use crate::error::AppResult;
use crate::i18n::{Lang, Localized, LocalizedDraft};
use crate::resource::{merge_paths, now, or_default, patch, patch_localized, Resource};
use crate::services::media::{paths_from_json, Category, MediaRef, MediaStore, Staging, UploadedFile};
use crate::validation::{FormData, FormReader, Mode, Presence};

const COVERS: Category = Category::image("galleries/covers");
const IMAGES: Category = Category::image("galleries/images");

pub struct Galleries;

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct GalleryFilter {
    pub category: Option<String>,
}

#[derive(Debug, Validate)]
pub struct GalleryDraft {
    title: LocalizedDraft,
    description: LocalizedDraft,
    #[validate(length(max = 255))]
    category: Option<Option<String>>,
    sort_order: Option<i32>,
    cover_image: Option<UploadedFile>,
    images: Vec<UploadedFile>,
    remove_images: Option<Vec<String>>,
}

#[async_trait]
impl Resource for Galleries {
    type Model = gallery::Model;
    type Draft = GalleryDraft;
    type Filter = GalleryFilter;

    const NAME: &'static str = "Gallery";
    const PATH: &'static str = "/galleries";
    const TAG: &'static str = "Galleries";

    fn id(model: &gallery::Model) -> i32 {
        model.id
    }

    fn read(form: &FormData, mode: Mode) -> AppResult<GalleryDraft> {
        let mut reader = FormReader::new(form, mode);
        let draft = GalleryDraft {
            title: reader.localized("title", Presence::English, Some(255)),
            description: reader.localized("description", Presence::Optional, None),
            category: reader.text("category"),
            sort_order: reader.integer("sort_order").flatten(),
            cover_image: reader.file("cover_image", COVERS),
            images: reader.files("images", IMAGES),
            remove_images: reader.string_list("remove_images"),
        };
        reader.finish(draft)
    }

    async fn list(
        db: &DatabaseConnection,
        filter: &GalleryFilter,
        _lang: Lang,
    ) -> Result<Vec<gallery::Model>, DbErr> {
        let mut query = Gallery::find();
        if let Some(category) = &filter.category {
            query = query.filter(gallery::Column::Category.eq(category.as_str()));
        }
        query
            .order_by_asc(gallery::Column::SortOrder)
            .order_by_desc(gallery::Column::Id)
            .all(db)
            .await
    }

    async fn find(db: &DatabaseConnection, id: i32) -> Result<Option<gallery::Model>, DbErr> {
        Gallery::find_by_id(id).one(db).await
    }

    async fn insert(
        db: &DatabaseConnection,
        draft: GalleryDraft,
        staging: &mut Staging,
    ) -> AppResult<gallery::Model> {
        let cover_image = match &draft.cover_image {
            Some(file) => Some(staging.stage(file, COVERS).await?),
            None => None,
        };
        let images = staging.stage_all(&draft.images, IMAGES).await?;
        let (title_en, title_am, title_or) = draft.title.into_columns();
        let (description_en, description_am, description_or) = draft.description.into_columns();
        let timestamp = now();

        let model = gallery::ActiveModel {
            title_en: Set(title_en),
            title_am: Set(title_am),
            title_or: Set(title_or),
            description_en: Set(description_en),
            description_am: Set(description_am),
            description_or: Set(description_or),
            category: Set(draft.category.flatten()),
            sort_order: or_default(draft.sort_order, 0),
            cover_image: Set(cover_image),
            images: Set(json!(images)),
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
        current: gallery::Model,
        draft: GalleryDraft,
        staging: &mut Staging,
    ) -> AppResult<gallery::Model> {
        let cover_image = staging
            .stage_replacement(&current.cover_image, draft.cover_image.as_ref(), COVERS)
            .await?;
        let added = staging.stage_all(&draft.images, IMAGES).await?;
        let images = merge_paths(
            paths_from_json(&current.images),
            draft.remove_images,
            added,
            staging,
        );

        let mut active: gallery::ActiveModel = current.into();
        patch_localized(&mut active.title_en, &mut active.title_am, &mut active.title_or, draft.title);
        patch_localized(
            &mut active.description_en,
            &mut active.description_am,
            &mut active.description_or,
            draft.description,
        );
        patch(&mut active.category, draft.category);
        patch(&mut active.sort_order, draft.sort_order);
        active.cover_image = Set(cover_image);
        active.images = Set(json!(images));
        active.updated_at = Set(now());

        Ok(active.update(db).await?)
    }

    async fn remove(db: &DatabaseConnection, model: &gallery::Model) -> Result<(), DbErr> {
        Gallery::delete_by_id(model.id).exec(db).await?;
        Ok(())
    }

    fn media(model: &gallery::Model) -> Vec<MediaRef> {
        let mut files: Vec<MediaRef> = MediaRef::local(&model.cover_image).into_iter().collect();
        files.extend(MediaRef::locals(&paths_from_json(&model.images)));
        files
    }

    fn summary(model: &gallery::Model, lang: Lang, media: &MediaStore) -> Value {
        json!({
            "id": model.id,
            "title": title(model).project(lang),
            "description": description(model).project(lang),
            "category": model.category,
            "sort_order": model.sort_order,
            "cover_image": media.url_for(&model.cover_image),
            "images": media.urls_for(&paths_from_json(&model.images)),
        })
    }

    fn detail(model: &gallery::Model, media: &MediaStore) -> Value {
        json!({
            "id": model.id,
            "title": title(model).to_json(),
            "description": description(model).to_json(),
            "category": model.category,
            "sort_order": model.sort_order,
            "cover_image": media.url_for(&model.cover_image),
            "images": media.urls_for(&paths_from_json(&model.images)),
            "image_paths": model.images,
            "created_at": model.created_at,
            "updated_at": model.updated_at,
        })
    }
}

fn title(model: &gallery::Model) -> Localized<'_> {
    Localized::new(&model.title_en, &model.title_am, &model.title_or)
}

fn description(model: &gallery::Model) -> Localized<'_> {
    Localized::new(&model.description_en, &model.description_am, &model.description_or)
}
