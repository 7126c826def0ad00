use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use crate::entities::product::{self, Entity as Product};
use crate::error::AppResult;
use crate::i18n::{Lang, Localized, LocalizedDraft};
use crate::resource::{now, or_default, patch, patch_localized, Resource};
use crate::services::media::{Category, MediaRef, MediaStore, Staging, UploadedFile};
use crate::validation::{FormData, FormReader, Mode, Presence};

const IMAGES: Category = Category::image("products");

pub struct Products;

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct ProductFilter {
    pub category: Option<String>,
}

#[derive(Debug, Validate)]
pub struct ProductDraft {
    name: LocalizedDraft,
    description: LocalizedDraft,
    #[validate(length(max = 255))]
    category: Option<Option<String>>,
    #[validate(range(min = 0.0))]
    price: Option<Option<f64>>,
    #[validate(url)]
    purchase_url: Option<Option<String>>,
    is_available: Option<bool>,
    image: Option<UploadedFile>,
}

#[async_trait]
impl Resource for Products {
    type Model = product::Model;
    type Draft = ProductDraft;
    type Filter = ProductFilter;

    const NAME: &'static str = "Product";
    const PATH: &'static str = "/products";
    const TAG: &'static str = "Products";

    fn id(model: &product::Model) -> i32 {
        model.id
    }

    fn read(form: &FormData, mode: Mode) -> AppResult<ProductDraft> {
        let mut reader = FormReader::new(form, mode);
        let draft = ProductDraft {
            name: reader.localized("name", Presence::English, Some(255)),
            description: reader.localized("description", Presence::Optional, None),
            category: reader.text("category"),
            price: reader.number("price"),
            purchase_url: reader.text("purchase_url"),
            is_available: reader.boolean("is_available"),
            image: reader.file("image", IMAGES),
        };
        reader.finish(draft)
    }

    async fn list(
        db: &DatabaseConnection,
        filter: &ProductFilter,
        _lang: Lang,
    ) -> Result<Vec<product::Model>, DbErr> {
        let mut query = Product::find();
        if let Some(category) = &filter.category {
            query = query.filter(product::Column::Category.eq(category.as_str()));
        }
        query.order_by_desc(product::Column::Id).all(db).await
    }

    async fn find(db: &DatabaseConnection, id: i32) -> Result<Option<product::Model>, DbErr> {
        Product::find_by_id(id).one(db).await
    }

    async fn insert(
        db: &DatabaseConnection,
        draft: ProductDraft,
        staging: &mut Staging,
    ) -> AppResult<product::Model> {
        let image = match &draft.image {
            Some(file) => Some(staging.stage(file, IMAGES).await?),
            None => None,
        };
        let (name_en, name_am, name_or) = draft.name.into_columns();
        let (description_en, description_am, description_or) = draft.description.into_columns();
        let timestamp = now();

        let model = product::ActiveModel {
            name_en: Set(name_en),
            name_am: Set(name_am),
            name_or: Set(name_or),
            description_en: Set(description_en),
            description_am: Set(description_am),
            description_or: Set(description_or),
            category: Set(draft.category.flatten()),
            price: Set(draft.price.flatten()),
            purchase_url: Set(draft.purchase_url.flatten()),
            is_available: or_default(draft.is_available, true),
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
        current: product::Model,
        draft: ProductDraft,
        staging: &mut Staging,
    ) -> AppResult<product::Model> {
        let image = staging
            .stage_replacement(&current.image, draft.image.as_ref(), IMAGES)
            .await?;

        let mut active: product::ActiveModel = current.into();
        patch_localized(&mut active.name_en, &mut active.name_am, &mut active.name_or, draft.name);
        patch_localized(
            &mut active.description_en,
            &mut active.description_am,
            &mut active.description_or,
            draft.description,
        );
        patch(&mut active.category, draft.category);
        patch(&mut active.price, draft.price);
        patch(&mut active.purchase_url, draft.purchase_url);
        patch(&mut active.is_available, draft.is_available);
        active.image = Set(image);
        active.updated_at = Set(now());

        Ok(active.update(db).await?)
    }

    async fn remove(db: &DatabaseConnection, model: &product::Model) -> Result<(), DbErr> {
        Product::delete_by_id(model.id).exec(db).await?;
        Ok(())
    }

    fn media(model: &product::Model) -> Vec<MediaRef> {
        MediaRef::local(&model.image).into_iter().collect()
    }

    fn summary(model: &product::Model, lang: Lang, media: &MediaStore) -> Value {
        json!({
            "id": model.id,
            "name": name(model).project(lang),
            "description": description(model).project(lang),
            "category": model.category,
            "price": model.price,
            "purchase_url": model.purchase_url,
            "is_available": model.is_available,
            "image": media.url_for(&model.image),
        })
    }

    fn detail(model: &product::Model, media: &MediaStore) -> Value {
        json!({
            "id": model.id,
            "name": name(model).to_json(),
            "description": description(model).to_json(),
            "category": model.category,
            "price": model.price,
            "purchase_url": model.purchase_url,
            "is_available": model.is_available,
            "image": media.url_for(&model.image),
            "created_at": model.created_at,
            "updated_at": model.updated_at,
        })
    }
}

fn name(model: &product::Model) -> Localized<'_> {
    Localized::new(&model.name_en, &model.name_am, &model.name_or)
}

fn description(model: &product::Model) -> Localized<'_> {
    Localized::new(&model.description_en, &model.description_am, &model.description_or)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn price_and_purchase_link_are_checked() {
        let form = FormData::default()
            .with_field("name_en", "Vinyl")
            .with_field("price", "-1")
            .with_field("purchase_url", "shop/vinyl");
        let Err(AppError::Validation(errors)) = Products::read(&form, Mode::Create) else {
            panic!("expected a validation error");
        };
        assert!(errors.contains("price"));
        assert!(errors.contains("purchase_url"));
    }

    #[test]
    fn free_products_are_allowed() {
        let form = FormData::default()
            .with_field("name_en", "Sampler")
            .with_field("price", 0)
            .with_field("purchase_url", "https://shop.example.com/sampler")
            .with_field("is_available", "0");
        let draft = Products::read(&form, Mode::Create).unwrap();
        assert_eq!(draft.price, Some(Some(0.0)));
        assert_eq!(draft.is_available, Some(false));
    }

    #[test]
    fn price_must_be_numeric() {
        let form = FormData::default()
            .with_field("name_en", "Vinyl")
            .with_field("price", "ten");
        let Err(AppError::Validation(errors)) = Products::read(&form, Mode::Create) else {
            panic!("expected a validation error");
        };
        assert!(errors.contains("price"));
    }
}
