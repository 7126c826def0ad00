use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;
use validator::Validate;

use crate::entities::video::{self, Entity as Video, SourceKind};
use crate::error::AppResult;
use crate::i18n::{Lang, Localized, LocalizedDraft};
use crate::resource::{now, patch, patch_localized, Resource};
use crate::services::media::{Category, MediaRef, MediaStore, Staging, UploadedFile};
use crate::validation::{present, FormData, FormReader, Mode, Presence};

const VIDEOS: Category = Category::video("videos");
const THUMBNAILS: Category = Category::image("videos/thumbnails");

pub struct Videos;

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct VideoFilter {
    pub category: Option<String>,
}

#[derive(Debug, Validate)]
pub struct VideoDraft {
    title: LocalizedDraft,
    description: LocalizedDraft,
    #[validate(length(max = 255))]
    category: Option<Option<String>>,
    #[validate(url)]
    source_url: Option<Option<String>>,
    video: Option<UploadedFile>,
    thumbnail: Option<UploadedFile>,
}

impl VideoDraft {
    fn external_url(&self) -> Option<&str> {
        self.source_url.as_ref()?.as_deref()
    }
}

/// Reads a video payload. `stored` is the current source kind on update:
/// clearing `source_url` only matters when the link is the source.
fn read_with(form: &FormData, mode: Mode, stored: Option<SourceKind>) -> AppResult<VideoDraft> {
    let mut reader = FormReader::new(form, mode);
    let draft = VideoDraft {
        title: reader.localized("title", Presence::English, Some(255)),
        description: reader.localized("description", Presence::Optional, None),
        category: reader.text("category"),
        source_url: reader.text("source_url"),
        video: reader.file("video", VIDEOS),
        thumbnail: reader.file("thumbnail", THUMBNAILS),
    };

    let has_source = draft.video.is_some() || draft.external_url().is_some();
    let needs_source = match mode {
        Mode::Create => true,
        Mode::Update => {
            matches!(draft.source_url, Some(None)) && stored != Some(SourceKind::Local)
        }
    };
    if needs_source && !has_source && !reader.has_error("video") {
        reader.reject(
            "source_url",
            "The source url field is required when video is not present.",
        );
    }
    reader.finish(draft)
}

#[async_trait]
impl Resource for Videos {
    type Model = video::Model;
    type Draft = VideoDraft;
    type Filter = VideoFilter;

    const NAME: &'static str = "Video";
    const PATH: &'static str = "/videos";
    const TAG: &'static str = "Videos";

    fn id(model: &video::Model) -> i32 {
        model.id
    }

    fn read(form: &FormData, mode: Mode) -> AppResult<VideoDraft> {
        read_with(form, mode, None)
    }

    fn read_update(form: &FormData, current: &video::Model) -> AppResult<VideoDraft> {
        read_with(form, Mode::Update, Some(current.source_kind))
    }

    async fn list(
        db: &DatabaseConnection,
        filter: &VideoFilter,
        _lang: Lang,
    ) -> Result<Vec<video::Model>, DbErr> {
        let mut query = Video::find();
        if let Some(category) = &filter.category {
            query = query.filter(video::Column::Category.eq(category.as_str()));
        }
        query.order_by_desc(video::Column::Id).all(db).await
    }

    async fn find(db: &DatabaseConnection, id: i32) -> Result<Option<video::Model>, DbErr> {
        Video::find_by_id(id).one(db).await
    }

    async fn insert(
        db: &DatabaseConnection,
        draft: VideoDraft,
        staging: &mut Staging,
    ) -> AppResult<video::Model> {
        let (source_kind, source) = match &draft.video {
            Some(file) => (SourceKind::Local, staging.stage(file, VIDEOS).await?),
            None => (
                SourceKind::External,
                present(draft.external_url().map(str::to_string), "source_url")?,
            ),
        };
        let thumbnail = match &draft.thumbnail {
            Some(file) => Some(staging.stage(file, THUMBNAILS).await?),
            None => None,
        };
        let (title_en, title_am, title_or) = draft.title.into_columns();
        let (description_en, description_am, description_or) = draft.description.into_columns();
        let timestamp = now();

        let model = video::ActiveModel {
            title_en: Set(title_en),
            title_am: Set(title_am),
            title_or: Set(title_or),
            description_en: Set(description_en),
            description_am: Set(description_am),
            description_or: Set(description_or),
            category: Set(draft.category.flatten()),
            source_kind: Set(source_kind),
            source: Set(source),
            thumbnail: Set(thumbnail),
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
        current: video::Model,
        draft: VideoDraft,
        staging: &mut Staging,
    ) -> AppResult<video::Model> {
        let replacement = match (&draft.video, draft.external_url()) {
            (Some(file), _) => Some((SourceKind::Local, staging.stage(file, VIDEOS).await?)),
            (None, Some(url)) => Some((SourceKind::External, url.to_string())),
            (None, None) => None,
        };
        if replacement.is_some() && current.source_kind == SourceKind::Local {
            staging.supersede([MediaRef::Local(current.source.clone())]);
        }
        let thumbnail = staging
            .stage_replacement(&current.thumbnail, draft.thumbnail.as_ref(), THUMBNAILS)
            .await?;

        let mut active: video::ActiveModel = current.into();
        patch_localized(&mut active.title_en, &mut active.title_am, &mut active.title_or, draft.title);
        patch_localized(
            &mut active.description_en,
            &mut active.description_am,
            &mut active.description_or,
            draft.description,
        );
        patch(&mut active.category, draft.category);
        if let Some((kind, source)) = replacement {
            active.source_kind = Set(kind);
            active.source = Set(source);
        }
        active.thumbnail = Set(thumbnail);
        active.updated_at = Set(now());

        Ok(active.update(db).await?)
    }

    async fn remove(db: &DatabaseConnection, model: &video::Model) -> Result<(), DbErr> {
        Video::delete_by_id(model.id).exec(db).await?;
        Ok(())
    }

    fn media(model: &video::Model) -> Vec<MediaRef> {
        let mut files: Vec<MediaRef> = source(model).into_iter().collect();
        files.extend(MediaRef::local(&model.thumbnail));
        files
    }

    fn summary(model: &video::Model, lang: Lang, media: &MediaStore) -> Value {
        json!({
            "id": model.id,
            "title": title(model).project(lang),
            "description": description(model).project(lang),
            "category": model.category,
            "source_type": model.source_kind,
            "source_url": source_url(model, media),
            "thumbnail": media.url_for(&model.thumbnail),
        })
    }

    fn detail(model: &video::Model, media: &MediaStore) -> Value {
        json!({
            "id": model.id,
            "title": title(model).to_json(),
            "description": description(model).to_json(),
            "category": model.category,
            "source_type": model.source_kind,
            "source_url": source_url(model, media),
            "thumbnail": media.url_for(&model.thumbnail),
            "created_at": model.created_at,
            "updated_at": model.updated_at,
        })
    }
}

fn source(model: &video::Model) -> Option<MediaRef> {
    match model.source_kind {
        SourceKind::Local => Some(MediaRef::Local(model.source.clone())),
        SourceKind::External => Url::parse(&model.source).ok().map(MediaRef::External),
    }
}

fn source_url(model: &video::Model, media: &MediaStore) -> Value {
    match source(model) {
        Some(source) => Value::String(media.to_public_url(&source)),
        None => Value::String(model.source.clone()),
    }
}

fn title(model: &video::Model) -> Localized<'_> {
    Localized::new(&model.title_en, &model.title_am, &model.title_or)
}

fn description(model: &video::Model) -> Localized<'_> {
    Localized::new(&model.description_en, &model.description_am, &model.description_or)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::services::media::tests::jpeg;
    use bytes::Bytes;

    fn mp4() -> UploadedFile {
        UploadedFile {
            file_name: "clip.mp4".into(),
            content_type: "video/mp4".into(),
            data: Bytes::from_static(b"\0\0\0\x18ftypmp42"),
        }
    }

    #[test]
    fn create_needs_an_upload_or_an_external_url() {
        let form = FormData::default().with_field("title_en", "Reel");
        let Err(AppError::Validation(errors)) = Videos::read(&form, Mode::Create) else {
            panic!("expected a validation error");
        };
        assert!(errors.contains("source_url"));

        let linked = form.clone().with_field("source_url", "https://youtu.be/abc");
        assert!(Videos::read(&linked, Mode::Create).is_ok());

        let uploaded = form.with_file("video", mp4());
        assert!(Videos::read(&uploaded, Mode::Create).is_ok());
    }

    #[test]
    fn external_source_must_be_a_url() {
        let form = FormData::default()
            .with_field("title_en", "Reel")
            .with_field("source_url", "not a url");
        let Err(AppError::Validation(errors)) = Videos::read(&form, Mode::Create) else {
            panic!("expected a validation error");
        };
        assert!(errors.contains("source_url"));
    }

    #[test]
    fn an_image_is_not_a_video() {
        let form = FormData::default()
            .with_field("title_en", "Reel")
            .with_file("video", jpeg(64));
        let Err(AppError::Validation(errors)) = Videos::read(&form, Mode::Create) else {
            panic!("expected a validation error");
        };
        assert!(errors.get("video").unwrap()[0].contains("mp4, mov, avi"));
    }

    #[test]
    fn update_may_leave_the_source_alone() {
        let form = FormData::default().with_field("category", "music");
        assert!(Videos::read(&form, Mode::Update).is_ok());
    }

    #[test]
    fn missing_source_is_reported_alongside_other_failures() {
        let form = FormData::default().with_field("category", "music");
        let Err(AppError::Validation(errors)) = Videos::read(&form, Mode::Create) else {
            panic!("expected a validation error");
        };
        assert!(errors.contains("title_en"));
        assert!(errors.contains("source_url"));
    }

    #[test]
    fn blank_link_only_clears_an_external_source() {
        let form = FormData::default().with_field("source_url", "");

        let uploaded = read_with(&form, Mode::Update, Some(SourceKind::Local));
        assert!(uploaded.is_ok());

        let Err(AppError::Validation(errors)) =
            read_with(&form, Mode::Update, Some(SourceKind::External))
        else {
            panic!("expected a validation error");
        };
        assert!(errors.contains("source_url"));
    }
}
