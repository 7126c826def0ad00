use sea_orm_migration::prelude::*;

use crate::columns::{id, timestamps};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut about = Table::create();
        about
            .table(AboutSection::AboutSections)
            .if_not_exists()
            .col(id(AboutSection::Id))
            .col(ColumnDef::new(AboutSection::Lang).string_len(5).not_null().unique_key())
            .col(ColumnDef::new(AboutSection::Title).string().not_null())
            .col(ColumnDef::new(AboutSection::Subtitle).string())
            .col(ColumnDef::new(AboutSection::Body).text())
            .col(ColumnDef::new(AboutSection::Image).string())
            .col(ColumnDef::new(AboutSection::Achievements).json())
            .col(ColumnDef::new(AboutSection::Philosophies).json());
        timestamps(&mut about);
        manager.create_table(about).await?;

        let mut contents = Table::create();
        contents
            .table(Content::Contents)
            .if_not_exists()
            .col(id(Content::Id))
            .col(ColumnDef::new(Content::Type).string_len(50).not_null())
            .col(ColumnDef::new(Content::Slug).string().not_null())
            .col(ColumnDef::new(Content::Lang).string_len(5).not_null())
            .col(ColumnDef::new(Content::Title).string().not_null())
            .col(ColumnDef::new(Content::Body).text())
            .col(ColumnDef::new(Content::Image).string())
            .col(ColumnDef::new(Content::Features).json());
        timestamps(&mut contents);
        manager.create_table(contents).await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_contents_type_slug_lang")
                    .table(Content::Contents)
                    .col(Content::Type)
                    .col(Content::Slug)
                    .col(Content::Lang)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Content::Contents).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AboutSection::AboutSections).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AboutSection {
    AboutSections,
    Id,
    Lang,
    Title,
    Subtitle,
    Body,
    Image,
    Achievements,
    Philosophies,
}

#[derive(DeriveIden)]
enum Content {
    Contents,
    Id,
    Type,
    Slug,
    Lang,
    Title,
    Body,
    Image,
    Features,
}
