use sea_orm_migration::prelude::*;

use crate::columns::{id, json_list, localized_string, localized_text, timestamps};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut events = Table::create();
        events.table(Event::Events).if_not_exists().col(id(Event::Id));
        localized_string(&mut events, "title");
        localized_text(&mut events, "description");
        events
            .col(ColumnDef::new(Event::Type).string_len(20).not_null())
            .col(ColumnDef::new(Event::Location).string())
            .col(ColumnDef::new(Event::Date).date().not_null())
            .col(ColumnDef::new(Event::Time).string_len(8))
            .col(ColumnDef::new(Event::Image).string());
        timestamps(&mut events);
        manager.create_table(events).await?;

        let mut festivals = Table::create();
        festivals
            .table(Festival::Festivals)
            .if_not_exists()
            .col(id(Festival::Id));
        localized_string(&mut festivals, "title");
        localized_text(&mut festivals, "description");
        festivals
            .col(ColumnDef::new(Festival::Location).string())
            .col(ColumnDef::new(Festival::StartDate).date().not_null())
            .col(ColumnDef::new(Festival::EndDate).date())
            .col(ColumnDef::new(Festival::CoverImage).string())
            .col(json_list(Festival::Gallery));
        timestamps(&mut festivals);
        manager.create_table(festivals).await?;

        let mut galleries = Table::create();
        galleries
            .table(Gallery::Galleries)
            .if_not_exists()
            .col(id(Gallery::Id));
        localized_string(&mut galleries, "title");
        localized_text(&mut galleries, "description");
        galleries
            .col(ColumnDef::new(Gallery::Category).string())
            .col(ColumnDef::new(Gallery::SortOrder).integer().not_null().default(0))
            .col(ColumnDef::new(Gallery::CoverImage).string())
            .col(json_list(Gallery::Images));
        timestamps(&mut galleries);
        manager.create_table(galleries).await?;

        let mut projects = Table::create();
        projects
            .table(Project::Projects)
            .if_not_exists()
            .col(id(Project::Id));
        localized_string(&mut projects, "title");
        localized_text(&mut projects, "description");
        projects
            .col(ColumnDef::new(Project::Category).string())
            .col(ColumnDef::new(Project::ProjectUrl).string())
            .col(json_list(Project::Technologies))
            .col(ColumnDef::new(Project::SortOrder).integer().not_null().default(0))
            .col(ColumnDef::new(Project::Image).string());
        timestamps(&mut projects);
        manager.create_table(projects).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Project::Projects).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Gallery::Galleries).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Festival::Festivals).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Event::Events).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Event {
    Events,
    Id,
    Type,
    Location,
    Date,
    Time,
    Image,
}

#[derive(DeriveIden)]
enum Festival {
    Festivals,
    Id,
    Location,
    StartDate,
    EndDate,
    CoverImage,
    Gallery,
}

#[derive(DeriveIden)]
enum Gallery {
    Galleries,
    Id,
    Category,
    SortOrder,
    CoverImage,
    Images,
}

#[derive(DeriveIden)]
enum Project {
    Projects,
    Id,
    Category,
    ProjectUrl,
    Technologies,
    SortOrder,
    Image,
}
