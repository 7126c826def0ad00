use sea_orm_migration::prelude::*;

use crate::columns::{id, json_list, localized_string, localized_text, timestamps};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut services = Table::create();
        services
            .table(Service::Services)
            .if_not_exists()
            .col(id(Service::Id));
        localized_string(&mut services, "title");
        localized_text(&mut services, "description");
        services
            .col(json_list(Service::Features))
            .col(ColumnDef::new(Service::SortOrder).integer().not_null().default(0))
            .col(ColumnDef::new(Service::Icon).string());
        timestamps(&mut services);
        manager.create_table(services).await?;

        let mut products = Table::create();
        products
            .table(Product::Products)
            .if_not_exists()
            .col(id(Product::Id));
        localized_string(&mut products, "name");
        localized_text(&mut products, "description");
        products
            .col(ColumnDef::new(Product::Category).string())
            .col(ColumnDef::new(Product::Price).double())
            .col(ColumnDef::new(Product::PurchaseUrl).string())
            .col(ColumnDef::new(Product::IsAvailable).boolean().not_null().default(true))
            .col(ColumnDef::new(Product::Image).string());
        timestamps(&mut products);
        manager.create_table(products).await?;

        let mut awards = Table::create();
        awards.table(Award::Awards).if_not_exists().col(id(Award::Id));
        localized_string(&mut awards, "title");
        localized_text(&mut awards, "description");
        awards
            .col(ColumnDef::new(Award::Organization).string())
            .col(ColumnDef::new(Award::Year).integer())
            .col(ColumnDef::new(Award::Image).string());
        timestamps(&mut awards);
        manager.create_table(awards).await?;

        let mut videos = Table::create();
        videos.table(Video::Videos).if_not_exists().col(id(Video::Id));
        localized_string(&mut videos, "title");
        localized_text(&mut videos, "description");
        videos
            .col(ColumnDef::new(Video::Category).string())
            .col(ColumnDef::new(Video::SourceKind).string_len(20).not_null())
            .col(ColumnDef::new(Video::Source).string().not_null())
            .col(ColumnDef::new(Video::Thumbnail).string());
        timestamps(&mut videos);
        manager.create_table(videos).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Video::Videos).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Award::Awards).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Product::Products).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Service::Services).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Service {
    Services,
    Id,
    Features,
    SortOrder,
    Icon,
}

#[derive(DeriveIden)]
enum Product {
    Products,
    Id,
    Category,
    Price,
    PurchaseUrl,
    IsAvailable,
    Image,
}

#[derive(DeriveIden)]
enum Award {
    Awards,
    Id,
    Organization,
    Year,
    Image,
}

#[derive(DeriveIden)]
enum Video {
    Videos,
    Id,
    Category,
    SourceKind,
    Source,
    Thumbnail,
}
