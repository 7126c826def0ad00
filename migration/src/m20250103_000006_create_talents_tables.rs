use sea_orm_migration::prelude::*;

use crate::columns::{id, localized_string, localized_text, timestamps};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut talents = Table::create();
        talents.table(Talent::Talents).if_not_exists().col(id(Talent::Id));
        localized_string(&mut talents, "title");
        localized_text(&mut talents, "description");
        localized_text(&mut talents, "requirements");
        talents
            .col(ColumnDef::new(Talent::Category).string())
            .col(ColumnDef::new(Talent::Status).string_len(20).not_null())
            .col(ColumnDef::new(Talent::Deadline).date())
            .col(ColumnDef::new(Talent::Image).string());
        timestamps(&mut talents);
        manager.create_table(talents).await?;

        let mut applications = Table::create();
        applications
            .table(TalentApplication::TalentApplications)
            .if_not_exists()
            .col(id(TalentApplication::Id))
            .col(ColumnDef::new(TalentApplication::TalentId).integer().not_null())
            .col(ColumnDef::new(TalentApplication::FullName).string().not_null())
            .col(ColumnDef::new(TalentApplication::Email).string().not_null())
            .col(ColumnDef::new(TalentApplication::Phone).string())
            .col(ColumnDef::new(TalentApplication::Message).text())
            .col(ColumnDef::new(TalentApplication::Photo).string())
            .foreign_key(
                ForeignKey::create()
                    .name("fk_talent_application_talent")
                    .from(TalentApplication::TalentApplications, TalentApplication::TalentId)
                    .to(Talent::Talents, Talent::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            );
        timestamps(&mut applications);
        manager.create_table(applications).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TalentApplication::TalentApplications).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Talent::Talents).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Talent {
    Talents,
    Id,
    Category,
    Status,
    Deadline,
    Image,
}

#[derive(DeriveIden)]
enum TalentApplication {
    TalentApplications,
    Id,
    TalentId,
    FullName,
    Email,
    Phone,
    Message,
    Photo,
}
