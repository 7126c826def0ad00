use sea_orm_migration::prelude::*;

use crate::columns::{id, timestamps};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut messages = Table::create();
        messages
            .table(ContactMessage::ContactMessages)
            .if_not_exists()
            .col(id(ContactMessage::Id))
            .col(ColumnDef::new(ContactMessage::Name).string().not_null())
            .col(ColumnDef::new(ContactMessage::Email).string().not_null())
            .col(ColumnDef::new(ContactMessage::Subject).string())
            .col(ColumnDef::new(ContactMessage::Message).text().not_null())
            .col(ColumnDef::new(ContactMessage::IsRead).boolean().not_null().default(false));
        timestamps(&mut messages);
        manager.create_table(messages).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ContactMessage::ContactMessages).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ContactMessage {
    ContactMessages,
    Id,
    Name,
    Email,
    Subject,
    Message,
    IsRead,
}
