use sea_orm_migration::prelude::*;

use crate::columns::id;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AccessToken::AccessTokens)
                    .if_not_exists()
                    .col(id(AccessToken::Id))
                    .col(ColumnDef::new(AccessToken::UserId).integer().not_null())
                    .col(ColumnDef::new(AccessToken::TokenHash).string().not_null().unique_key())
                    .col(ColumnDef::new(AccessToken::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(AccessToken::LastUsedAt).timestamp())
                    .col(ColumnDef::new(AccessToken::ExpiresAt).timestamp())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_access_token_user")
                            .from(AccessToken::AccessTokens, AccessToken::UserId)
                            .to(User::Users, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AccessToken::AccessTokens).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AccessToken {
    AccessTokens,
    Id,
    UserId,
    TokenHash,
    CreatedAt,
    LastUsedAt,
    ExpiresAt,
}

#[derive(DeriveIden)]
enum User {
    Users,
    Id,
}
