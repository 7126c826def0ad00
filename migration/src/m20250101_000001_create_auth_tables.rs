use sea_orm_migration::prelude::*;

use crate::columns::{id, timestamps};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut users = Table::create();
        users
            .table(User::Users)
            .if_not_exists()
            .col(id(User::Id))
            .col(ColumnDef::new(User::Name).string().not_null())
            .col(ColumnDef::new(User::Email).string().not_null().unique_key())
            .col(ColumnDef::new(User::Password).string().not_null())
            .col(ColumnDef::new(User::IsActive).boolean().not_null().default(true));
        timestamps(&mut users);
        manager.create_table(users).await?;

        manager
            .create_table(
                Table::create()
                    .table(Role::Roles)
                    .if_not_exists()
                    .col(id(Role::Id))
                    .col(ColumnDef::new(Role::Name).string().not_null().unique_key())
                    .col(ColumnDef::new(Role::Description).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Permission::Permissions)
                    .if_not_exists()
                    .col(id(Permission::Id))
                    .col(ColumnDef::new(Permission::Name).string().not_null().unique_key())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RolePermission::RolePermissions)
                    .if_not_exists()
                    .col(ColumnDef::new(RolePermission::RoleId).integer().not_null())
                    .col(ColumnDef::new(RolePermission::PermissionId).integer().not_null())
                    .primary_key(
                        Index::create()
                            .col(RolePermission::RoleId)
                            .col(RolePermission::PermissionId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_role_permission_role")
                            .from(RolePermission::RolePermissions, RolePermission::RoleId)
                            .to(Role::Roles, Role::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_role_permission_permission")
                            .from(RolePermission::RolePermissions, RolePermission::PermissionId)
                            .to(Permission::Permissions, Permission::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserRole::UserRoles)
                    .if_not_exists()
                    .col(ColumnDef::new(UserRole::UserId).integer().not_null())
                    .col(ColumnDef::new(UserRole::RoleId).integer().not_null())
                    .primary_key(Index::create().col(UserRole::UserId).col(UserRole::RoleId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_role_user")
                            .from(UserRole::UserRoles, UserRole::UserId)
                            .to(User::Users, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_role_role")
                            .from(UserRole::UserRoles, UserRole::RoleId)
                            .to(Role::Roles, Role::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserRole::UserRoles).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RolePermission::RolePermissions).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Permission::Permissions).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Role::Roles).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(User::Users).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum User {
    Users,
    Id,
    Name,
    Email,
    Password,
    IsActive,
}

#[derive(DeriveIden)]
enum Role {
    Roles,
    Id,
    Name,
    Description,
}

#[derive(DeriveIden)]
enum Permission {
    Permissions,
    Id,
    Name,
}

#[derive(DeriveIden)]
enum RolePermission {
    RolePermissions,
    RoleId,
    PermissionId,
}

#[derive(DeriveIden)]
enum UserRole {
    UserRoles,
    UserId,
    RoleId,
}
