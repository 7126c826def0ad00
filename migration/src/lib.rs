pub use sea_orm_migration::prelude::*;

mod columns;
mod m20250101_000001_create_auth_tables;
mod m20250101_000002_create_access_tokens_table;
mod m20250102_000003_create_localized_pages_tables;
mod m20250102_000004_create_showcase_tables;
mod m20250103_000005_create_catalog_tables;
mod m20250103_000006_create_talents_tables;
mod m20250104_000007_create_contact_messages_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_auth_tables::Migration),
            Box::new(m20250101_000002_create_access_tokens_table::Migration),
            Box::new(m20250102_000003_create_localized_pages_tables::Migration),
            Box::new(m20250102_000004_create_showcase_tables::Migration),
            Box::new(m20250103_000005_create_catalog_tables::Migration),
            Box::new(m20250103_000006_create_talents_tables::Migration),
            Box::new(m20250104_000007_create_contact_messages_table::Migration),
        ]
    }
}
