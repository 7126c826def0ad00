//! Column helpers shared by the content migrations.

use sea_orm_migration::prelude::*;

/// Suffixes of the column-per-language groups (`title_en`, `title_am`, `title_or`).
pub const LANG_SUFFIXES: [&str; 3] = ["en", "am", "or"];

pub fn id(name: impl IntoIden) -> ColumnDef {
    ColumnDef::new(name)
        .integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

/// Adds one nullable column per language for a localized group.
pub fn localized_string(table: &mut TableCreateStatement, group: &str) {
    for suffix in LANG_SUFFIXES {
        table.col(ColumnDef::new(Alias::new(format!("{group}_{suffix}"))).string());
    }
}

pub fn localized_text(table: &mut TableCreateStatement, group: &str) {
    for suffix in LANG_SUFFIXES {
        table.col(ColumnDef::new(Alias::new(format!("{group}_{suffix}"))).text());
    }
}

pub fn timestamps(table: &mut TableCreateStatement) {
    table
        .col(ColumnDef::new(Alias::new("created_at")).timestamp().not_null())
        .col(ColumnDef::new(Alias::new("updated_at")).timestamp().not_null());
}

pub fn json_list(name: impl IntoIden) -> ColumnDef {
    ColumnDef::new(name)
        .json()
        .not_null()
        .default(SimpleExpr::Custom("'[]'".to_owned()))
        .to_owned()
}
