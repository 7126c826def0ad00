use anyhow::Context;
use sea_orm::{ConnectionTrait, Database, DbBackend, Statement};
use std::env;

/// Children before parents so the drops also succeed without CASCADE (SQLite).
const TABLES: [&str; 20] = [
    "talent_applications",
    "talents",
    "contact_messages",
    "videos",
    "awards",
    "products",
    "services",
    "projects",
    "galleries",
    "festivals",
    "events",
    "contents",
    "about_sections",
    "access_tokens",
    "user_roles",
    "role_permissions",
    "permissions",
    "roles",
    "users",
    "seaql_migrations",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reset_db=info".into()),
        )
        .init();

    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let db = Database::connect(database_url)
        .await
        .context("Failed to connect to database")?;
    let backend = db.get_database_backend();

    for table in TABLES {
        let sql = match backend {
            DbBackend::Postgres => format!("DROP TABLE IF EXISTS \"{table}\" CASCADE;"),
            _ => format!("DROP TABLE IF EXISTS \"{table}\";"),
        };
        db.execute(Statement::from_string(backend, sql))
            .await
            .with_context(|| format!("Failed to drop {table}"))?;
        tracing::info!(table, "Dropped");
    }

    tracing::info!("Database reset successfully");
    Ok(())
}
