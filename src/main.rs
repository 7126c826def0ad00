use std::net::SocketAddr;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use folio_cms::config::Config;
use folio_cms::services::auth::{self, NewUser, ADMIN_ROLE};

#[derive(Parser)]
#[command(name = "folio-cms", version, about = "Multilingual portfolio CMS backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run migrations and start the HTTP server (default)
    Serve,
    /// Create an administrator account
    CreateAdmin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Create the default roles and permissions
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "folio_cms=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Invalid configuration")?;
    let db = connect(&config).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(db, config).await,
        Command::CreateAdmin {
            email,
            name,
            password,
        } => create_admin(&db, email, name, password).await,
        Command::Seed => {
            auth::seed_defaults(&db).await?;
            tracing::info!("Default roles and permissions are in place");
            Ok(())
        }
    }
}

async fn connect(config: &Config) -> anyhow::Result<DatabaseConnection> {
    let db = Database::connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection established");

    Migrator::up(&db, None)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");
    Ok(db)
}

async fn serve(db: DatabaseConnection, config: Config) -> anyhow::Result<()> {
    auth::seed_defaults(&db).await?;

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid HOST/PORT: {}:{}", config.host, config.port))?;
    let app = folio_cms::build_app(db, config).await;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn create_admin(
    db: &DatabaseConnection,
    email: String,
    name: String,
    password: Option<String>,
) -> anyhow::Result<()> {
    auth::seed_defaults(db).await?;

    let password = match password {
        Some(password) => password,
        None => {
            let first = rpassword::prompt_password("Password: ")?;
            let second = rpassword::prompt_password("Confirm password: ")?;
            if first != second {
                bail!("Passwords do not match");
            }
            first
        }
    };
    if password.len() < 8 {
        bail!("Password must be at least 8 characters");
    }

    let user = auth::create_user(
        db,
        NewUser {
            name,
            email,
            password,
            is_active: true,
            roles: vec![ADMIN_ROLE.to_string()],
        },
    )
    .await
    .map_err(|e| anyhow::anyhow!("Could not create admin: {e}"))?;

    tracing::info!(user_id = user.id, email = %user.email, "Administrator created");
    Ok(())
}
