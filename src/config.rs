use std::env;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

#[derive(Debug, Clone)]
pub enum MediaDriver {
    Local { root: PathBuf },
    S3(S3Settings),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub app_url: String,
    pub cors_origins: Vec<String>,
    pub media: MediaDriver,
    /// Overrides the URL prefix used for stored media.
    pub media_public_url: Option<String>,
    /// `None` keeps tokens valid until logout or the next login.
    pub token_ttl_hours: Option<i64>,
    pub max_upload_bytes: usize,
}

const DEFAULT_MAX_UPLOAD_BYTES: usize = 60 * 1024 * 1024;

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = required("DATABASE_URL")?;
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = parsed("PORT")?.unwrap_or(3000);
        let app_url = env::var("APP_URL").unwrap_or_else(|_| format!("http://localhost:{port}"));

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let media = match env::var("MEDIA_DRIVER").as_deref() {
            Ok("s3") => MediaDriver::S3(S3Settings {
                bucket: required("S3_BUCKET_NAME")?,
                region: env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
                endpoint: env::var("S3_ENDPOINT").ok(),
                access_key_id: env::var("AWS_ACCESS_KEY_ID").ok(),
                secret_access_key: env::var("AWS_SECRET_ACCESS_KEY").ok(),
            }),
            Ok("local") | Err(_) => MediaDriver::Local {
                root: env::var("MEDIA_ROOT")
                    .unwrap_or_else(|_| "storage/public".to_string())
                    .into(),
            },
            Ok(other) => {
                return Err(ConfigError::Invalid {
                    name: "MEDIA_DRIVER",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            database_url,
            host,
            port,
            app_url,
            cors_origins,
            media,
            media_public_url: env::var("MEDIA_PUBLIC_URL").ok(),
            token_ttl_hours: parsed("TOKEN_TTL_HOURS")?,
            max_upload_bytes: parsed("MAX_UPLOAD_BYTES")?.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
        })
    }

    /// Prefix prepended to relative media paths in responses.
    pub fn media_base_url(&self) -> String {
        if let Some(url) = &self.media_public_url {
            return url.trim_end_matches('/').to_string();
        }
        match &self.media {
            MediaDriver::Local { .. } => format!("{}/storage", self.app_url.trim_end_matches('/')),
            MediaDriver::S3(settings) => crate::services::s3::S3Storage::public_base_url(settings),
        }
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn parsed<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(app_url: &str, public: Option<&str>) -> Config {
        Config {
            database_url: "sqlite::memory:".into(),
            host: "127.0.0.1".into(),
            port: 3000,
            app_url: app_url.into(),
            cors_origins: vec![],
            media: MediaDriver::Local {
                root: "storage/public".into(),
            },
            media_public_url: public.map(str::to_string),
            token_ttl_hours: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    #[test]
    fn local_media_is_served_under_storage() {
        let config = local("https://api.example.org/", None);
        assert_eq!(config.media_base_url(), "https://api.example.org/storage");
    }

    #[test]
    fn explicit_public_url_wins() {
        let config = local("http://localhost:3000", Some("https://cdn.example.org/media/"));
        assert_eq!(config.media_base_url(), "https://cdn.example.org/media");
    }

    #[test]
    fn s3_base_url_uses_endpoint_when_present() {
        let mut settings = S3Settings {
            bucket: "folio".into(),
            region: "eu-west-1".into(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
        };
        assert_eq!(
            crate::services::s3::S3Storage::public_base_url(&settings),
            "https://folio.s3.eu-west-1.amazonaws.com"
        );
        settings.endpoint = Some("http://minio:9000/".into());
        assert_eq!(
            crate::services::s3::S3Storage::public_base_url(&settings),
            "http://minio:9000/folio"
        );
    }
}
