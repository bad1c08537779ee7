//! Configuration module
//!
//! Settings are read from the environment (after loading an optional `.env` file) into
//! [`MediaStorageConfig`], wrapped by [`Config`] which exposes getters.

use std::env;
use std::path::PathBuf;

use crate::constants::{
    DEFAULT_CHUNK_SIZE_BYTES, DEFAULT_IMAGE_CONTENT_TYPES, DEFAULT_MAX_BLOG_IMAGES,
    DEFAULT_MAX_IMAGE_SIZE_MB, DEFAULT_MAX_LISTING_PHOTOS, DEFAULT_UPLOAD_CONCURRENCY, MIB,
};
use crate::models::{OwnerKind, SetLimits};
use crate::storage_types::StorageBackend;

const SERVER_PORT: u16 = 3001;
const MAX_CONCURRENT_REQUESTS: usize = 256;
const LOCAL_STORAGE_PATH: &str = "./data/blobs";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Server-level settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub log_format: LogFormat,
    pub max_concurrent_requests: usize,
}

/// Media storage configuration
#[derive(Clone, Debug)]
pub struct MediaStorageConfig {
    pub base: BaseConfig,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub local_storage_path: Option<PathBuf>,
    pub chunk_size_bytes: usize,
    // Upload validation
    pub max_image_size_bytes: usize,
    pub allowed_image_content_types: Vec<String>,
    pub max_listing_photos: usize,
    pub max_blog_images: usize,
    pub upload_concurrency: usize,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<MediaStorageConfig>);

impl Config {
    fn as_media(&self) -> &MediaStorageConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_env(&self.as_media().base.environment)
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        let config = MediaStorageConfig::from_lookup(|key| env::var(key).ok())?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_media().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.as_media().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.as_media().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.as_media().base.environment
    }

    pub fn log_format(&self) -> LogFormat {
        self.as_media().base.log_format
    }

    pub fn max_concurrent_requests(&self) -> usize {
        self.as_media().base.max_concurrent_requests
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.as_media().storage_backend
    }

    pub fn local_storage_path(&self) -> Option<&std::path::Path> {
        self.as_media().local_storage_path.as_deref()
    }

    pub fn chunk_size_bytes(&self) -> usize {
        self.as_media().chunk_size_bytes
    }

    pub fn max_image_size_bytes(&self) -> usize {
        self.as_media().max_image_size_bytes
    }

    pub fn allowed_image_content_types(&self) -> &[String] {
        &self.as_media().allowed_image_content_types
    }

    pub fn upload_concurrency(&self) -> usize {
        self.as_media().upload_concurrency
    }

    /// Set limits configured for an owner kind; `None` for single-reference kinds.
    pub fn set_limits(&self, kind: OwnerKind) -> Option<SetLimits> {
        match kind {
            OwnerKind::Listing => Some(SetLimits::new(self.as_media().max_listing_photos)),
            OwnerKind::BlogPost => Some(SetLimits::new(self.as_media().max_blog_images)),
            OwnerKind::User => None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config(Box::default())
    }
}

fn is_production_env(environment: &str) -> bool {
    let environment = environment.to_lowercase();
    environment == "production" || environment == "prod"
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|value| value.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self {
            server_port: SERVER_PORT,
            cors_origins: vec!["*".to_string()],
            environment: "development".to_string(),
            log_format: LogFormat::Text,
            max_concurrent_requests: MAX_CONCURRENT_REQUESTS,
        }
    }
}

impl Default for MediaStorageConfig {
    fn default() -> Self {
        Self {
            base: BaseConfig::default(),
            storage_backend: StorageBackend::Memory,
            local_storage_path: None,
            chunk_size_bytes: DEFAULT_CHUNK_SIZE_BYTES,
            max_image_size_bytes: DEFAULT_MAX_IMAGE_SIZE_MB * MIB,
            allowed_image_content_types: parse_list(DEFAULT_IMAGE_CONTENT_TYPES),
            max_listing_photos: DEFAULT_MAX_LISTING_PHOTOS,
            max_blog_images: DEFAULT_MAX_BLOG_IMAGES,
            upload_concurrency: DEFAULT_UPLOAD_CONCURRENCY,
        }
    }
}

impl MediaStorageConfig {
    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let cors_origins_str = lookup("CORS_ORIGINS").unwrap_or_else(|| "*".to_string());
        if is_production_env(&environment) && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }
        let cors_origins = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let log_format = match lookup("LOG_FORMAT").as_deref().map(str::to_lowercase) {
            Some(ref f) if f == "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };

        let storage_backend = lookup("STORAGE_BACKEND")
            .map(|s| s.parse::<StorageBackend>())
            .transpose()?
            .unwrap_or(StorageBackend::Local);

        let local_storage_path = match storage_backend {
            StorageBackend::Local => Some(PathBuf::from(
                lookup("LOCAL_STORAGE_PATH").unwrap_or_else(|| LOCAL_STORAGE_PATH.to_string()),
            )),
            StorageBackend::Memory => lookup("LOCAL_STORAGE_PATH").map(PathBuf::from),
        };

        let max_image_size_mb = parse_or(lookup("MAX_IMAGE_SIZE_MB"), DEFAULT_MAX_IMAGE_SIZE_MB);

        let allowed_image_content_types = parse_list(
            &lookup("ALLOWED_IMAGE_CONTENT_TYPES")
                .unwrap_or_else(|| DEFAULT_IMAGE_CONTENT_TYPES.to_string()),
        );

        let config = MediaStorageConfig {
            base: BaseConfig {
                server_port: parse_or(lookup("SERVER_PORT"), SERVER_PORT),
                cors_origins,
                environment,
                log_format,
                max_concurrent_requests: parse_or(
                    lookup("MAX_CONCURRENT_REQUESTS"),
                    MAX_CONCURRENT_REQUESTS,
                ),
            },
            storage_backend,
            local_storage_path,
            chunk_size_bytes: parse_or(lookup("BLOB_CHUNK_SIZE_BYTES"), DEFAULT_CHUNK_SIZE_BYTES),
            max_image_size_bytes: max_image_size_mb * MIB,
            allowed_image_content_types,
            max_listing_photos: parse_or(lookup("MAX_LISTING_PHOTOS"), DEFAULT_MAX_LISTING_PHOTOS),
            max_blog_images: parse_or(lookup("MAX_BLOG_IMAGES"), DEFAULT_MAX_BLOG_IMAGES),
            upload_concurrency: parse_or(
                lookup("UPLOAD_CONCURRENCY"),
                DEFAULT_UPLOAD_CONCURRENCY,
            ),
        };

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.chunk_size_bytes == 0 {
            return Err(anyhow::anyhow!("BLOB_CHUNK_SIZE_BYTES must be greater than 0"));
        }

        if self.max_image_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_IMAGE_SIZE_MB must be greater than 0"));
        }

        if self.max_listing_photos == 0 || self.max_blog_images == 0 {
            return Err(anyhow::anyhow!(
                "MAX_LISTING_PHOTOS and MAX_BLOG_IMAGES must be greater than 0"
            ));
        }

        if self.upload_concurrency == 0 {
            return Err(anyhow::anyhow!("UPLOAD_CONCURRENCY must be greater than 0"));
        }

        if self.allowed_image_content_types.is_empty() {
            return Err(anyhow::anyhow!(
                "ALLOWED_IMAGE_CONTENT_TYPES must list at least one type"
            ));
        }

        if let Some(bad) = self
            .allowed_image_content_types
            .iter()
            .find(|ct| !ct.starts_with("image/"))
        {
            return Err(anyhow::anyhow!(
                "ALLOWED_IMAGE_CONTENT_TYPES may only contain image types, found '{}'",
                bad
            ));
        }

        if self.storage_backend == StorageBackend::Local && self.local_storage_path.is_none() {
            return Err(anyhow::anyhow!(
                "LOCAL_STORAGE_PATH must be set when using the local storage backend"
            ));
        }

        Ok(())
    }
}
