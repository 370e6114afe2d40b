use anyhow::Result;
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub auth: AuthConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub openai_api_key: String,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub secret: String,
    pub token_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub max_file_size_mb: usize,
    pub allowed_file_types: Vec<String>,
}

/// Media type of PDF uploads.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";
/// Media type of Word (OOXML) uploads.
pub const DOCX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()?,
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                cors_allowed_origins: env::var("ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "http://localhost:3000,http://localhost:8080".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect(),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
                max_connections: env::var("DB_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()?,
                min_connections: env::var("DB_MIN_CONNECTIONS")
                    .unwrap_or_else(|_| "1".to_string())
                    .parse()?,
            },
            llm: LlmConfig {
                openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
                model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".to_string()),
            },
            auth: AuthConfig {
                secret: env::var("SECRET_KEY")
                    .map_err(|_| anyhow::anyhow!("SECRET_KEY must be set"))?,
                token_ttl_minutes: env::var("ACCESS_TOKEN_EXPIRE_MINUTES")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()?,
            },
            upload: UploadConfig {
                max_file_size_mb: env::var("MAX_FILE_SIZE_MB")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()?,
                allowed_file_types: env::var("ALLOWED_FILE_TYPES")
                    .unwrap_or_else(|_| format!("{},{}", PDF_MEDIA_TYPE, DOCX_MEDIA_TYPE))
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect(),
            },
        })
    }
}
