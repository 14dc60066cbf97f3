//! Configuration management for the outdoor API service
//!
//! Loads configuration from environment variables with sensible defaults.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server host
    pub api_host: String,

    /// API server port
    pub api_port: u16,

    /// Redis URL for document storage
    pub redis_url: String,

    /// Directory where uploaded media files are stored
    pub upload_dir: PathBuf,

    /// Secret used to sign bearer tokens
    pub jwt_secret: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenvy::dotenv().ok();

        let config = Config {
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),

            api_port: env::var("API_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid API_PORT")?,

            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),

            upload_dir: env::var("UPLOAD_DIR")
                .unwrap_or_else(|_| "./uploads".to_string())
                .into(),

            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.api_port == 0 {
            anyhow::bail!("API_PORT must be greater than 0");
        }

        if self.jwt_secret.is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }

        Ok(())
    }

    /// Get the API server address
    pub fn api_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }

    /// Ensure the upload directory exists
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.upload_dir).with_context(|| {
            format!(
                "Failed to create upload directory: {}",
                self.upload_dir.display()
            )
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_address() {
        let config = Config {
            api_host: "127.0.0.1".to_string(),
            api_port: 9000,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            upload_dir: PathBuf::from("./uploads"),
            jwt_secret: "secret".to_string(),
        };

        assert_eq!(config.api_address(), "127.0.0.1:9000");
    }

    #[test]
    fn test_validate_invalid_port() {
        let config = Config {
            api_host: "0.0.0.0".to_string(),
            api_port: 0,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            upload_dir: PathBuf::from("./uploads"),
            jwt_secret: "secret".to_string(),
        };

        let result = config.validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("API_PORT must be greater than 0"));
    }

    #[test]
    fn test_validate_empty_secret() {
        let config = Config {
            api_host: "0.0.0.0".to_string(),
            api_port: 8080,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            upload_dir: PathBuf::from("./uploads"),
            jwt_secret: String::new(),
        };

        assert!(config.validate().is_err());
    }
}
