use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use validator::{Validate, ValidationError};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

pub const DEFAULT_DATA_FILE: &str = "data/smart_kuku.json";
pub const DEV_JWT_SECRET: &str = "smart-kuku-development-secret";

/// Server configuration with validation
#[derive(Clone, Debug, Validate, Serialize, Deserialize)]
#[validate(schema(function = "validate_token_lifetimes"))]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP server host address
    #[validate(length(min = 1, message = "HTTP host cannot be empty"))]
    pub http_host: String,

    /// HTTP server port (1-65535)
    #[validate(range(
        min = 1,
        max = 65535,
        message = "HTTP port must be between 1 and 65535"
    ))]
    pub http_port: u16,

    /// JSON snapshot the store is loaded from and saved to
    #[validate(length(min = 1, message = "Data file path cannot be empty"))]
    pub data_file: String,

    /// HMAC secret for signing access and refresh tokens
    #[validate(length(min = 16, message = "JWT secret must be at least 16 characters"))]
    pub jwt_secret: String,

    #[validate(range(
        min = 60,
        max = 86400,
        message = "Access token lifetime must be between 60 and 86400 seconds"
    ))]
    pub access_token_ttl_secs: i64,

    #[validate(range(
        min = 60,
        max = 2592000,
        message = "Refresh token lifetime must be between 60 seconds and 30 days"
    ))]
    pub refresh_token_ttl_secs: i64,

    /// Period of the background subscription status check (0 disables it)
    pub subscription_check_secs: u64,

    #[validate(range(
        min = 1,
        max = 300,
        message = "Request timeout must be between 1 and 300 seconds"
    ))]
    pub request_timeout_secs: u64,

    #[validate(range(
        min = 1024,
        message = "Request body limit must be at least 1024 bytes"
    ))]
    pub max_body_bytes: usize,
}

fn validate_token_lifetimes(config: &ServerConfig) -> Result<(), ValidationError> {
    if config.refresh_token_ttl_secs < config.access_token_ttl_secs {
        let mut err = ValidationError::new("token_lifetimes");
        err.message = Some("Refresh token lifetime cannot be shorter than access token lifetime".into());
        return Err(err);
    }
    Ok(())
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_host: "0.0.0.0".to_string(),
            http_port: 8000,
            data_file: DEFAULT_DATA_FILE.to_string(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            access_token_ttl_secs: 3600,
            refresh_token_ttl_secs: 86400,
            subscription_check_secs: 0,
            request_timeout_secs: 30,
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            http_host: env::var("SMART_KUKU_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: parse_env_var("SMART_KUKU_PORT", "8000")?,
            data_file: env::var("SMART_KUKU_DATA_FILE")
                .unwrap_or_else(|_| DEFAULT_DATA_FILE.to_string()),
            jwt_secret: env::var("SMART_KUKU_JWT_SECRET")
                .unwrap_or_else(|_| DEV_JWT_SECRET.to_string()),
            access_token_ttl_secs: parse_env_var("SMART_KUKU_ACCESS_TOKEN_TTL_SECS", "3600")?,
            refresh_token_ttl_secs: parse_env_var("SMART_KUKU_REFRESH_TOKEN_TTL_SECS", "86400")?,
            subscription_check_secs: parse_env_var("SMART_KUKU_SUBSCRIPTION_CHECK_SECS", "0")?,
            request_timeout_secs: parse_env_var("SMART_KUKU_REQUEST_TIMEOUT_SECS", "30")?,
            max_body_bytes: parse_env_var("SMART_KUKU_MAX_BODY_BYTES", "2097152")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides on top of this configuration and re-validate
    pub fn with_overrides(mut self, cli: CliOverrides) -> Result<Self, ConfigError> {
        if let Some(host) = cli.http_host {
            self.http_host = host;
        }
        if let Some(port) = cli.http_port {
            self.http_port = port;
        }
        if let Some(data_file) = cli.data_file {
            self.data_file = data_file;
        }
        if let Some(secs) = cli.subscription_check_secs {
            self.subscription_check_secs = secs;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

/// Values given on the command line; `None` keeps the environment/file value
#[derive(Clone, Debug, Default)]
pub struct CliOverrides {
    pub http_host: Option<String>,
    pub http_port: Option<u16>,
    pub data_file: Option<String>,
    pub subscription_check_secs: Option<u64>,
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
