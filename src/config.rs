//! Application configuration module
//! Handles environment variable loading, configuration validation, and application settings

use std::env;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub mpesa: MpesaConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout: u64, // seconds
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log format options
#[derive(Debug, Clone)]
pub enum LogFormat {
    Json,
    Plain,
}

/// Daraja API environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MpesaEnvironment {
    Sandbox,
    Production,
}

/// M-Pesa (Daraja) credentials and endpoints
#[derive(Debug, Clone)]
pub struct MpesaConfig {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub passkey: String,
    pub business_shortcode: String,
    pub b2c_shortcode: String,
    pub initiator_name: String,
    pub security_credential: String,
    pub environment: MpesaEnvironment,
    /// Public base URL of this service, used to build callback URLs.
    pub callback_base_url: String,
    pub request_timeout: Duration,
    pub max_retries: u32,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenv::dotenv().ok();

        Ok(AppConfig {
            server: ServerConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
            mpesa: MpesaConfig::from_env()?,
        })
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.database.validate()?;
        self.logging.validate()?;
        self.mpesa.validate()?;

        Ok(())
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(ServerConfig {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidValue(
                "SERVER_PORT cannot be 0".to_string(),
            ));
        }

        if self.host.is_empty() {
            return Err(ConfigError::InvalidValue(
                "SERVER_HOST cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(DatabaseConfig {
            url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::MissingVariable("DATABASE_URL".to_string()))?,
            max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()))?,
            min_connections: env::var("DB_MIN_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_MIN_CONNECTIONS".to_string()))?,
            connection_timeout: env::var("DB_CONNECTION_TIMEOUT")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_CONNECTION_TIMEOUT".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::InvalidValue("DATABASE_URL".to_string()));
        }

        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }

        if self.min_connections > self.max_connections {
            return Err(ConfigError::InvalidValue(
                "DB_MIN_CONNECTIONS must be <= DB_MAX_CONNECTIONS".to_string(),
            ));
        }

        Ok(())
    }
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "plain".to_string())
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Plain,
            },
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];
        if !valid_levels.contains(&self.level.to_uppercase().as_str()) {
            return Err(ConfigError::InvalidValue("LOG_LEVEL".to_string()));
        }

        Ok(())
    }
}

impl MpesaConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let business_shortcode = env::var("MPESA_BUSINESS_SHORTCODE")
            .map_err(|_| ConfigError::MissingVariable("MPESA_BUSINESS_SHORTCODE".to_string()))?;

        Ok(MpesaConfig {
            consumer_key: env::var("MPESA_CONSUMER_KEY")
                .map_err(|_| ConfigError::MissingVariable("MPESA_CONSUMER_KEY".to_string()))?,
            consumer_secret: env::var("MPESA_CONSUMER_SECRET")
                .map_err(|_| ConfigError::MissingVariable("MPESA_CONSUMER_SECRET".to_string()))?,
            passkey: env::var("MPESA_PASSKEY")
                .map_err(|_| ConfigError::MissingVariable("MPESA_PASSKEY".to_string()))?,
            // B2C disbursements may run on a dedicated shortcode
            b2c_shortcode: env::var("MPESA_B2C_SHORTCODE")
                .unwrap_or_else(|_| business_shortcode.clone()),
            initiator_name: env::var("MPESA_INITIATOR_NAME")
                .map_err(|_| ConfigError::MissingVariable("MPESA_INITIATOR_NAME".to_string()))?,
            security_credential: env::var("MPESA_SECURITY_CREDENTIAL").map_err(|_| {
                ConfigError::MissingVariable("MPESA_SECURITY_CREDENTIAL".to_string())
            })?,
            environment: match env::var("MPESA_ENV")
                .unwrap_or_else(|_| "sandbox".to_string())
                .as_str()
            {
                "production" => MpesaEnvironment::Production,
                "sandbox" => MpesaEnvironment::Sandbox,
                _ => return Err(ConfigError::InvalidValue("MPESA_ENV".to_string())),
            },
            callback_base_url: env::var("CALLBACK_BASE_URL")
                .map_err(|_| ConfigError::MissingVariable("CALLBACK_BASE_URL".to_string()))?,
            request_timeout: Duration::from_secs(
                env::var("MPESA_REQUEST_TIMEOUT")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("MPESA_REQUEST_TIMEOUT".to_string()))?,
            ),
            max_retries: env::var("MPESA_MAX_RETRIES")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("MPESA_MAX_RETRIES".to_string()))?,
            business_shortcode,
        })
    }

    /// Daraja API base URL for the configured environment
    pub fn base_url(&self) -> &'static str {
        match self.environment {
            MpesaEnvironment::Production => "https://api.safaricom.co.ke",
            MpesaEnvironment::Sandbox => "https://sandbox.safaricom.co.ke",
        }
    }

    /// Absolute URL for a callback route of this service
    pub fn callback_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.callback_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.consumer_key.is_empty() || self.consumer_secret.is_empty() {
            return Err(ConfigError::InvalidValue(
                "MPESA_CONSUMER_KEY and MPESA_CONSUMER_SECRET cannot be empty".to_string(),
            ));
        }

        if self.business_shortcode.is_empty() {
            return Err(ConfigError::InvalidValue(
                "MPESA_BUSINESS_SHORTCODE cannot be empty".to_string(),
            ));
        }

        if !self.callback_base_url.starts_with("http://")
            && !self.callback_base_url.starts_with("https://")
        {
            return Err(ConfigError::InvalidValue(
                "CALLBACK_BASE_URL must be a valid URL".to_string(),
            ));
        }

        if self.request_timeout.as_secs() == 0 {
            return Err(ConfigError::InvalidValue(
                "MPESA_REQUEST_TIMEOUT".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),

    #[error("Invalid value for configuration: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mpesa_config() -> MpesaConfig {
        MpesaConfig {
            consumer_key: "key".to_string(),
            consumer_secret: "secret".to_string(),
            passkey: "passkey".to_string(),
            business_shortcode: "174379".to_string(),
            b2c_shortcode: "174379".to_string(),
            initiator_name: "testapi".to_string(),
            security_credential: "credential".to_string(),
            environment: MpesaEnvironment::Sandbox,
            callback_base_url: "https://example.com/".to_string(),
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }

    #[test]
    fn test_server_config_validation() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8000,
        };

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_port_validation() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Invalid port
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_mpesa_callback_url_joins_cleanly() {
        let config = mpesa_config();
        assert_eq!(
            config.callback_url("/callbacks/stk"),
            "https://example.com/callbacks/stk"
        );
    }

    #[test]
    fn test_mpesa_base_url_per_environment() {
        let mut config = mpesa_config();
        assert_eq!(config.base_url(), "https://sandbox.safaricom.co.ke");
        config.environment = MpesaEnvironment::Production;
        assert_eq!(config.base_url(), "https://api.safaricom.co.ke");
    }

    #[test]
    fn test_mpesa_config_rejects_bad_callback_url() {
        let mut config = mpesa_config();
        config.callback_base_url = "example.com".to_string();
        assert!(config.validate().is_err());
    }
}
