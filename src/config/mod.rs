//! Configuration management for the job board backend

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::middleware::RateLimitConfig;

type LoadResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub session: SessionConfig,
    pub rate_limit: RateLimitSettings,
    pub messaging: MessagingConfig,
    pub features: FeaturesConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn load() -> LoadResult<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            server: ServerConfig::load()?,
            database: DatabaseConfig::load()?,
            jwt: JwtConfig::load()?,
            session: SessionConfig::load()?,
            rate_limit: RateLimitSettings::load()?,
            messaging: MessagingConfig::load()?,
            features: FeaturesConfig::load()?,
            logging: LoggingConfig::load()?,
        };

        info!("Configuration loaded successfully");
        Ok(config)
    }
}

/// Read an env var, falling back to `default`, and parse it
fn env_or<T>(key: &str, default: &str) -> LoadResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse()
        .map_err(|e| format!("invalid value for {}: {} ({})", key, raw, e).into())
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout: u64,
    pub body_limit: usize,
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    fn load() -> LoadResult<Self> {
        Ok(ServerConfig {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_or("SERVER_PORT", "8080")?,
            request_timeout: env_or("SERVER_REQUEST_TIMEOUT", "30")?,
            body_limit: env_or("SERVER_BODY_LIMIT", "1048576")?, // 1 MB
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: u64,
    pub idle_timeout: u64,
}

impl DatabaseConfig {
    fn load() -> LoadResult<Self> {
        Ok(DatabaseConfig {
            url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://postgres@localhost:5432/jobboard".to_string()),
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", "20")?,
            min_connections: env_or("DATABASE_MIN_CONNECTIONS", "2")?,
            acquire_timeout: env_or("DATABASE_ACQUIRE_TIMEOUT", "5")?,
            idle_timeout: env_or("DATABASE_IDLE_TIMEOUT", "600")?,
        })
    }
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration: u64,
    pub issuer: String,
}

impl JwtConfig {
    fn load() -> LoadResult<Self> {
        let secret = env::var("JWT_SECRET").map_err(|_| "JWT_SECRET must be set")?;

        if secret.len() < 32 {
            return Err("JWT_SECRET must be at least 32 characters long".into());
        }

        Ok(JwtConfig {
            secret,
            expiration: env_or("JWT_EXPIRATION", "86400")?, // 24 hours in seconds
            issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "jobboard".to_string()),
        })
    }
}

/// Session cookie configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub secure_cookie: bool,
}

impl SessionConfig {
    fn load() -> LoadResult<Self> {
        Ok(SessionConfig {
            cookie_name: env::var("SESSION_COOKIE_NAME")
                .unwrap_or_else(|_| "jobboard_session".to_string()),
            secure_cookie: env_or("SESSION_SECURE_COOKIE", "true")?,
        })
    }
}

/// One limiter's window and quota
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LimiterSettings {
    pub window_ms: u64,
    pub max_requests: u32,
}

impl LimiterSettings {
    fn load(prefix: &str, defaults: RateLimitConfig) -> LoadResult<Self> {
        let settings = LimiterSettings {
            window_ms: env_or(
                &format!("{}_WINDOW_MS", prefix),
                &(defaults.window.as_millis() as u64).to_string(),
            )?,
            max_requests: env_or(
                &format!("{}_MAX_REQUESTS", prefix),
                &defaults.max_requests.to_string(),
            )?,
        };

        if settings.max_requests == 0 {
            return Err(format!("{}_MAX_REQUESTS must be at least 1", prefix).into());
        }
        if settings.window_ms == 0 {
            return Err(format!("{}_WINDOW_MS must be greater than 0", prefix).into());
        }

        Ok(settings)
    }

    pub fn to_limiter_config(self) -> RateLimitConfig {
        RateLimitConfig::from_millis(self.window_ms, self.max_requests)
    }
}

/// Rate limiter configuration for the auth and search limiters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    pub auth: LimiterSettings,
    pub search: LimiterSettings,
    pub sweep_probability: f64,
}

impl RateLimitSettings {
    fn load() -> LoadResult<Self> {
        let sweep_probability: f64 = env_or("RATE_LIMIT_SWEEP_PROBABILITY", "0.01")?;
        if !(0.0..=1.0).contains(&sweep_probability) {
            return Err("RATE_LIMIT_SWEEP_PROBABILITY must be between 0 and 1".into());
        }

        Ok(RateLimitSettings {
            auth: LimiterSettings::load("AUTH_RATE_LIMIT", RateLimitConfig::AUTH)?,
            search: LimiterSettings::load("SEARCH_RATE_LIMIT", RateLimitConfig::SEARCH)?,
            sweep_probability,
        })
    }
}

/// Messaging policy switches
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MessagingConfig {
    /// When false, admins may post into conversations they are not part of.
    pub admin_requires_participancy: bool,
}

impl MessagingConfig {
    fn load() -> LoadResult<Self> {
        Ok(MessagingConfig {
            admin_requires_participancy: env_or("MESSAGING_ADMIN_REQUIRES_PARTICIPANCY", "true")?,
        })
    }
}

/// Feature flags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    pub rate_limiting: bool,
    pub registration: bool,
}

impl FeaturesConfig {
    fn load() -> LoadResult<Self> {
        Ok(FeaturesConfig {
            rate_limiting: env_or("FEATURE_RATE_LIMITING", "true")?,
            registration: env_or("FEATURE_REGISTRATION", "true")?,
        })
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "compact"
    pub file: Option<String>,
}

impl LoggingConfig {
    fn load() -> LoadResult<Self> {
        Ok(LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string()),
            file: env::var("LOG_FILE").ok(),
        })
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            request_timeout: 5,
            body_limit: 65536,
            cors_origins: vec![],
        },
        database: DatabaseConfig {
            url: "postgres://postgres@127.0.0.1:1/jobboard_test".to_string(),
            max_connections: 1,
            min_connections: 0,
            acquire_timeout: 1,
            idle_timeout: 60,
        },
        jwt: JwtConfig {
            secret: "test_secret_that_is_long_enough_for_hs256".to_string(),
            expiration: 3600,
            issuer: "jobboard-test".to_string(),
        },
        session: SessionConfig {
            cookie_name: "jobboard_session".to_string(),
            secure_cookie: false,
        },
        rate_limit: RateLimitSettings {
            auth: LimiterSettings {
                window_ms: 900_000,
                max_requests: 5,
            },
            search: LimiterSettings {
                window_ms: 60_000,
                max_requests: 30,
            },
            sweep_probability: 0.0,
        },
        messaging: MessagingConfig {
            admin_requires_participancy: true,
        },
        features: FeaturesConfig {
            rate_limiting: true,
            registration: true,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "compact".to_string(),
            file: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limiter_settings_defaults_match_canonical_limiters() {
        let auth = LimiterSettings::load("UNSET_AUTH_PREFIX", RateLimitConfig::AUTH).unwrap();
        assert_eq!(auth.window_ms, 15 * 60 * 1000);
        assert_eq!(auth.max_requests, 5);

        let search = LimiterSettings::load("UNSET_SEARCH_PREFIX", RateLimitConfig::SEARCH).unwrap();
        assert_eq!(search.window_ms, 60 * 1000);
        assert_eq!(search.max_requests, 30);
    }

    #[test]
    fn test_zero_quota_is_rejected() {
        std::env::set_var("ZERO_QUOTA_TEST_MAX_REQUESTS", "0");
        assert!(LimiterSettings::load("ZERO_QUOTA_TEST", RateLimitConfig::AUTH).is_err());
    }

    #[test]
    fn test_env_or_reports_bad_values() {
        std::env::set_var("BAD_PORT_TEST", "not-a-port");
        let err = env_or::<u16>("BAD_PORT_TEST", "8080").unwrap_err();
        assert!(err.to_string().contains("BAD_PORT_TEST"));
    }

    #[test]
    fn test_settings_convert_to_limiter_config() {
        let config = LimiterSettings {
            window_ms: 1500,
            max_requests: 3,
        }
        .to_limiter_config();
        assert_eq!(config.window, Duration::from_millis(1500));
        assert_eq!(config.max_requests, 3);
    }
}
