use serde::Deserialize;
use trust_core::config::{get_env, load_dotenv};
use trust_core::error::AppError;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct TrustConfig {
    pub environment: Environment,
    pub service_name: String,
    pub log_level: String,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// High-entropy HS256 secret for access tokens, externally provisioned
    pub access_token_secret: String,
    /// Separate secret for refresh tokens
    pub refresh_token_secret: String,
    pub access_token_expiry_minutes: i64,
    pub refresh_token_expiry_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub login_attempts: u32,
    pub login_window_seconds: u64,
    pub refresh_attempts: u32,
    pub refresh_window_seconds: u64,
}

impl TrustConfig {
    pub fn from_env() -> Result<Self, AppError> {
        load_dotenv();

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = TrustConfig {
            environment,
            service_name: get_env("SERVICE_NAME", Some("trust-service"), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            database: DatabaseConfig {
                url: get_env("DATABASE_URL", None, is_prod)?,
                max_connections: get_env("DATABASE_MAX_CONNECTIONS", Some("10"), is_prod)?
                    .parse()
                    .unwrap_or(10),
                min_connections: get_env("DATABASE_MIN_CONNECTIONS", Some("1"), is_prod)?
                    .parse()
                    .unwrap_or(1),
            },
            jwt: JwtConfig {
                access_token_secret: get_env("JWT_ACCESS_TOKEN_SECRET", None, is_prod)?,
                refresh_token_secret: get_env("JWT_REFRESH_TOKEN_SECRET", None, is_prod)?,
                access_token_expiry_minutes: get_env(
                    "JWT_ACCESS_TOKEN_EXPIRY_MINUTES",
                    Some("15"),
                    is_prod,
                )?
                .parse()
                .map_err(|e: std::num::ParseIntError| {
                    AppError::ConfigError(anyhow::anyhow!(e.to_string()))
                })?,
                refresh_token_expiry_days: get_env(
                    "JWT_REFRESH_TOKEN_EXPIRY_DAYS",
                    Some("7"),
                    is_prod,
                )?
                .parse()
                .map_err(|e: std::num::ParseIntError| {
                    AppError::ConfigError(anyhow::anyhow!(e.to_string()))
                })?,
            },
            rate_limit: RateLimitConfig {
                login_attempts: get_env("RATE_LIMIT_LOGIN_ATTEMPTS", Some("5"), is_prod)?
                    .parse()
                    .unwrap_or(5),
                login_window_seconds: get_env(
                    "RATE_LIMIT_LOGIN_WINDOW_SECONDS",
                    Some("900"),
                    is_prod,
                )?
                .parse()
                .unwrap_or(900),
                refresh_attempts: get_env("RATE_LIMIT_REFRESH_ATTEMPTS", Some("30"), is_prod)?
                    .parse()
                    .unwrap_or(30),
                refresh_window_seconds: get_env(
                    "RATE_LIMIT_REFRESH_WINDOW_SECONDS",
                    Some("60"),
                    is_prod,
                )?
                .parse()
                .unwrap_or(60),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.jwt.access_token_expiry_minutes <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_ACCESS_TOKEN_EXPIRY_MINUTES must be positive"
            )));
        }

        if self.jwt.refresh_token_expiry_days <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_REFRESH_TOKEN_EXPIRY_DAYS must be positive"
            )));
        }

        if self.rate_limit.login_attempts == 0 || self.rate_limit.refresh_attempts == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "Rate limit attempt counts must be positive"
            )));
        }

        // Weak signing secrets are a misconfiguration, not a runtime
        // condition; refuse to start in production.
        if self.environment == Environment::Prod {
            if self.jwt.access_token_secret.len() < 32 || self.jwt.refresh_token_secret.len() < 32
            {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "JWT signing secrets must be at least 32 bytes in production"
                )));
            }

            if self.jwt.access_token_secret == self.jwt.refresh_token_secret {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Access and refresh token secrets must differ"
                )));
            }
        }

        Ok(())
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}
