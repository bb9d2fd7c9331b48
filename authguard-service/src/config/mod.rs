use serde::Deserialize;
use std::env;

use crate::error::AuthError;

#[derive(Debug, Clone, Deserialize)]
pub struct GuardConfig {
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub bind_addr: String,
    pub security: SecurityConfig,
    pub rate_limit: RateLimitConfig,
    pub password_policy: PasswordPolicyConfig,
    pub breach: BreachConfig,
    pub monitor: MonitorConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub max_attempts: u32,
    /// 0 disables limiting entirely (explicit opt-out).
    pub window_minutes: u64,
    /// When true, each repeat violation doubles the lockout.
    pub escalation: bool,
    /// Upper bound on any escalated lockout.
    pub lockout_max_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordPolicyConfig {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_number: bool,
    pub require_special: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BreachConfig {
    pub enabled: bool,
    pub api_base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Resource types whose denied permission checks are audited as
    /// unauthorized access.
    pub sensitive_resources: Vec<String>,
}

impl GuardConfig {
    pub fn from_env() -> Result<Self, AuthError> {
        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AuthError::Config(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = GuardConfig {
            environment,
            service_name: get_env("SERVICE_NAME", Some("authguard-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            bind_addr: get_env("BIND_ADDR", Some("0.0.0.0:8080"), is_prod)?,
            security: SecurityConfig {
                allowed_origins: get_env(
                    "ALLOWED_ORIGINS",
                    Some("http://localhost:3000"),
                    is_prod,
                )?
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            },
            rate_limit: RateLimitConfig {
                max_attempts: parse_env("RATE_LIMIT_MAX_ATTEMPTS", "5", is_prod)?,
                window_minutes: parse_env("RATE_LIMIT_WINDOW_MINUTES", "15", is_prod)?,
                escalation: parse_env("RATE_LIMIT_ESCALATION", "true", is_prod)?,
                lockout_max_secs: parse_env("RATE_LIMIT_LOCKOUT_MAX_SECS", "3600", is_prod)?,
            },
            password_policy: PasswordPolicyConfig {
                min_length: parse_env("PASSWORD_MIN_LENGTH", "12", is_prod)?,
                require_uppercase: parse_env("PASSWORD_REQUIRE_UPPERCASE", "true", is_prod)?,
                require_lowercase: parse_env("PASSWORD_REQUIRE_LOWERCASE", "true", is_prod)?,
                require_number: parse_env("PASSWORD_REQUIRE_NUMBER", "true", is_prod)?,
                require_special: parse_env("PASSWORD_REQUIRE_SPECIAL", "true", is_prod)?,
            },
            breach: BreachConfig {
                enabled: parse_env("BREACH_CHECK_ENABLED", "true", is_prod)?,
                api_base_url: get_env(
                    "BREACH_API_BASE_URL",
                    Some("https://api.pwnedpasswords.com"),
                    is_prod,
                )?,
                timeout_secs: parse_env("BREACH_TIMEOUT_SECS", "2", is_prod)?,
            },
            monitor: MonitorConfig {
                sensitive_resources: get_env(
                    "SENSITIVE_RESOURCES",
                    Some("policy,audit,incident,vendor,risk"),
                    is_prod,
                )?
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AuthError> {
        if self.rate_limit.window_minutes > 0 && self.rate_limit.max_attempts == 0 {
            return Err(AuthError::Config(anyhow::anyhow!(
                "RATE_LIMIT_MAX_ATTEMPTS must be > 0 when limiting is enabled"
            )));
        }

        if self.password_policy.min_length == 0 {
            return Err(AuthError::Config(anyhow::anyhow!(
                "PASSWORD_MIN_LENGTH must be > 0"
            )));
        }

        if self.breach.enabled && self.breach.timeout_secs == 0 {
            return Err(AuthError::Config(anyhow::anyhow!(
                "BREACH_TIMEOUT_SECS must be > 0 when the breach check is enabled"
            )));
        }

        if self.environment == Environment::Prod
            && self.security.allowed_origins.iter().any(|o| o == "*")
        {
            return Err(AuthError::Config(anyhow::anyhow!(
                "Wildcard CORS origin not allowed in production"
            )));
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AuthError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AuthError::Config(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AuthError::Config(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: &str, is_prod: bool) -> Result<T, AuthError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key, Some(default), is_prod)?.parse().map_err(|e| {
        AuthError::Config(anyhow::anyhow!(format!("{}: {}", key, e)))
    })
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
