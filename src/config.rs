use std::env;

use thiserror::Error;
use time::Duration;

pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 15;
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;
pub const DEFAULT_TARGET_PATH: &str = "/login";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// A from-address / from-name pair as configured at one level of the sender chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SenderSettings {
    pub from_address: Option<String>,
    pub from_name: Option<String>,
}

/// Deployment-wide settings of the login link flows.
#[derive(Debug, Clone)]
pub struct LoginLinkSettings {
    pub token_ttl: Duration,
    pub default_target: String,
    pub sender: SenderSettings,
    pub system_sender: SenderSettings,
    pub storage_pid: Option<i64>,
    pub expose_context_mismatch: bool,
    pub site_title: String,
}

impl Default for LoginLinkSettings {
    fn default() -> Self {
        Self {
            token_ttl: Duration::minutes(DEFAULT_TOKEN_TTL_MINUTES),
            default_target: DEFAULT_TARGET_PATH.to_string(),
            sender: SenderSettings::default(),
            system_sender: SenderSettings::default(),
            storage_pid: None,
            expose_context_mismatch: false,
            site_title: String::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitSettings {
    pub per_second: u64,
    pub burst_size: u32,
}

pub struct Config {
    pub database_url: String,
    pub frontend_origin: String,
    pub bind_addr: String,
    pub jwt_secret: String,
    pub session_ttl: Duration,
    pub auth_cookie_secure: bool,
    pub login_link: LoginLinkSettings,
    pub link_rate_limit: RateLimitSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok(); // Load .env file

        let ttl_minutes = parse_var("LOGIN_LINK_TTL_MINUTES")?
            .unwrap_or(DEFAULT_TOKEN_TTL_MINUTES);
        if ttl_minutes <= 0 {
            return Err(ConfigError::Invalid {
                name: "LOGIN_LINK_TTL_MINUTES",
                value: ttl_minutes.to_string(),
            });
        }
        let session_hours = parse_var("SESSION_TTL_HOURS")?.unwrap_or(DEFAULT_SESSION_TTL_HOURS);

        let login_link = LoginLinkSettings {
            token_ttl: Duration::minutes(ttl_minutes),
            default_target: optional_var("LOGIN_LINK_TARGET_PATH")
                .unwrap_or_else(|| DEFAULT_TARGET_PATH.to_string()),
            sender: SenderSettings {
                from_address: optional_var("LOGIN_LINK_FROM_ADDRESS"),
                from_name: optional_var("LOGIN_LINK_FROM_NAME"),
            },
            system_sender: SenderSettings {
                from_address: optional_var("MAIL_DEFAULT_FROM_ADDRESS"),
                from_name: optional_var("MAIL_DEFAULT_FROM_NAME"),
            },
            storage_pid: parse_var("LOGIN_LINK_STORAGE_PID")?,
            expose_context_mismatch: parse_var("LOGIN_LINK_EXPOSE_CONTEXT_MISMATCH")?
                .unwrap_or(false),
            site_title: optional_var("SITE_TITLE").unwrap_or_default(),
        };

        Ok(Config {
            database_url: required_var("DATABASE_URL")?,
            frontend_origin: required_var("FRONTEND_ORIGIN")?,
            bind_addr: optional_var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            jwt_secret: required_var("JWT_SECRET")?,
            session_ttl: Duration::hours(session_hours.max(1)),
            auth_cookie_secure: parse_var("AUTH_COOKIE_SECURE")?.unwrap_or(true),
            login_link,
            link_rate_limit: RateLimitSettings {
                per_second: parse_var("RATE_LIMITER_LINK_SECONDS")?.unwrap_or(2),
                burst_size: parse_var("RATE_LIMITER_LINK_BURST")?.unwrap_or(5),
            },
        })
    }
}

/// Blank values count as unset.
fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required_var(name: &'static str) -> Result<String, ConfigError> {
    optional_var(name).ok_or(ConfigError::Missing(name))
}

fn parse_var<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    optional_var(name)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|_| ConfigError::Invalid { name, value: raw })
        })
        .transpose()
}
