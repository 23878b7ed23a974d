use std::str::FromStr;

use anyhow::Context;
use serde::Deserialize;
use time::UtcOffset;

use crate::solver::SolverMode;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SolverConfig {
    pub mode: SolverMode,
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub system_prompt_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt: JwtConfig,
    /// Account allowed to manage tiers. `None` disables the admin routes.
    pub admin_email: Option<String>,
    /// Offset from UTC, in hours, of the calendar day used for quotas.
    pub quota_utc_offset_hours: i8,
    pub solver: SolverConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = required("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: required("JWT_SECRET")?,
            issuer: or_default("JWT_ISSUER", "mathsolve"),
            audience: or_default("JWT_AUDIENCE", "mathsolve-users"),
            ttl_minutes: parsed_or("JWT_TTL_MINUTES", 60)?,
            refresh_ttl_minutes: parsed_or("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14)?,
        };
        let solver = SolverConfig {
            mode: parsed_or("SOLVER_MODE", SolverMode::Image)?,
            api_key: required("GEMINI_API_KEY")?,
            model: or_default("GEMINI_MODEL", "gemini-2.5-flash"),
            base_url: or_default(
                "GEMINI_BASE_URL",
                "https://generativelanguage.googleapis.com",
            ),
            timeout_secs: parsed_or("GEMINI_TIMEOUT_SECS", 120)?,
            system_prompt_path: or_default("SYSTEM_PROMPT_PATH", "system_prompt.txt"),
        };
        let storage = StorageConfig {
            endpoint: required("MINIO_ENDPOINT")?,
            bucket: required("MINIO_BUCKET")?,
            access_key: required("MINIO_ACCESS_KEY")?,
            secret_key: required("MINIO_SECRET_KEY")?,
            region: or_default("MINIO_REGION", "us-east-1"),
        };
        let admin_email = std::env::var("ADMIN_EMAIL")
            .ok()
            .map(|v| v.trim().to_lowercase())
            .filter(|v| !v.is_empty());

        Ok(Self {
            database_url,
            db_max_connections: parsed_or("DB_MAX_CONNECTIONS", 10)?,
            jwt,
            admin_email,
            quota_utc_offset_hours: utc_offset_hours("QUOTA_UTC_OFFSET_HOURS")?,
            solver,
            storage,
        })
    }

    pub fn is_admin(&self, email: &str) -> bool {
        self.admin_email.as_deref() == Some(email)
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    std::env::var(key).with_context(|| format!("{key} must be set"))
}

fn or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn parsed_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid {key}={raw:?}: {e}")),
        Err(_) => Ok(default),
    }
}

/// Whole-hour offset that `time` accepts as a `UtcOffset`.
fn utc_offset_hours(key: &str) -> anyhow::Result<i8> {
    let hours: i8 = parsed_or(key, 0)?;
    UtcOffset::from_hms(hours, 0, 0)
        .map_err(|e| anyhow::anyhow!("invalid {key}={hours}: {e}"))?;
    Ok(hours)
}
