use std::env;
use std::str::FromStr;

use chrono::NaiveTime;
use dotenvy::dotenv;
use tracing::warn;

use crate::engine::dispatcher::DEFAULT_DELAY;

#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub from_address: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl SmtpConfig {
    /// `None` when `SMTP_HOST` is unset: reminders can't be delivered.
    pub fn from_env() -> Option<Self> {
        let host = env::var("SMTP_HOST").ok().filter(|h| !h.trim().is_empty())?;
        Some(Self {
            host,
            port: parse_or("SMTP_PORT", 587),
            from_address: env::var("SMTP_FROM")
                .unwrap_or_else(|_| "noreply@attendance.local".to_string()),
            user: env::var("SMTP_USER").ok(),
            password: env::var("SMTP_PASSWORD").ok(),
        })
    }
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,

    // Rate limiting
    pub rate_protected_per_min: u32,
    pub rate_notify_per_min: u32,

    pub api_prefix: String,

    // Attendance policy
    pub work_start_time: NaiveTime,
    pub late_grace_minutes: u32,
    pub geofence_cache_ttl_secs: u64,

    // Absentee reminders
    pub notify_delay_ms: u64,
    pub smtp: Option<SmtpConfig>,
}

/// Read `key`, falling back to `default` when unset or malformed.
fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, %default, "Invalid config value, using default");
            default
        }),
        Err(_) => default,
    }
}

fn parse_time_or(key: &str, default: NaiveTime) -> NaiveTime {
    match env::var(key) {
        Ok(raw) => parse_clock(&raw).unwrap_or_else(|| {
            warn!(key, value = %raw, %default, "Invalid time of day, using default");
            default
        }),
        Err(_) => default,
    }
}

/// Accepts `HH:MM` or `HH:MM:SS`.
pub fn parse_clock(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),

            rate_protected_per_min: parse_or("RATE_PROTECTED_PER_MIN", 1000),
            rate_notify_per_min: parse_or("RATE_NOTIFY_PER_MIN", 6),

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            work_start_time: parse_time_or(
                "WORK_START_TIME",
                NaiveTime::from_hms_opt(9, 0, 0).expect("09:00 is a valid time"),
            ),
            late_grace_minutes: parse_or("LATE_GRACE_MINUTES", 15),
            geofence_cache_ttl_secs: parse_or("GEOFENCE_CACHE_TTL_SECS", 60),

            notify_delay_ms: parse_or("NOTIFY_DELAY_MS", DEFAULT_DELAY.as_millis() as u64),
            smtp: SmtpConfig::from_env(),
        }
    }
}
