// Configuration de l'application, lue UNE fois au démarrage puis injectée
// (web::Data<AppConfig>) dans les services et les routes.

use chrono::Duration;
use chrono_tz::Tz;
use std::env;

use crate::error::AppError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuotaConfig {
    pub max_classrooms: Option<u64>, // None = illimité
    pub max_sessions_per_month: Option<u64>,
    pub max_students: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MailConfig {
    pub from_email: String,
    pub from_name: String,
    pub smtp: Option<SmtpConfig>, // None = emails seulement logués
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub jwt_secret: String,
    pub base_url: String,
    pub timezone: Tz,
    pub token_ttl_days: i64,
    pub max_recurrence: u32,
    pub auto_schema: bool,
    pub quotas: QuotaConfig,
    pub mail: MailConfig,
}

impl AppConfig {
    /// Lit la configuration depuis les variables d'environnement (.env chargé avant)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AppError::Config(format!("{} must be set", key)))
        };

        let timezone_name = lookup("APP_TIMEZONE").unwrap_or_else(|| "Europe/Paris".to_string());
        let timezone = timezone_name
            .parse::<Tz>()
            .map_err(|_| AppError::Config(format!("Invalid APP_TIMEZONE: {}", timezone_name)))?;

        let smtp = match lookup("SMTP_HOST").filter(|h| !h.trim().is_empty()) {
            Some(host) => Some(SmtpConfig {
                host,
                port: parse_or(&lookup, "SMTP_PORT", 587)?,
                username: required("SMTP_USERNAME")?,
                password: required("SMTP_PASSWORD")?,
            }),
            None => None,
        };

        let token_ttl_days: i64 = parse_or(&lookup, "SIGNATURE_TOKEN_TTL_DAYS", 7)?;
        if token_ttl_days <= 0 {
            return Err(AppError::Config("SIGNATURE_TOKEN_TTL_DAYS must be positive".to_string()));
        }

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:8080".to_string()),
            jwt_secret: required("JWT_SECRET")?,
            base_url: lookup("APP_BASE_URL")
                .unwrap_or_else(|| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            timezone,
            token_ttl_days,
            max_recurrence: parse_or(&lookup, "MAX_RECURRENCE", 365)?,
            auto_schema: parse_or(&lookup, "DB_AUTO_SCHEMA", false)?,
            quotas: QuotaConfig {
                max_classrooms: parse_optional(&lookup, "QUOTA_MAX_CLASSROOMS")?,
                max_sessions_per_month: parse_optional(&lookup, "QUOTA_MAX_SESSIONS_PER_MONTH")?,
                max_students: parse_optional(&lookup, "QUOTA_MAX_STUDENTS")?,
            },
            mail: MailConfig {
                from_email: lookup("MAIL_FROM_EMAIL").unwrap_or_else(|| "no-reply@localhost".to_string()),
                from_name: lookup("MAIL_FROM_NAME").unwrap_or_else(|| "Classroom".to_string()),
                smtp,
            },
        })
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::days(self.token_ttl_days)
    }
}

fn parse_optional<F, T>(lookup: &F, key: &str) -> Result<Option<T>, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppError::Config(format!("Invalid value for {}: {}", key, raw))),
        None => Ok(None),
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    Ok(parse_optional(lookup, key)?.unwrap_or(default))
}
