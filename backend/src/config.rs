use anyhow::{anyhow, Context};
use chrono_tz::Tz;
use std::{env, net::SocketAddr, path::PathBuf, time::Duration};
use url::Url;

pub const DEFAULT_BACKUP_COLLECTIONS: [&str; 4] = ["reports", "barangays", "ordinances", "users"];
/// Every Monday at 01:00 (sec min hour day-of-month month day-of-week).
pub const DEFAULT_BACKUP_SCHEDULE: &str = "0 0 1 * * Mon";
pub const DEFAULT_BACKUP_TIMEZONE: &str = "Asia/Manila";

const DEFAULT_FIRESTORE_API_BASE: &str = "https://firestore.googleapis.com/";
const DEFAULT_IDENTITY_API_BASE: &str = "https://identitytoolkit.googleapis.com/";
const DEFAULT_METADATA_BASE: &str = "http://metadata.google.internal/";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub caller_jwt_secret: String,
    pub project_id: String,
    pub backup: BackupConfig,
    pub google: GoogleConfig,
    pub smtp: SmtpConfig,
}

#[derive(Debug, Clone)]
pub struct BackupConfig {
    pub bucket: String,
    pub prefix: String,
    pub collections: Vec<String>,
    pub schedule: String,
    pub time_zone: Tz,
    pub deadline: Duration,
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub credentials_path: Option<PathBuf>,
    pub firestore_api_base: Url,
    pub identity_api_base: Url,
    pub metadata_base: Url,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
    pub skip_send: bool,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/barangay_reports".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()
            .context("Invalid BIND_ADDR value")?;

        let caller_jwt_secret = caller_jwt_secret(env::var("CALLER_JWT_SECRET").ok());

        let project_id = env::var("GCLOUD_PROJECT").unwrap_or_else(|_| "local-project".to_string());

        let backup = BackupConfig::load(&project_id)?;
        let google = GoogleConfig::load()?;
        let smtp = SmtpConfig::load()?;

        Ok(Config {
            database_url,
            bind_addr,
            caller_jwt_secret,
            project_id,
            backup,
            google,
            smtp,
        })
    }
}

impl BackupConfig {
    fn load(project_id: &str) -> anyhow::Result<Self> {
        let bucket =
            env::var("BACKUP_BUCKET").unwrap_or_else(|_| format!("{}.appspot.com", project_id));
        let prefix = env::var("BACKUP_PREFIX").unwrap_or_else(|_| "firestore_backups".to_string());

        let collections = match env::var("BACKUP_COLLECTIONS") {
            Ok(raw) => parse_collections(&raw),
            Err(_) => DEFAULT_BACKUP_COLLECTIONS
                .iter()
                .map(|name| name.to_string())
                .collect(),
        };
        if collections.is_empty() {
            return Err(anyhow!("BACKUP_COLLECTIONS must name at least one collection"));
        }

        let schedule =
            env::var("BACKUP_SCHEDULE").unwrap_or_else(|_| DEFAULT_BACKUP_SCHEDULE.to_string());

        let time_zone_name =
            env::var("BACKUP_TIMEZONE").unwrap_or_else(|_| DEFAULT_BACKUP_TIMEZONE.to_string());
        let time_zone: Tz = time_zone_name
            .parse()
            .map_err(|_| anyhow!("Invalid BACKUP_TIMEZONE value: {}", time_zone_name))?;

        let deadline_secs = env::var("BACKUP_DEADLINE_SECS")
            .unwrap_or_else(|_| "540".to_string())
            .parse::<u64>()
            .context("Invalid BACKUP_DEADLINE_SECS value")?;

        Ok(BackupConfig {
            bucket,
            prefix,
            collections,
            schedule,
            time_zone,
            deadline: Duration::from_secs(deadline_secs),
        })
    }
}

impl GoogleConfig {
    fn load() -> anyhow::Result<Self> {
        let credentials_path = env::var("GOOGLE_APPLICATION_CREDENTIALS")
            .ok()
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        Ok(GoogleConfig {
            credentials_path,
            firestore_api_base: base_url("FIRESTORE_API_BASE", DEFAULT_FIRESTORE_API_BASE)?,
            identity_api_base: base_url("IDENTITY_API_BASE", DEFAULT_IDENTITY_API_BASE)?,
            metadata_base: base_url("GCE_METADATA_BASE", DEFAULT_METADATA_BASE)?,
        })
    }
}

impl SmtpConfig {
    fn load() -> anyhow::Result<Self> {
        let host = env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse::<u16>()
            .context("Invalid SMTP_PORT value")?;
        let username = env::var("SMTP_USERNAME").unwrap_or_default();
        let password = env::var("SMTP_PASSWORD").unwrap_or_default();
        let from_address = env::var("SMTP_FROM_ADDRESS")
            .unwrap_or_else(|_| "Barangay Reports <noreply@barangay-reports.local>".to_string());
        let skip_send = env::var("SMTP_SKIP_SEND").unwrap_or_default() == "true";

        Ok(SmtpConfig {
            host,
            port,
            username,
            password,
            from_address,
            skip_send,
        })
    }
}

pub fn parse_collections(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parses an API base URL, forcing a trailing slash so relative joins append.
pub fn parse_base_url(raw: &str) -> Result<Url, url::ParseError> {
    if raw.ends_with('/') {
        Url::parse(raw)
    } else {
        Url::parse(&format!("{}/", raw))
    }
}

fn base_url(var: &str, default: &str) -> anyhow::Result<Url> {
    let raw = env::var(var).unwrap_or_else(|_| default.to_string());
    parse_base_url(&raw).with_context(|| format!("Invalid {} value: {}", var, raw))
}

pub fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<empty>".into();
    }
    let prefix = s.chars().take(4).collect::<String>();
    format!("{}*** (len={})", prefix, s.len())
}

/// Placeholder signing secret for local development only.
pub const DEV_CALLER_JWT_SECRET: &str = "your-secret-key-change-this-in-production";

fn caller_jwt_secret(configured: Option<String>) -> String {
    match configured.filter(|secret| !secret.is_empty()) {
        Some(secret) => secret,
        None => {
            tracing::warn!(
                "CALLER_JWT_SECRET is not set; using the built-in development secret. Set it before deploying"
            );
            DEV_CALLER_JWT_SECRET.to_string()
        }
    }
}
