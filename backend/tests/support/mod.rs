#![allow(dead_code)]
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request},
    response::Response,
};
use barangay_backend::{
    config::{BackupConfig, Config, GoogleConfig, SmtpConfig, DEFAULT_BACKUP_SCHEDULE},
    models::{
        audit_log::NewAuditEntry,
        user::{Identity, Role},
    },
    repositories::audit_log::{Appended, AuditLogError, AuditLogStore},
    state::{AppState, Capabilities},
    utils::{
        email::{MailError, Mailer, OutgoingEmail},
        export::{ExportClient, ExportError, ExportHandle},
        google_auth::{AccessToken, TokenError, TokenProvider},
        identity::{IdentityError, IdentityProvider},
        jwt::{create_caller_token, CallerClaims},
    },
};
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{
    collections::HashMap,
    env,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use url::Url;

pub const JWT_SECRET: &str = "integration-test-secret";

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused/test".to_string(),
        bind_addr: "127.0.0.1:0".parse().expect("bind addr"),
        caller_jwt_secret: JWT_SECRET.to_string(),
        project_id: "demo".to_string(),
        backup: BackupConfig {
            bucket: "demo.appspot.com".to_string(),
            prefix: "firestore_backups".to_string(),
            collections: vec![
                "reports".to_string(),
                "barangays".to_string(),
                "ordinances".to_string(),
                "users".to_string(),
            ],
            schedule: DEFAULT_BACKUP_SCHEDULE.to_string(),
            time_zone: "Asia/Manila".parse().expect("time zone"),
            deadline: Duration::from_secs(540),
        },
        google: GoogleConfig {
            credentials_path: None,
            firestore_api_base: Url::parse("http://127.0.0.1:1/").expect("url"),
            identity_api_base: Url::parse("http://127.0.0.1:1/").expect("url"),
            metadata_base: Url::parse("http://127.0.0.1:1/").expect("url"),
        },
        smtp: SmtpConfig {
            host: "localhost".to_string(),
            port: 2525,
            username: String::new(),
            password: String::new(),
            from_address: "Barangay Reports <noreply@example.com>".to_string(),
            skip_send: true,
        },
    }
}

/// Signed bearer header for a caller with the given role claim.
pub fn bearer(uid: &str, role: Option<Role>) -> String {
    let claims = CallerClaims::new(
        uid.to_string(),
        Some(format!("{}@example.com", uid)),
        role,
        chrono::Duration::minutes(10),
    );
    format!(
        "Bearer {}",
        create_caller_token(&claims, JWT_SECRET).expect("sign caller token")
    )
}

pub fn json_post(uri: &str, auth: Option<&str>, body: Value) -> Request<Body> {
    raw_post(uri, auth, body.to_string())
}

pub fn raw_post(uri: &str, auth: Option<&str>, body: String) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body)).expect("build request")
}

pub async fn response_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[derive(Default)]
pub struct FakeIdentity {
    users: Mutex<HashMap<String, Identity>>,
    pub fail_updates: AtomicBool,
}

impl FakeIdentity {
    pub fn with_user(self, uid: &str, email: &str) -> Self {
        self.users.lock().expect("users").insert(
            email.to_string(),
            Identity {
                uid: uid.to_string(),
                email: email.to_string(),
                role: None,
            },
        );
        self
    }

    pub fn role_of(&self, email: &str) -> Option<Role> {
        self.users
            .lock()
            .expect("users")
            .get(email)
            .and_then(|identity| identity.role.clone())
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn get_user_by_email(&self, email: &str) -> Result<Identity, IdentityError> {
        self.users
            .lock()
            .expect("users")
            .get(email)
            .cloned()
            .ok_or_else(|| IdentityError::NotFound(email.to_string()))
    }

    async fn set_role(&self, uid: &str, role: &Role) -> Result<(), IdentityError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(IdentityError::Rejected {
                status: 503,
                body: "identity backend unavailable".to_string(),
            });
        }
        let mut users = self.users.lock().expect("users");
        let identity = users
            .values_mut()
            .find(|identity| identity.uid == uid)
            .ok_or_else(|| IdentityError::NotFound(uid.to_string()))?;
        identity.role = Some(role.clone());
        Ok(())
    }
}

pub struct StaticTokens;

#[async_trait]
impl TokenProvider for StaticTokens {
    async fn access_token(&self, _scope: &str) -> Result<AccessToken, TokenError> {
        Ok(AccessToken("test-token".to_string()))
    }
}

#[derive(Default)]
pub struct FakeExporter {
    pub requests: Mutex<Vec<(String, Vec<String>)>>,
    pub reject: AtomicBool,
    pub delay: Mutex<Option<Duration>>,
}

impl FakeExporter {
    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("requests").len()
    }
}

#[async_trait]
impl ExportClient for FakeExporter {
    async fn export_collections(
        &self,
        output_uri_prefix: &str,
        collections: &[String],
        _token: &AccessToken,
    ) -> Result<ExportHandle, ExportError> {
        let delay = *self.delay.lock().expect("delay");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.reject.load(Ordering::SeqCst) {
            return Err(ExportError::Rejected {
                status: 403,
                body: "export permission missing".to_string(),
            });
        }
        self.requests
            .lock()
            .expect("requests")
            .push((output_uri_prefix.to_string(), collections.to_vec()));
        Ok(ExportHandle {
            operation: Some("projects/demo/databases/(default)/operations/test".to_string()),
        })
    }
}

#[derive(Default)]
pub struct FakeMailer {
    pub sent: Mutex<Vec<OutgoingEmail>>,
    pub fail: AtomicBool,
}

impl FakeMailer {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().expect("sent").clone()
    }
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        if self.fail.load(Ordering::SeqCst) {
            let err = "not an address"
                .parse::<lettre::Address>()
                .expect_err("invalid address");
            return Err(MailError::Address(err));
        }
        self.sent.lock().expect("sent").push(email);
        Ok(())
    }
}

/// In-memory log store honouring idempotency keys.
#[derive(Default)]
pub struct MemoryAuditLog {
    pub entries: Mutex<Vec<NewAuditEntry>>,
    pub fail: AtomicBool,
}

impl MemoryAuditLog {
    pub fn snapshot(&self) -> Vec<NewAuditEntry> {
        self.entries.lock().expect("entries").clone()
    }
}

#[async_trait]
impl AuditLogStore for MemoryAuditLog {
    async fn append(&self, entry: &NewAuditEntry) -> Result<Appended, AuditLogError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AuditLogError::Write(sqlx::Error::PoolTimedOut));
        }
        let mut entries = self.entries.lock().expect("entries");
        if let Some(key) = entry.idempotency_key.as_deref() {
            if entries
                .iter()
                .any(|existing| existing.idempotency_key.as_deref() == Some(key))
            {
                return Ok(Appended::Duplicate);
            }
        }
        entries.push(entry.clone());
        Ok(Appended::Inserted)
    }
}

pub struct TestApp {
    pub state: AppState,
    pub identity: Arc<FakeIdentity>,
    pub exporter: Arc<FakeExporter>,
    pub mailer: Arc<FakeMailer>,
    pub audit_log: Arc<MemoryAuditLog>,
}

impl TestApp {
    pub fn new(identity: FakeIdentity) -> Self {
        let identity = Arc::new(identity);
        let exporter = Arc::new(FakeExporter::default());
        let mailer = Arc::new(FakeMailer::default());
        let audit_log = Arc::new(MemoryAuditLog::default());

        let state = AppState::new(
            test_config(),
            Capabilities {
                identity: identity.clone(),
                tokens: Arc::new(StaticTokens),
                exporter: exporter.clone(),
                mailer: mailer.clone(),
                audit_store: audit_log.clone(),
            },
        );

        Self {
            state,
            identity,
            exporter,
            mailer,
            audit_log,
        }
    }

    pub fn router(&self) -> axum::Router {
        barangay_backend::routes::router(self.state.clone())
    }
}

/// Pool for Postgres-backed tests; `None` when `TEST_DATABASE_URL` is unset.
pub async fn test_pool() -> Option<PgPool> {
    let url = env::var("TEST_DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("connect test database");
    Some(pool)
}
