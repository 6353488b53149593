use anyhow::Context;
use std::{sync::Arc, time::Duration};

use crate::{
    config::Config,
    db::connection::DbPool,
    repositories::audit_log::{AuditLogStore, PgAuditLogStore},
    services::{
        audit_log::AuditLogService,
        backup::{BackupOrchestrator, BackupSettings},
        change_reactor::ChangeReactor,
        role_assignment::{RoleAssigner, RoleGrant},
    },
    utils::{
        email::{Mailer, SmtpMailer},
        export::{ExportClient, FirestoreExportClient},
        google_auth::{token_provider_from_config, TokenProvider},
        identity::{IdentityProvider, IdentityToolkitClient},
    },
};

const PLATFORM_HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// External collaborators the services are wired to.
#[derive(Clone)]
pub struct Capabilities {
    pub identity: Arc<dyn IdentityProvider>,
    pub tokens: Arc<dyn TokenProvider>,
    pub exporter: Arc<dyn ExportClient>,
    pub mailer: Arc<dyn Mailer>,
    pub audit_store: Arc<dyn AuditLogStore>,
}

impl Capabilities {
    /// Production clients: platform REST APIs, SMTP relay and the Postgres log store.
    pub fn from_config(config: &Config, pool: DbPool) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(PLATFORM_HTTP_TIMEOUT)
            .build()
            .context("Failed to build platform HTTP client")?;

        let tokens = token_provider_from_config(http.clone(), &config.google)
            .context("Failed to initialise platform credentials")?;
        let identity = IdentityToolkitClient::new(
            http.clone(),
            config.google.identity_api_base.clone(),
            config.project_id.clone(),
            tokens.clone(),
        );
        let exporter = FirestoreExportClient::new(
            http,
            config.google.firestore_api_base.clone(),
            config.project_id.clone(),
        );
        let mailer = SmtpMailer::new(&config.smtp).context("Invalid SMTP configuration")?;

        Ok(Self {
            identity: Arc::new(identity),
            tokens,
            exporter: Arc::new(exporter),
            mailer: Arc::new(mailer),
            audit_store: Arc::new(PgAuditLogStore::new(pool)),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub admin_roles: Arc<RoleAssigner>,
    pub official_roles: Arc<RoleAssigner>,
    pub backups: Arc<BackupOrchestrator>,
    pub reactor: Arc<ChangeReactor>,
}

impl AppState {
    pub fn new(config: Config, capabilities: Capabilities) -> Self {
        let audit_log = AuditLogService::new(capabilities.audit_store);

        let backups = BackupOrchestrator::new(
            BackupSettings::from(&config.backup),
            capabilities.tokens,
            capabilities.exporter,
            audit_log.clone(),
        );

        Self {
            admin_roles: Arc::new(RoleAssigner::new(
                capabilities.identity.clone(),
                RoleGrant::admin(),
            )),
            official_roles: Arc::new(RoleAssigner::new(
                capabilities.identity,
                RoleGrant::barangay_official(),
            )),
            backups: Arc::new(backups),
            reactor: Arc::new(ChangeReactor::new(capabilities.mailer, audit_log)),
            config,
        }
    }

    pub fn from_config(config: Config, pool: DbPool) -> anyhow::Result<Self> {
        let capabilities = Capabilities::from_config(&config, pool)?;
        Ok(Self::new(config, capabilities))
    }
}
