//! Collection export orchestration for manual and scheduled backups.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;

use crate::{
    config::BackupConfig,
    error::{AppError, FailurePolicy},
    models::{
        audit_log::{AuditEventType, NewAuditEntry},
        backup::{BackupRecord, BackupTarget, BackupTrigger},
        user::{Caller, Role},
    },
    repositories::audit_log::AuditLogError,
    services::{
        audit_log::AuditLogService,
        authorization::{authorize, Requirement},
    },
    utils::{
        export::{ExportClient, ExportError},
        google_auth::{TokenError, TokenProvider, DATASTORE_SCOPE},
        time::backup_path_segment,
    },
};

const BACKUP_DENIED: &str = "Only admins can trigger backups";

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    AuditLog(#[from] AuditLogError),
}

/// Fixed export destination and contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSettings {
    pub bucket: String,
    pub prefix: String,
    pub collections: Vec<String>,
}

impl From<&BackupConfig> for BackupSettings {
    fn from(config: &BackupConfig) -> Self {
        Self {
            bucket: config.bucket.clone(),
            prefix: config.prefix.clone(),
            collections: config.collections.clone(),
        }
    }
}

/// Computes where an export started at `now` is written.
pub fn build_target(settings: &BackupSettings, now: DateTime<Utc>) -> BackupTarget {
    BackupTarget {
        output_location: format!(
            "gs://{}/{}/{}",
            settings.bucket,
            settings.prefix.trim_matches('/'),
            backup_path_segment(now)
        ),
        collections: settings.collections.clone(),
    }
}

pub struct BackupOrchestrator {
    settings: BackupSettings,
    tokens: Arc<dyn TokenProvider>,
    exporter: Arc<dyn ExportClient>,
    audit_log: AuditLogService,
}

impl BackupOrchestrator {
    pub fn new(
        settings: BackupSettings,
        tokens: Arc<dyn TokenProvider>,
        exporter: Arc<dyn ExportClient>,
        audit_log: AuditLogService,
    ) -> Self {
        Self {
            settings,
            tokens,
            exporter,
            audit_log,
        }
    }

    /// On-demand backup requested by an administrator.
    pub async fn start_backup(&self, caller: &Caller) -> Result<BackupRecord, AppError> {
        authorize(caller, &Requirement::Role(Role::Admin), BACKUP_DENIED)?;

        self.perform_backup(BackupTrigger::Manual)
            .await
            .map_err(|err| {
                tracing::error!(caller = %caller.label(), error = %err, "Manual backup failed");
                AppError::internal(err)
            })
    }

    /// Backup fired by the recurring schedule, run as [`Caller::System`].
    pub async fn run_scheduled(&self, caller: &Caller) -> Result<BackupRecord, AppError> {
        authorize(caller, &Requirement::RoleOrSystem(Role::Admin), BACKUP_DENIED)?;

        self.perform_backup(BackupTrigger::Scheduled)
            .await
            .map_err(AppError::internal)
    }

    /// Requests the export and records it. Returns as soon as the export
    /// request is accepted; the exported data may not be readable yet.
    async fn perform_backup(&self, trigger: BackupTrigger) -> Result<BackupRecord, BackupError> {
        let target = build_target(&self.settings, Utc::now());

        let token = self.tokens.access_token(DATASTORE_SCOPE).await?;
        let handle = self
            .exporter
            .export_collections(&target.output_location, &target.collections, &token)
            .await?;

        tracing::info!(
            trigger = %trigger,
            output_location = %target.output_location,
            operation = ?handle.operation,
            "Export request accepted"
        );

        let entry = NewAuditEntry::new(
            AuditEventType::Backup,
            format!("Backup created via {}", trigger),
            Value::String(target.output_location.clone()),
        );
        FailurePolicy::Propagate.apply(self.audit_log.append(entry).await, "backup audit entry")?;

        Ok(BackupRecord {
            output_location: target.output_location,
            trigger,
            collections: target.collections,
            operation: handle.operation,
        })
    }
}
