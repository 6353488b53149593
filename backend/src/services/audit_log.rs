use std::sync::Arc;

use crate::{
    models::audit_log::NewAuditEntry,
    repositories::audit_log::{Appended, AuditLogError, AuditLogStore},
};

/// Append-only writer for the audit trail. There is no read, update or delete path.
#[derive(Clone)]
pub struct AuditLogService {
    store: Arc<dyn AuditLogStore>,
}

impl AuditLogService {
    pub fn new(store: Arc<dyn AuditLogStore>) -> Self {
        Self { store }
    }

    /// Write failures are always returned; callers decide whether to absorb them.
    pub async fn append(&self, entry: NewAuditEntry) -> Result<Appended, AuditLogError> {
        let appended = self.store.append(&entry).await.map_err(|err| {
            tracing::error!(
                event_type = entry.event_type.as_str(),
                error = %err,
                "failed to append audit entry"
            );
            err
        })?;

        match appended {
            Appended::Inserted => tracing::debug!(
                event_type = entry.event_type.as_str(),
                entity_reference = ?entry.entity_reference,
                "audit entry appended"
            ),
            Appended::Duplicate => tracing::info!(
                event_type = entry.event_type.as_str(),
                idempotency_key = ?entry.idempotency_key,
                "duplicate audit entry ignored"
            ),
        }
        Ok(appended)
    }
}
