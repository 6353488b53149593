//! Reactions to committed mutations on the `users` and `reports` collections.
//!
//! Each reaction is independent of every other; nothing is remembered between
//! events.

use serde_json::{json, Value};
use std::sync::Arc;

use crate::{
    error::FailurePolicy,
    models::{
        audit_log::{AuditEventType, NewAuditEntry},
        change_event::{field_text, DocumentChange},
        report::ReportDocument,
        user::UserDocument,
    },
    repositories::audit_log::AuditLogError,
    services::audit_log::AuditLogService,
    utils::email::{approval_email, MailError, Mailer},
};

const PENDING: &str = "pending";
const APPROVED: &str = "approved";
const UNKNOWN_ADDRESS: &str = "unknown address";
const ABSENT_STATUS: &str = "none";

#[derive(Debug, thiserror::Error)]
pub enum ReactionError {
    #[error(transparent)]
    Mail(#[from] MailError),
    #[error(transparent)]
    AuditLog(#[from] AuditLogError),
}

/// Failure policies for the two kinds of effects a reaction has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReactionPolicies {
    pub email: FailurePolicy,
    pub audit_log: FailurePolicy,
}

impl Default for ReactionPolicies {
    fn default() -> Self {
        Self {
            email: FailurePolicy::BestEffort,
            audit_log: FailurePolicy::BestEffort,
        }
    }
}

/// True only for the `pending` to `approved` transition.
pub fn is_approval(before: Option<&UserDocument>, after: &UserDocument) -> bool {
    let before_status = before
        .and_then(|doc| doc.status.as_ref())
        .and_then(Value::as_str);
    let after_status = after.status.as_ref().and_then(Value::as_str);
    before_status == Some(PENDING) && after_status == Some(APPROVED)
}

/// Human-readable descriptions of the audited fields that differ.
///
/// Fields are compared by value, whatever their type. Status changes name both
/// values; action changes never reveal them. A missing `actionTaken` is the
/// same as an empty one.
pub fn compute_change_descriptors(before: &ReportDocument, after: &ReportDocument) -> Vec<String> {
    let mut changed = Vec::new();

    if before.status != after.status {
        changed.push(format!(
            "status: {} -> {}",
            status_text(before.status.as_ref()),
            status_text(after.status.as_ref())
        ));
    }

    if action_or_empty(before) != action_or_empty(after) {
        changed.push("action updated".to_string());
    }

    changed
}

fn status_text(status: Option<&Value>) -> String {
    status.map_or_else(|| ABSENT_STATUS.to_string(), field_text)
}

fn action_or_empty(report: &ReportDocument) -> Value {
    report
        .action_taken
        .clone()
        .unwrap_or_else(|| Value::String(String::new()))
}

pub struct ChangeReactor {
    mailer: Arc<dyn Mailer>,
    audit_log: AuditLogService,
    policies: ReactionPolicies,
}

impl ChangeReactor {
    pub fn new(mailer: Arc<dyn Mailer>, audit_log: AuditLogService) -> Self {
        Self::with_policies(mailer, audit_log, ReactionPolicies::default())
    }

    pub fn with_policies(
        mailer: Arc<dyn Mailer>,
        audit_log: AuditLogService,
        policies: ReactionPolicies,
    ) -> Self {
        Self {
            mailer,
            audit_log,
            policies,
        }
    }

    pub fn policies(&self) -> ReactionPolicies {
        self.policies
    }

    /// `users/{id}` update: mail the user once their account is approved.
    pub async fn on_user_updated(
        &self,
        change: DocumentChange<UserDocument>,
    ) -> Result<(), ReactionError> {
        if !is_approval(change.before.as_ref(), &change.after) {
            return Ok(());
        }

        let Some(email) = change
            .after
            .email
            .as_ref()
            .and_then(Value::as_str)
            .filter(|e| !e.is_empty())
        else {
            tracing::warn!(user_id = %change.document_id, "Approved user has no email address");
            return Ok(());
        };
        let name = change
            .after
            .name
            .as_ref()
            .map_or_else(|| "there".to_string(), field_text);

        let sent = self
            .policies
            .email
            .apply(self.mailer.send(approval_email(email, &name)).await, "approval email")?;
        if sent.is_some() {
            tracing::info!(user_id = %change.document_id, "Approval email sent to {}", email);
        }
        Ok(())
    }

    /// `reports/{id}` create: always audited.
    pub async fn on_report_created(
        &self,
        change: DocumentChange<ReportDocument>,
    ) -> Result<(), ReactionError> {
        let report = &change.after;
        let entry = NewAuditEntry::new(
            AuditEventType::ReportCreated,
            format!(
                "Report submitted for {}",
                report
                    .address
                    .as_ref()
                    .map_or_else(|| UNKNOWN_ADDRESS.to_string(), field_text)
            ),
            json!({
                "ordinance": report.ordinance,
                "status": report.status,
            }),
        )
        .with_entity_reference(change.document_id.clone())
        .with_idempotency_key(idempotency_key(&change));

        self.append(entry).await
    }

    /// `reports/{id}` update: audited only when status or action changed.
    pub async fn on_report_updated(
        &self,
        change: DocumentChange<ReportDocument>,
    ) -> Result<(), ReactionError> {
        let before = change.before.clone().unwrap_or_default();
        let changed = compute_change_descriptors(&before, &change.after);
        if changed.is_empty() {
            return Ok(());
        }

        let entry = NewAuditEntry::new(
            AuditEventType::ReportUpdated,
            format!("Report {} updated ({})", change.document_id, changed.join(", ")),
            json!({ "status": change.after.status }),
        )
        .with_entity_reference(change.document_id.clone())
        .with_idempotency_key(idempotency_key(&change));

        self.append(entry).await
    }

    async fn append(&self, entry: NewAuditEntry) -> Result<(), ReactionError> {
        self.policies
            .audit_log
            .apply(self.audit_log.append(entry).await, "change audit entry")?;
        Ok(())
    }
}

/// Redelivered notifications carry the same event id, so the entry is stored once.
fn idempotency_key<T>(change: &DocumentChange<T>) -> Option<String> {
    change.event_id.as_ref().map(|event_id| {
        format!(
            "{}/{}/{}",
            change.collection.as_str(),
            change.document_id,
            event_id
        )
    })
}
