//! Weekly backup schedule.
//!
//! Each firing is independent: a missed or failed cycle is not retried and the
//! next cycle runs at its normal time.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use std::{str::FromStr, sync::Arc, time::Duration};
use tokio::task::JoinHandle;

use crate::{
    config::BackupConfig,
    models::{backup::BackupRecord, user::Caller},
    services::backup::BackupOrchestrator,
};

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("invalid backup schedule '{expression}': {source}")]
    Expression {
        expression: String,
        #[source]
        source: cron::error::Error,
    },
}

/// Recurrence rule evaluated in a fixed time zone, plus the per-run deadline.
#[derive(Debug, Clone)]
pub struct BackupSchedule {
    expression: String,
    schedule: Schedule,
    time_zone: Tz,
    deadline: Duration,
}

impl BackupSchedule {
    /// Accepts six-field (with seconds) or classic five-field cron expressions.
    pub fn parse(expression: &str, time_zone: Tz, deadline: Duration) -> Result<Self, ScheduleError> {
        let normalized = normalize_expression(expression);
        let schedule = Schedule::from_str(&normalized).map_err(|source| ScheduleError::Expression {
            expression: expression.to_string(),
            source,
        })?;

        Ok(Self {
            expression: normalized,
            schedule,
            time_zone,
            deadline,
        })
    }

    pub fn from_config(config: &BackupConfig) -> Result<Self, ScheduleError> {
        Self::parse(&config.schedule, config.time_zone, config.deadline)
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// First firing strictly after `now`, in UTC.
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let local = now.with_timezone(&self.time_zone);
        self.schedule
            .after(&local)
            .next()
            .map(|next| next.with_timezone(&Utc))
    }
}

fn normalize_expression(expression: &str) -> String {
    let trimmed = expression.trim();
    if trimmed.split_whitespace().count() == 5 {
        format!("0 {}", trimmed)
    } else {
        trimmed.to_string()
    }
}

#[derive(Debug)]
pub enum CycleOutcome {
    Completed(BackupRecord),
    Failed(String),
    TimedOut,
}

/// Runs one scheduled backup as the system caller, bounded by the deadline.
pub async fn run_cycle(orchestrator: &BackupOrchestrator, deadline: Duration) -> CycleOutcome {
    match tokio::time::timeout(deadline, orchestrator.run_scheduled(&Caller::System)).await {
        Ok(Ok(record)) => {
            tracing::info!("Scheduled backup stored at {}", record.output_location);
            CycleOutcome::Completed(record)
        }
        Ok(Err(err)) => {
            tracing::error!(error = %err, "Scheduled backup failed");
            CycleOutcome::Failed(err.to_string())
        }
        Err(_) => {
            tracing::error!(
                deadline_secs = deadline.as_secs(),
                "Scheduled backup exceeded its deadline"
            );
            CycleOutcome::TimedOut
        }
    }
}

/// Sleeps until each firing and runs a cycle, forever.
pub fn spawn_weekly_backup(
    schedule: BackupSchedule,
    orchestrator: Arc<BackupOrchestrator>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(
            schedule = %schedule.expression(),
            time_zone = %schedule.time_zone(),
            "Backup scheduler started"
        );

        loop {
            let now = Utc::now();
            let Some(next) = schedule.next_after(now) else {
                tracing::warn!("Backup schedule has no future firings, stopping scheduler");
                return;
            };
            tracing::debug!(next_run = %next, "Next scheduled backup");

            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            run_cycle(&orchestrator, schedule.deadline()).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::DEFAULT_BACKUP_SCHEDULE,
        models::backup::BackupTrigger,
        repositories::audit_log::{Appended, MockAuditLogStore},
        services::{audit_log::AuditLogService, backup::BackupSettings},
        utils::{
            export::{ExportError, ExportHandle, MockExportClient},
            google_auth::{AccessToken, MockTokenProvider},
        },
    };
    use chrono::TimeZone;

    fn manila() -> Tz {
        "Asia/Manila".parse().unwrap()
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).single().unwrap()
    }

    fn orchestrator(exporter: MockExportClient, store: MockAuditLogStore) -> BackupOrchestrator {
        let mut tokens = MockTokenProvider::new();
        tokens
            .expect_access_token()
            .returning(|_| Ok(AccessToken("token".to_string())));

        BackupOrchestrator::new(
            BackupSettings {
                bucket: "demo.appspot.com".to_string(),
                prefix: "firestore_backups".to_string(),
                collections: vec!["reports".to_string()],
            },
            Arc::new(tokens),
            Arc::new(exporter),
            AuditLogService::new(Arc::new(store)),
        )
    }

    #[test]
    fn next_firing_is_monday_one_am_manila() {
        let schedule =
            BackupSchedule::parse(DEFAULT_BACKUP_SCHEDULE, manila(), Duration::from_secs(540))
                .unwrap();
        // Sunday 08:00 in Manila.
        let next = schedule.next_after(utc(2026, 10, 18, 0, 0)).unwrap();
        assert_eq!(next, utc(2026, 10, 18, 17, 0));
    }

    #[test]
    fn firings_are_one_week_apart() {
        let schedule =
            BackupSchedule::parse(DEFAULT_BACKUP_SCHEDULE, manila(), Duration::from_secs(540))
                .unwrap();
        let first = schedule.next_after(utc(2026, 10, 18, 0, 0)).unwrap();
        let second = schedule.next_after(first).unwrap();
        assert_eq!(second - first, chrono::Duration::weeks(1));
    }

    #[test]
    fn five_field_expressions_are_accepted() {
        let schedule =
            BackupSchedule::parse("0 1 * * Mon", manila(), Duration::from_secs(540)).unwrap();
        assert_eq!(schedule.expression(), "0 0 1 * * Mon");
        assert_eq!(
            schedule.next_after(utc(2026, 10, 18, 0, 0)),
            Some(utc(2026, 10, 18, 17, 0))
        );
    }

    #[test]
    fn invalid_expression_is_rejected() {
        let err = BackupSchedule::parse("every monday", manila(), Duration::from_secs(540))
            .unwrap_err();
        assert!(err.to_string().contains("every monday"));
    }

    #[tokio::test]
    async fn cycle_completes_with_a_scheduled_record() {
        let mut exporter = MockExportClient::new();
        exporter
            .expect_export_collections()
            .times(1)
            .returning(|_, _, _| Ok(ExportHandle { operation: None }));
        let mut store = MockAuditLogStore::new();
        store
            .expect_append()
            .withf(|entry| entry.message == "Backup created via scheduled")
            .times(1)
            .returning(|_| Ok(Appended::Inserted));

        let outcome = run_cycle(&orchestrator(exporter, store), Duration::from_secs(5)).await;
        match outcome {
            CycleOutcome::Completed(record) => {
                assert_eq!(record.trigger, BackupTrigger::Scheduled)
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_export_ends_the_cycle_without_audit() {
        let mut exporter = MockExportClient::new();
        exporter.expect_export_collections().returning(|_, _, _| {
            Err(ExportError::Rejected {
                status: 500,
                body: "backend error".to_string(),
            })
        });
        let mut store = MockAuditLogStore::new();
        store.expect_append().never();

        let outcome = run_cycle(&orchestrator(exporter, store), Duration::from_secs(5)).await;
        assert!(matches!(outcome, CycleOutcome::Failed(message) if message.contains("backend error")));
    }
}
