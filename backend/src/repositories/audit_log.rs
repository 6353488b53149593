//! Append-only access to the `transaction_logs` table.

use async_trait::async_trait;
use sqlx::{types::Json, PgPool};

use crate::models::audit_log::{AuditEntry, NewAuditEntry};

/// Advisory lock serialising appends so timestamps never run backwards.
const APPEND_LOCK_KEY: i64 = 0x7472_616e_736c_6f67;

#[derive(Debug, thiserror::Error)]
pub enum AuditLogError {
    #[error("failed to write audit entry: {0}")]
    Write(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appended {
    Inserted,
    /// An entry with the same idempotency key already exists.
    Duplicate,
}

/// The log store. Implementations assign the timestamp at write time.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditLogStore: Send + Sync {
    async fn append(&self, entry: &NewAuditEntry) -> Result<Appended, AuditLogError>;
}

#[derive(Debug, Clone)]
pub struct PgAuditLogStore {
    pool: PgPool,
}

impl PgAuditLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLogStore for PgAuditLogStore {
    async fn append(&self, entry: &NewAuditEntry) -> Result<Appended, AuditLogError> {
        insert_audit_entry(&self.pool, entry).await
    }
}

pub async fn insert_audit_entry(
    pool: &PgPool,
    entry: &NewAuditEntry,
) -> Result<Appended, AuditLogError> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(APPEND_LOCK_KEY)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query(
        "INSERT INTO transaction_logs \
         (type, message, meta, entity_reference, idempotency_key, occurred_at) \
         VALUES ($1, $2, $3, $4, $5, GREATEST(clock_timestamp(), \
         COALESCE((SELECT MAX(occurred_at) FROM transaction_logs), clock_timestamp()))) \
         ON CONFLICT (idempotency_key) DO NOTHING",
    )
    .bind(entry.event_type.as_str())
    .bind(&entry.message)
    .bind(Json(&entry.meta))
    .bind(&entry.entity_reference)
    .bind(&entry.idempotency_key)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    if result.rows_affected() == 0 {
        Ok(Appended::Duplicate)
    } else {
        Ok(Appended::Inserted)
    }
}

/// Most recent entries first.
pub async fn list_recent_audit_entries(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<AuditEntry>, sqlx::Error> {
    sqlx::query_as::<_, AuditEntry>(
        "SELECT id, type, message, meta, entity_reference, idempotency_key, occurred_at \
         FROM transaction_logs ORDER BY occurred_at DESC, id DESC LIMIT $1",
    )
    .bind(limit.clamp(1, 500))
    .fetch_all(pool)
    .await
}

/// Entries in write order.
pub async fn list_audit_entries_in_write_order(
    pool: &PgPool,
) -> Result<Vec<AuditEntry>, sqlx::Error> {
    sqlx::query_as::<_, AuditEntry>(
        "SELECT id, type, message, meta, entity_reference, idempotency_key, occurred_at \
         FROM transaction_logs ORDER BY id ASC",
    )
    .fetch_all(pool)
    .await
}
