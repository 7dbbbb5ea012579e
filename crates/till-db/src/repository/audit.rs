//! # Audit Repository
//!
//! Best-effort change log for back-office edits.
//!
//! Audit writes happen after the audited transaction commits, on their own
//! connection. A failed audit write is logged and dropped; it never turns a
//! successful operation into an error.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::DbResult;
use till_core::{AuditLog, AUDIT_CHANGES_MAX_CHARS};

/// One audit record to write.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub user_id: i64,
    pub entity_name: &'static str,
    pub entity_id: String,
    pub action: &'static str,
    pub changes: Option<serde_json::Value>,
}

/// Repository for the audit log.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: SqlitePool,
}

impl AuditRepository {
    /// Creates a new AuditRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AuditRepository { pool }
    }

    /// Writes one record.
    pub async fn record(&self, entry: AuditEntry, now: DateTime<Utc>) -> DbResult<i64> {
        let changes = entry.changes.map(|v| truncate_chars(v.to_string(), AUDIT_CHANGES_MAX_CHARS));

        let id = sqlx::query(
            r#"
            INSERT INTO audit_logs (user_id, entity_name, entity_id, action, changes, occurred_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.entity_name)
        .bind(&entry.entity_id)
        .bind(entry.action)
        .bind(changes)
        .bind(now)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        debug!(
            entity = entry.entity_name,
            entity_id = %entry.entity_id,
            action = entry.action,
            "Audit recorded"
        );

        Ok(id)
    }

    /// Writes one record in the background. Failures are logged only.
    pub fn spawn_record(&self, entry: AuditEntry, now: DateTime<Utc>) -> JoinHandle<()> {
        let repo = self.clone();
        tokio::spawn(async move {
            let entity = entry.entity_name;
            let entity_id = entry.entity_id.clone();
            if let Err(e) = repo.record(entry, now).await {
                warn!(entity, entity_id = %entity_id, error = %e, "Audit write failed");
            }
        })
    }

    /// Lists the records of one entity, oldest first.
    pub async fn list_for_entity(&self, entity_name: &str, entity_id: &str) -> DbResult<Vec<AuditLog>> {
        let logs = sqlx::query_as::<_, AuditLog>(
            r#"
            SELECT id, user_id, entity_name, entity_id, action, changes, occurred_at
            FROM audit_logs
            WHERE entity_name = ?1 AND entity_id = ?2
            ORDER BY id
            "#,
        )
        .bind(entity_name)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }
}

fn truncate_chars(s: String, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s,
    }
}
