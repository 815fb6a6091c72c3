use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::error::{AppError, AppResult};
use crate::id::new_uuid_v7;
use crate::model::AuditLog;
use crate::time::now_ms;

fn deserialize_audit_log(row: &SqliteRow) -> AppResult<AuditLog> {
    Ok(AuditLog {
        id: row.get("id"),
        user_id: row.get("user_id"),
        action: row.get("action"),
        details: row.try_get("details").ok().flatten(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// Appends one entry to the trail. Unknown users surface as the foreign-key
/// violation they are. The generic accessors refuse updates and deletes on
/// this table, so the insert path here is the only way anything changes.
pub async fn record_action(
    pool: &SqlitePool,
    user_id: &str,
    action: &str,
    details: Option<&str>,
) -> AppResult<AuditLog> {
    let id = new_uuid_v7();
    let now = now_ms();

    sqlx::query(
        "INSERT INTO audit_logs (id, user_id, action, details, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(&id)
    .bind(user_id)
    .bind(action)
    .bind(details)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|err| {
        AppError::from(err)
            .with_context("operation", "audit_record")
            .with_context("user_id", user_id.to_string())
            .with_context("action", action.to_string())
    })?;

    Ok(AuditLog {
        id,
        user_id: user_id.to_string(),
        action: action.to_string(),
        details: details.map(|s| s.to_string()),
        created_at: now,
        updated_at: now,
    })
}

/// Newest entries first.
pub async fn recent_actions(pool: &SqlitePool, limit: i64) -> AppResult<Vec<AuditLog>> {
    let rows = sqlx::query("SELECT * FROM audit_logs ORDER BY created_at DESC, id DESC LIMIT ?")
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(|err| AppError::from(err).with_context("operation", "audit_recent"))?;
    rows.iter().map(deserialize_audit_log).collect()
}

/// A single user's trail, newest first.
pub async fn actions_for_user(
    pool: &SqlitePool,
    user_id: &str,
    limit: i64,
) -> AppResult<Vec<AuditLog>> {
    let rows = sqlx::query(
        "SELECT * FROM audit_logs WHERE user_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|err| {
        AppError::from(err)
            .with_context("operation", "audit_for_user")
            .with_context("user_id", user_id.to_string())
    })?;
    rows.iter().map(deserialize_audit_log).collect()
}
