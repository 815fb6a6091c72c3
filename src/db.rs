use futures::future::BoxFuture;
use sha2::{Digest, Sha256};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::path::{Path, PathBuf};

/// Default on-disk location when no environment override is given.
pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("rentdesk")
        .join("rentdesk.sqlite3")
}

/// Resolves the database location from `DATABASE_URL` (a `sqlite://` URL or
/// a bare path) with `RENTDESK_DB` as a fallback.
pub fn database_path_from_env() -> Option<PathBuf> {
    let raw = std::env::var("DATABASE_URL")
        .or_else(|_| std::env::var("RENTDESK_DB"))
        .ok()?;
    let trimmed = raw
        .strip_prefix("sqlite://")
        .or_else(|| raw.strip_prefix("sqlite:"))
        .unwrap_or(&raw);
    if trimmed.is_empty() {
        return None;
    }
    Some(PathBuf::from(trimmed))
}

pub async fn open_pool(db_path: &Path, create_if_missing: bool) -> anyhow::Result<SqlitePool> {
    if create_if_missing {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    tracing::error!(
                        target: "rentdesk",
                        event = "db_dir_create_failed",
                        error = %e,
                        path = %parent.display()
                    );
                    e
                })?;
            }
        }
    }
    tracing::info!(target: "rentdesk", event = "db_path", path = %db_path.display());

    let opts = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(create_if_missing)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Full);

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .after_connect(|conn, _| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys=ON;")
                    .execute(&mut *conn)
                    .await?;
                sqlx::query("PRAGMA busy_timeout = 5000;")
                    .execute(&mut *conn)
                    .await?;
                sqlx::query("PRAGMA wal_autocheckpoint = 1000;")
                    .execute(&mut *conn)
                    .await?;
                Ok::<_, sqlx::Error>(())
            })
        })
        .connect_with(opts)
        .await?;

    log_effective_pragmas(&pool).await;

    Ok(pool)
}

async fn log_effective_pragmas(pool: &SqlitePool) {
    use tracing::{info, warn};

    let (sqlite_ver,): (String,) = sqlx::query_as("select sqlite_version()")
        .fetch_one(pool)
        .await
        .unwrap_or((String::from("unknown"),));

    let jm: (String,) = sqlx::query_as("PRAGMA journal_mode;")
        .fetch_one(pool)
        .await
        .unwrap_or((String::from("unknown"),));

    let fks: (i64,) = sqlx::query_as("PRAGMA foreign_keys;")
        .fetch_one(pool)
        .await
        .unwrap_or((i64::MIN,));

    let busy: (i64,) = sqlx::query_as("PRAGMA busy_timeout;")
        .fetch_one(pool)
        .await
        .unwrap_or((i64::MIN,));

    info!(
        target: "rentdesk",
        event = "db_open",
        sqlite_version = %sqlite_ver,
        journal_mode = %jm.0,
        foreign_keys = %fks.0,
        busy_timeout_ms = %busy.0
    );

    if !jm.0.eq_ignore_ascii_case("wal") {
        warn!(
            target: "rentdesk",
            event = "db_open_warning",
            msg = "journal_mode != WAL; running with reduced crash safety"
        );
    }
}

/// Run work inside a transaction. Commits on success, rolls back on error.
pub async fn run_in_tx<R, E, F>(pool: &SqlitePool, f: F) -> Result<R, E>
where
    E: From<sqlx::Error>,
    F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, Result<R, E>>,
{
    use tracing::{error, info, warn};

    let mut tx: Transaction<'_, Sqlite> = pool.begin().await.map_err(E::from)?;
    info!(target: "rentdesk", event = "db_tx_begin");
    match f(&mut *tx).await {
        Ok(val) => {
            tx.commit().await.map_err(E::from)?;
            info!(target: "rentdesk", event = "db_tx_commit");
            Ok(val)
        }
        Err(e) => {
            if let Err(rb) = tx.rollback().await {
                error!(target: "rentdesk", event = "db_tx_rollback_failed", error = %rb);
            } else {
                warn!(target: "rentdesk", event = "db_tx_rollback");
            }
            Err(e)
        }
    }
}

/// Stable digest of every user-visible schema object. Two databases that
/// migrated along different paths should land on the same fingerprint.
pub async fn schema_fingerprint(pool: &SqlitePool) -> anyhow::Result<String> {
    let rows = sqlx::query(
        "SELECT type, name, tbl_name, sql FROM sqlite_master\n         WHERE type IN ('table','index','trigger','view')\n           AND name NOT LIKE 'sqlite_%'\n         ORDER BY type, name",
    )
    .fetch_all(pool)
    .await?;

    let mut hasher = Sha256::new();
    for row in rows {
        let ty: String = row.try_get("type")?;
        let name: String = row.try_get("name")?;
        let tbl: String = row.try_get("tbl_name")?;
        let sql: Option<String> = row.try_get("sql").ok();

        hasher.update(ty.as_bytes());
        hasher.update([0]);
        hasher.update(name.as_bytes());
        hasher.update([0]);
        hasher.update(tbl.as_bytes());
        hasher.update([0]);
        if let Some(sql) = sql {
            hasher.update(sql.as_bytes());
        }
        hasher.update([0]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
