use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::pool::PoolConnection;
use sqlx::{Connection, Row, Sqlite, SqlitePool};
use tracing::{error, info};

/// A schema script plus the introspection that decides whether it still has
/// work to do. There is no version-tracking table: every script must be safe
/// to replay, either because its statements guard themselves (`IF NOT
/// EXISTS`, the ADD COLUMN check below) or because `applies_if` probes for
/// the legacy shape the script exists to repair.
struct MigrationScript {
    name: &'static str,
    sql: &'static str,
    applies_if: Option<&'static str>,
}

const USERS_ROLE_REBUILD: &str = "202607271900_users_role_rebuild.sql";

static MIGRATIONS: &[MigrationScript] = &[
    MigrationScript {
        name: "202602031000_initial.sql",
        sql: include_str!("../migrations/202602031000_initial.sql"),
        applies_if: None,
    },
    MigrationScript {
        name: "202602171230_maintenance.sql",
        sql: include_str!("../migrations/202602171230_maintenance.sql"),
        applies_if: None,
    },
    MigrationScript {
        name: "202603021100_audit_and_expenses.sql",
        sql: include_str!("../migrations/202603021100_audit_and_expenses.sql"),
        applies_if: None,
    },
    MigrationScript {
        name: "202604151500_guarantors.sql",
        sql: include_str!("../migrations/202604151500_guarantors.sql"),
        applies_if: None,
    },
    MigrationScript {
        name: "202605061320_property_owner.sql",
        sql: include_str!("../migrations/202605061320_property_owner.sql"),
        applies_if: None,
    },
    MigrationScript {
        name: "202606101045_owner_name_fold.sql",
        sql: include_str!("../migrations/202606101045_owner_name_fold.sql"),
        applies_if: Some("SELECT 1 FROM pragma_table_info('properties') WHERE name = 'ownerName'"),
    },
    MigrationScript {
        name: USERS_ROLE_REBUILD,
        sql: include_str!("../migrations/202607271900_users_role_rebuild.sql"),
        applies_if: Some(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'users' \
             AND sql NOT LIKE '%accountant%'",
        ),
    },
    MigrationScript {
        name: "202608011400_payment_reference.sql",
        sql: include_str!("../migrations/202608011400_payment_reference.sql"),
        applies_if: None,
    },
];

static ADD_COL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^ALTER\s+TABLE\s+(\w+)\s+ADD\s+COLUMN\s+(\w+)").unwrap());

fn preview(sql: &str) -> String {
    let one_line = sql.replace(['\n', '\t'], " ");
    let trimmed = one_line.trim();
    if trimmed.len() > 160 {
        format!("{}…", &trimmed[..160])
    } else {
        trimmed.to_string()
    }
}

fn clean(raw_sql: &str) -> String {
    raw_sql
        .lines()
        .filter(|line| {
            let t = line.trim_start();
            !(t.is_empty() || t.starts_with("--"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Names of the bundled migration scripts, in application order.
pub fn script_names() -> Vec<&'static str> {
    MIGRATIONS.iter().map(|m| m.name).collect()
}

/// Brings the database up to the current schema. Replay-safe: scripts whose
/// probe finds nothing to do are skipped whole, and individual statements are
/// skipped when introspection shows their effect is already present.
pub async fn apply_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    let mut conn = pool.acquire().await?;

    for script in MIGRATIONS {
        let cleaned = clean(script.sql);

        if let Some(probe) = script.applies_if {
            let hit: Option<i64> = sqlx::query_scalar(probe).fetch_optional(&mut *conn).await?;
            if hit.is_none() {
                info!(target: "rentdesk", event = "migration_skip_file", file = %script.name);
                continue;
            }
        }

        if script.name == USERS_ROLE_REBUILD {
            apply_rebuild(&mut conn, script.name, &cleaned).await?;
        } else {
            apply_script(&mut conn, script.name, &cleaned).await?;
        }

        info!(target: "rentdesk", event = "migration_file_applied", file = %script.name);
    }

    Ok(())
}

async fn apply_script(
    conn: &mut PoolConnection<Sqlite>,
    filename: &str,
    cleaned: &str,
) -> anyhow::Result<()> {
    let mut tx = conn.begin().await?;

    for stmt in cleaned.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        let upper = s.to_ascii_uppercase();
        if upper == "BEGIN" || upper == "COMMIT" {
            continue;
        }
        if let Some(caps) = ADD_COL_RE.captures(s) {
            let table = &caps[1];
            let col = &caps[2];
            let exists: Option<i64> = sqlx::query_scalar(&format!(
                "SELECT 1 FROM pragma_table_info('{table}') WHERE name = '{col}'"
            ))
            .fetch_optional(&mut *tx)
            .await?;
            if exists.is_some() {
                info!(target: "rentdesk", event = "migration_stmt_skip", file = %filename, sql = %preview(s));
                continue;
            }
        }
        info!(target: "rentdesk", event = "migration_stmt", file = %filename, sql = %preview(s));
        if let Err(e) = sqlx::query(s).execute(&mut *tx).await {
            error!(target: "rentdesk", event = "migration_stmt_error", file = %filename, sql = %preview(s), error = %e);
            return Err(e.into());
        }
    }

    tx.commit().await?;
    Ok(())
}

/// Table rebuilds (copy, drop, rename) must run with foreign-key enforcement
/// off on the driving connection; otherwise the rename rewrites every
/// REFERENCES clause pointing at the old table. The pragma is a no-op inside
/// a transaction, so it is flipped before the script's own transaction opens
/// and restored afterwards, with a foreign_key_check standing in for the
/// enforcement that was suspended.
async fn apply_rebuild(
    conn: &mut PoolConnection<Sqlite>,
    filename: &str,
    cleaned: &str,
) -> anyhow::Result<()> {
    sqlx::query("PRAGMA foreign_keys = OFF")
        .execute(&mut **conn)
        .await?;

    let applied = run_rebuild_tx(conn, filename, cleaned).await;

    let restored = sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&mut **conn)
        .await;

    applied?;
    restored?;

    let verdict: String = sqlx::query_scalar("PRAGMA integrity_check")
        .fetch_one(&mut **conn)
        .await?;
    if verdict != "ok" {
        anyhow::bail!("integrity_check after {filename}: {verdict}");
    }

    Ok(())
}

async fn run_rebuild_tx(
    conn: &mut PoolConnection<Sqlite>,
    filename: &str,
    cleaned: &str,
) -> anyhow::Result<()> {
    let mut tx = conn.begin().await?;

    for stmt in cleaned.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        let upper = s.to_ascii_uppercase();
        if upper == "BEGIN" || upper == "COMMIT" {
            continue;
        }
        info!(target: "rentdesk", event = "migration_stmt", file = %filename, sql = %preview(s));
        if let Err(e) = sqlx::query(s).execute(&mut *tx).await {
            error!(target: "rentdesk", event = "migration_stmt_error", file = %filename, sql = %preview(s), error = %e);
            return Err(e.into());
        }
    }

    let violations = sqlx::query("PRAGMA foreign_key_check")
        .fetch_all(&mut *tx)
        .await?;
    if !violations.is_empty() {
        for row in &violations {
            let table: String = row.try_get(0).unwrap_or_default();
            let target: String = row.try_get(2).unwrap_or_default();
            error!(target: "rentdesk", event = "migration_fk_violation", file = %filename, table = %table, references = %target);
        }
        anyhow::bail!(
            "foreign_key_check after {filename}: {} violation(s)",
            violations.len()
        );
    }

    tx.commit().await?;
    Ok(())
}
