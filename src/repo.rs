use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, SqlitePool, TypeInfo, ValueRef};

use crate::error::{AppError, AppResult};
use crate::id::new_uuid_v7;
use crate::model::{
    REPO_ID_NOT_FOUND, REPO_INVALID_ORDER_BY, VALIDATION_MISSING_FIELD, VALIDATION_UNKNOWN_COLUMN,
};
use crate::schema;
use crate::time::now_ms;

/// Converts one SQLite row into a JSON object keyed by column name. SQLite
/// only ever hands back INTEGER, REAL, TEXT, BLOB or NULL; blobs come out as
/// text since no domain table stores one.
pub fn row_to_value(row: SqliteRow) -> Value {
    let mut map = Map::new();
    for col in row.columns() {
        let idx = col.ordinal();
        let v = row.try_get_raw(idx).ok();
        let val = match v {
            Some(raw) => {
                if raw.is_null() {
                    Value::Null
                } else {
                    match raw.type_info().name() {
                        "INTEGER" => row
                            .try_get::<i64, _>(idx)
                            .map(Value::from)
                            .unwrap_or(Value::Null),
                        "REAL" => row
                            .try_get::<f64, _>(idx)
                            .map(Value::from)
                            .unwrap_or(Value::Null),
                        _ => row
                            .try_get::<String, _>(idx)
                            .map(Value::from)
                            .unwrap_or(Value::Null),
                    }
                }
            }
            None => Value::Null,
        };
        map.insert(col.name().to_string(), val);
    }
    Value::Object(map)
}

fn bind_value<'q>(
    q: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    v: &Value,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    match v {
        Value::Null => q.bind(Option::<i64>::None),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(Option::<i64>::None)
            }
        }
        Value::Bool(b) => q.bind(*b as i64),
        Value::String(s) => q.bind(s.clone()),
        _ => q.bind(v.to_string()),
    }
}

/// Live column names for a table, in schema order.
pub async fn table_columns(pool: &SqlitePool, table: &str) -> AppResult<Vec<String>> {
    schema::ensure_table(table)?;
    let cols: Vec<String> =
        sqlx::query_scalar(&format!("SELECT name FROM pragma_table_info('{table}')"))
            .fetch_all(pool)
            .await
            .map_err(AppError::from)?;
    Ok(cols)
}

async fn ensure_known_columns(
    pool: &SqlitePool,
    table: &str,
    data: &Map<String, Value>,
) -> AppResult<()> {
    let columns = table_columns(pool, table).await?;
    for key in data.keys() {
        if !columns.iter().any(|c| c == key) {
            return Err(AppError::new(
                VALIDATION_UNKNOWN_COLUMN,
                "Payload names a column the table does not have",
            )
            .with_context("table", table.to_string())
            .with_context("column", key.clone()));
        }
    }
    Ok(())
}

static ORDER_TERM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\w+)(?:\s+(ASC|DESC))?$").unwrap());

/// Order clauses are interpolated into SQL, so they are held to a tight
/// shape: known column names with an optional direction each.
fn validated_order_by(raw: &str, columns: &[String]) -> AppResult<String> {
    let mut terms = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        let caps = ORDER_TERM_RE.captures(part).ok_or_else(|| {
            AppError::new(REPO_INVALID_ORDER_BY, "Malformed order_by term")
                .with_context("order_by", raw.to_string())
        })?;
        let col = &caps[1];
        if !columns.iter().any(|c| c == col) {
            return Err(
                AppError::new(REPO_INVALID_ORDER_BY, "order_by names an unknown column")
                    .with_context("order_by", raw.to_string())
                    .with_context("column", col.to_string()),
            );
        }
        match caps.get(2) {
            Some(dir) => terms.push(format!("{} {}", col, dir.as_str().to_ascii_uppercase())),
            None => terms.push(col.to_string()),
        }
    }
    Ok(terms.join(", "))
}

pub async fn list_rows(
    pool: &SqlitePool,
    table: &str,
    order_by: Option<&str>,
    limit: Option<i64>,
    offset: Option<i64>,
) -> AppResult<Vec<SqliteRow>> {
    schema::ensure_table(table)?;
    let order = match order_by {
        Some(raw) => {
            let columns = table_columns(pool, table).await?;
            validated_order_by(raw, &columns)?
        }
        // Row keys are time-ordered, so this tracks insertion order.
        None => String::from("id"),
    };
    let mut sql = format!("SELECT * FROM {table} ORDER BY {order}");
    match (limit, offset) {
        (Some(_), Some(_)) => sql.push_str(" LIMIT ? OFFSET ?"),
        (Some(_), None) => sql.push_str(" LIMIT ?"),
        (None, Some(_)) => sql.push_str(" LIMIT -1 OFFSET ?"),
        (None, None) => {}
    }
    let mut query = sqlx::query(&sql);
    if let Some(l) = limit {
        query = query.bind(l);
    }
    if let Some(o) = offset {
        query = query.bind(o);
    }
    query.fetch_all(pool).await.map_err(AppError::from)
}

pub async fn get_row(pool: &SqlitePool, table: &str, id: &str) -> AppResult<Option<SqliteRow>> {
    schema::ensure_table(table)?;
    let sql = format!("SELECT * FROM {table} WHERE id = ?");
    sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::from)
}

/// Inserts a payload whose keys are already canonical column names. Fills
/// `id`, `created_at` and `updated_at` when absent and echoes back the row
/// as written.
pub async fn insert_row(
    pool: &SqlitePool,
    table: &str,
    mut data: Map<String, Value>,
) -> AppResult<Value> {
    schema::ensure_table(table)?;
    let id = data
        .get("id")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(new_uuid_v7);
    data.insert("id".into(), Value::String(id));
    let now = now_ms();
    data.entry(String::from("created_at"))
        .or_insert(Value::from(now));
    data.insert("updated_at".into(), Value::from(now));

    ensure_known_columns(pool, table, &data).await?;

    let cols: Vec<String> = data.keys().cloned().collect();
    let placeholders: Vec<String> = cols.iter().map(|_| "?".into()).collect();
    let sql = format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        cols.join(","),
        placeholders.join(",")
    );
    let mut query = sqlx::query(&sql);
    for c in &cols {
        let value = data.get(c).ok_or_else(|| {
            AppError::new(VALIDATION_MISSING_FIELD, "Payload missing value for column")
                .with_context("column", c.clone())
        })?;
        query = bind_value(query, value);
    }
    query.execute(pool).await.map_err(AppError::from)?;
    Ok(Value::Object(data))
}

/// Applies a partial update. `id` and `created_at` never move; `updated_at`
/// always does.
pub async fn update_row(
    pool: &SqlitePool,
    table: &str,
    id: &str,
    mut data: Map<String, Value>,
) -> AppResult<()> {
    schema::ensure_table(table)?;
    data.remove("id");
    data.remove("created_at");
    data.insert("updated_at".into(), Value::from(now_ms()));

    ensure_known_columns(pool, table, &data).await?;

    let cols: Vec<String> = data.keys().cloned().collect();
    let set_clause: Vec<String> = cols.iter().map(|c| format!("{c} = ?")).collect();
    let sql = format!("UPDATE {table} SET {} WHERE id = ?", set_clause.join(","));
    let mut query = sqlx::query(&sql);
    for c in &cols {
        let value = data.get(c).ok_or_else(|| {
            AppError::new(VALIDATION_MISSING_FIELD, "Payload missing value for column")
                .with_context("column", c.clone())
        })?;
        query = bind_value(query, value);
    }
    let res = query.bind(id).execute(pool).await.map_err(AppError::from)?;
    if res.rows_affected() == 0 {
        return Err(AppError::new(REPO_ID_NOT_FOUND, "Record not found")
            .with_context("table", table.to_string())
            .with_context("id", id.to_string()));
    }
    Ok(())
}

pub async fn delete_row(pool: &SqlitePool, table: &str, id: &str) -> AppResult<()> {
    schema::ensure_table(table)?;
    let sql = format!("DELETE FROM {table} WHERE id = ?");
    let res = sqlx::query(&sql)
        .bind(id)
        .execute(pool)
        .await
        .map_err(AppError::from)?;
    if res.rows_affected() == 0 {
        return Err(AppError::new(REPO_ID_NOT_FOUND, "Record not found")
            .with_context("table", table.to_string())
            .with_context("id", id.to_string()));
    }
    Ok(())
}
