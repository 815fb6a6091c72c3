use paste::paste;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use sqlx::SqlitePool;

use crate::error::{AppError, AppResult};
use crate::model::{REPO_APPEND_ONLY, REPO_PROTECTED_TABLE};
use crate::repo::{self, row_to_value};
use crate::rules::IntegrityRules;
use crate::schema;

async fn list(
    pool: &SqlitePool,
    table: &str,
    order_by: Option<&str>,
    limit: Option<i64>,
    offset: Option<i64>,
) -> AppResult<Vec<Value>> {
    let rows = repo::list_rows(pool, table, order_by, limit, offset).await?;
    Ok(rows.into_iter().map(row_to_value).collect())
}

async fn get(pool: &SqlitePool, table: &str, id: &str) -> AppResult<Option<Value>> {
    let row = repo::get_row(pool, table, id).await?;
    Ok(row.map(row_to_value))
}

async fn create(
    pool: &SqlitePool,
    table: &str,
    rules: &IntegrityRules,
    data: Map<String, Value>,
) -> AppResult<Value> {
    let spec = schema::ensure_table(table)?;
    let data = schema::canonicalize_payload(data)?;
    rules.check_amounts(spec, &data)?;
    if table == "leases" {
        rules.check_lease_dates(
            data.get("start_date").and_then(Value::as_i64),
            data.get("end_date").and_then(Value::as_i64),
        )?;
    }
    repo::insert_row(pool, table, data).await
}

async fn update(
    pool: &SqlitePool,
    table: &str,
    rules: &IntegrityRules,
    id: &str,
    data: Map<String, Value>,
) -> AppResult<()> {
    let spec = schema::ensure_table(table)?;
    if spec.append_only {
        return Err(
            AppError::new(REPO_APPEND_ONLY, "Rows in this table are never rewritten")
                .with_context("table", table.to_string()),
        );
    }
    let data = schema::canonicalize_payload(data)?;
    rules.check_amounts(spec, &data)?;
    if table == "leases"
        && rules.ordered_lease_dates
        && (data.contains_key("start_date") || data.contains_key("end_date"))
    {
        // A one-sided patch is checked against the stored other side.
        if let Some(current) = get(pool, table, id).await? {
            let start = data
                .get("start_date")
                .and_then(Value::as_i64)
                .or_else(|| current.get("start_date").and_then(Value::as_i64));
            let end = data
                .get("end_date")
                .and_then(Value::as_i64)
                .or_else(|| current.get("end_date").and_then(Value::as_i64));
            rules.check_lease_dates(start, end)?;
        }
    }
    repo::update_row(pool, table, id, data).await
}

async fn delete(pool: &SqlitePool, table: &str, id: &str) -> AppResult<()> {
    let spec = schema::ensure_table(table)?;
    if spec.append_only {
        return Err(
            AppError::new(REPO_APPEND_ONLY, "Rows in this table are never rewritten")
                .with_context("table", table.to_string()),
        );
    }
    if spec.protected {
        return Err(AppError::new(
            REPO_PROTECTED_TABLE,
            "Rows in this table are managed by the application",
        )
        .with_context("table", table.to_string()));
    }
    repo::delete_row(pool, table, id).await
}

pub async fn list_records(
    pool: &SqlitePool,
    table: &str,
    order_by: Option<&str>,
    limit: Option<i64>,
    offset: Option<i64>,
) -> AppResult<Vec<Value>> {
    list(pool, table, order_by, limit, offset)
        .await
        .map_err(|err| {
            err.with_context("operation", "list")
                .with_context("table", table.to_string())
        })
}

pub async fn get_record(pool: &SqlitePool, table: &str, id: &str) -> AppResult<Option<Value>> {
    get(pool, table, id).await.map_err(|err| {
        err.with_context("operation", "get")
            .with_context("table", table.to_string())
            .with_context("id", id.to_string())
    })
}

pub async fn create_record(
    pool: &SqlitePool,
    table: &str,
    rules: &IntegrityRules,
    data: Map<String, Value>,
) -> AppResult<Value> {
    create(pool, table, rules, data).await.map_err(|err| {
        err.with_context("operation", "create")
            .with_context("table", table.to_string())
    })
}

pub async fn update_record(
    pool: &SqlitePool,
    table: &str,
    rules: &IntegrityRules,
    id: &str,
    data: Map<String, Value>,
) -> AppResult<()> {
    update(pool, table, rules, id, data).await.map_err(|err| {
        err.with_context("operation", "update")
            .with_context("table", table.to_string())
            .with_context("id", id.to_string())
    })
}

pub async fn delete_record(pool: &SqlitePool, table: &str, id: &str) -> AppResult<()> {
    delete(pool, table, id).await.map_err(|err| {
        err.with_context("operation", "delete")
            .with_context("table", table.to_string())
            .with_context("id", id.to_string())
    })
}

/// Typed read: list a table straight into domain structs.
pub async fn list_as<T: DeserializeOwned>(pool: &SqlitePool, table: &str) -> AppResult<Vec<T>> {
    let values = list_records(pool, table, None, None, None).await?;
    values
        .into_iter()
        .map(|value| {
            serde_json::from_value(value)
                .map_err(|err| AppError::from(err).with_context("table", table.to_string()))
        })
        .collect()
}

/// Typed read of a single row.
pub async fn get_as<T: DeserializeOwned>(
    pool: &SqlitePool,
    table: &str,
    id: &str,
) -> AppResult<Option<T>> {
    match get_record(pool, table, id).await? {
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|err| {
                AppError::from(err)
                    .with_context("table", table.to_string())
                    .with_context("id", id.to_string())
            }),
        None => Ok(None),
    }
}

macro_rules! gen_entity_accessors {
    ( $( $table:ident ),+ $(,)? ) => {
        paste! {
            $(
                pub async fn [<$table _list>](pool: &SqlitePool) -> AppResult<Vec<Value>> {
                    list_records(pool, stringify!($table), None, None, None).await
                }

                pub async fn [<$table _get>](
                    pool: &SqlitePool,
                    id: &str,
                ) -> AppResult<Option<Value>> {
                    get_record(pool, stringify!($table), id).await
                }

                pub async fn [<$table _create>](
                    pool: &SqlitePool,
                    rules: &IntegrityRules,
                    data: Map<String, Value>,
                ) -> AppResult<Value> {
                    create_record(pool, stringify!($table), rules, data).await
                }

                pub async fn [<$table _update>](
                    pool: &SqlitePool,
                    rules: &IntegrityRules,
                    id: &str,
                    data: Map<String, Value>,
                ) -> AppResult<()> {
                    update_record(pool, stringify!($table), rules, id, data).await
                }

                pub async fn [<$table _delete>](pool: &SqlitePool, id: &str) -> AppResult<()> {
                    delete_record(pool, stringify!($table), id).await
                }
            )+
        }
    };
}

gen_entity_accessors!(
    users,
    properties,
    units,
    tenants,
    guarantors,
    leases,
    payments,
    maintenance,
    requests,
    expenses,
);
