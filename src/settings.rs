use futures::FutureExt;
use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::accessors;
use crate::db::run_in_tx;
use crate::error::{AppError, AppResult};
use crate::id::new_uuid_v7;
use crate::model::{
    Settings, DEFAULT_COMPANY_NAME, DEFAULT_CURRENCY, DEFAULT_PAYMENT_METHODS, MODEL_DECODE_ERROR,
};
use crate::rules::IntegrityRules;
use crate::time::now_ms;

fn deserialize_settings(row: &SqliteRow) -> AppResult<Settings> {
    let methods_raw: String = row.get("payment_methods");
    let payment_methods: Vec<String> = serde_json::from_str(&methods_raw).map_err(|err| {
        AppError::new(
            MODEL_DECODE_ERROR,
            "Settings payment_methods is not a JSON list",
        )
        .with_context("value", methods_raw.clone())
        .with_context("error", err.to_string())
    })?;

    Ok(Settings {
        id: row.get("id"),
        company_name: row.get("company_name"),
        logo: row.try_get("logo").ok().flatten(),
        currency: row.get("currency"),
        payment_methods,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// The first (and expected only) settings row, if any.
pub async fn get_settings(pool: &SqlitePool) -> AppResult<Option<Settings>> {
    let row = sqlx::query("SELECT * FROM settings ORDER BY created_at, id LIMIT 1")
        .fetch_optional(pool)
        .await
        .map_err(|err| AppError::from(err).with_context("operation", "settings_get"))?;
    match row {
        Some(row) => Ok(Some(deserialize_settings(&row)?)),
        None => Ok(None),
    }
}

/// Returns the settings row, seeding the shipped defaults on first use. The
/// existence check repeats inside the transaction so two concurrent callers
/// cannot both seed.
pub async fn ensure_settings(pool: &SqlitePool) -> AppResult<Settings> {
    if let Some(existing) = get_settings(pool).await? {
        return Ok(existing);
    }

    let id = new_uuid_v7();
    let now = now_ms();
    let methods = serde_json::to_string(DEFAULT_PAYMENT_METHODS).map_err(AppError::from)?;

    run_in_tx(pool, move |conn| {
        async move {
            let existing = sqlx::query("SELECT * FROM settings ORDER BY created_at, id LIMIT 1")
                .fetch_optional(&mut *conn)
                .await?;
            if let Some(row) = existing {
                return deserialize_settings(&row);
            }

            sqlx::query(
                "INSERT INTO settings (id, company_name, currency, payment_methods, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(&id)
            .bind(DEFAULT_COMPANY_NAME)
            .bind(DEFAULT_CURRENCY)
            .bind(&methods)
            .bind(now)
            .bind(now)
            .execute(&mut *conn)
            .await?;

            let row = sqlx::query("SELECT * FROM settings WHERE id = ?")
                .bind(&id)
                .fetch_one(&mut *conn)
                .await?;
            deserialize_settings(&row)
        }
        .boxed()
    })
    .await
    .map_err(|err: AppError| err.with_context("operation", "settings_ensure"))
}

/// Edits the singleton row through the generic update path, bootstrapping it
/// first when the database has none.
pub async fn update_settings(
    pool: &SqlitePool,
    rules: &IntegrityRules,
    data: Map<String, Value>,
) -> AppResult<Settings> {
    let current = ensure_settings(pool).await?;
    accessors::update_record(pool, "settings", rules, &current.id, data).await?;
    match get_settings(pool).await? {
        Some(updated) => Ok(updated),
        None => Ok(current),
    }
}
