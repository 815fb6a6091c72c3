#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

/// In-memory database with foreign keys on and every migration applied.
pub async fn memory_pool() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    sqlx::query("PRAGMA foreign_keys=ON;")
        .execute(&pool)
        .await?;
    rentdesk::migrate::apply_migrations(&pool).await?;
    Ok(pool)
}

pub async fn seed_user(pool: &SqlitePool, id: &str, email: &str, role: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, role, blocked, created_at, updated_at)\n         VALUES (?1, ?2, ?3, 'x', ?4, 0, 0, 0)",
    )
    .bind(id)
    .bind(format!("User {id}"))
    .bind(email)
    .bind(role)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn seed_property(pool: &SqlitePool, id: &str, name: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO properties (id, name, location, kind, price, bedrooms, bathrooms, status, created_at, updated_at)\n         VALUES (?1, ?2, 'Dock Rd', 'apartment', 30000000, 2, 1, 'available', 0, 0)",
    )
    .bind(id)
    .bind(name)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn seed_unit(pool: &SqlitePool, id: &str, property_id: &str, unit_number: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO units (id, property_id, unit_number, rent_amount, status, created_at, updated_at)\n         VALUES (?1, ?2, ?3, 95000, 'vacant', 0, 0)",
    )
    .bind(id)
    .bind(property_id)
    .bind(unit_number)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn seed_tenant(pool: &SqlitePool, id: &str, name: &str, email: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO tenants (id, name, email, phone, created_at, updated_at)\n         VALUES (?1, ?2, ?3, '0700000001', 0, 0)",
    )
    .bind(id)
    .bind(name)
    .bind(email)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn seed_guarantor(pool: &SqlitePool, id: &str, name: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO guarantors (id, name, phone, document_photos, status, created_at, updated_at)\n         VALUES (?1, ?2, '0700000002', '[]', 'active', 0, 0)",
    )
    .bind(id)
    .bind(name)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn seed_lease(
    pool: &SqlitePool,
    id: &str,
    unit_id: &str,
    tenant_id: &str,
    guarantor_id: Option<&str>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO leases (id, unit_id, tenant_id, guarantor_id, start_date, end_date, rent_amount, deposit, rent_cycle, auto_invoice, status, created_at, updated_at)\n         VALUES (?1, ?2, ?3, ?4, 100, 200, 95000, 190000, 'monthly', 0, 'active', 0, 0)",
    )
    .bind(id)
    .bind(unit_id)
    .bind(tenant_id)
    .bind(guarantor_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn seed_payment(pool: &SqlitePool, id: &str, lease_id: &str, amount: i64) -> Result<()> {
    sqlx::query(
        "INSERT INTO payments (id, lease_id, amount, payment_date, method, status, created_at, updated_at)\n         VALUES (?1, ?2, ?3, 1000, 'cash', 'completed', 0, 0)",
    )
    .bind(id)
    .bind(lease_id)
    .bind(amount)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn count_rows(pool: &SqlitePool, table: &str) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {table}");
    let count: i64 = sqlx::query_scalar(&sql).fetch_one(pool).await?;
    Ok(count)
}
