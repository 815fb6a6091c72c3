use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::error::{AppError, AppResult};
use crate::id::new_uuid_v7;
use crate::model::{
    EnumParseError, Lease, LeaseStatus, Payment, RentCycle, GENERIC_FAIL, GENERIC_FAIL_MESSAGE,
    MODEL_DECODE_ERROR,
};
use crate::rules::IntegrityRules;
use crate::schema;
use crate::settings;
use crate::time::now_ms;

/// Payload for opening a lease. Accepts the camelCase spellings older
/// clients send; everything is stored snake_case.
#[derive(Debug, Clone, Deserialize)]
pub struct NewLease {
    #[serde(alias = "unitId")]
    pub unit_id: String,
    #[serde(alias = "tenantId")]
    pub tenant_id: String,
    #[serde(default, alias = "guarantorId")]
    pub guarantor_id: Option<String>,
    #[serde(alias = "startDate")]
    pub start_date: i64,
    #[serde(alias = "endDate")]
    pub end_date: i64,
    #[serde(alias = "rentAmount")]
    pub rent_amount: i64,
    #[serde(default)]
    pub deposit: i64,
    #[serde(default = "default_rent_cycle", alias = "rentCycle")]
    pub rent_cycle: RentCycle,
    #[serde(default, alias = "autoInvoice")]
    pub auto_invoice: bool,
    #[serde(default, alias = "guarantorNote")]
    pub guarantor_note: Option<String>,
    #[serde(default, alias = "vehicleInfo")]
    pub vehicle_info: Option<String>,
    #[serde(default, alias = "weaponInfo")]
    pub weapon_info: Option<String>,
    #[serde(default, alias = "witnessInfo")]
    pub witness_info: Option<String>,
}

fn default_rent_cycle() -> RentCycle {
    RentCycle::Monthly
}

/// Everything the lease agreement document needs, flattened from one joined
/// read so the caller never stitches rows together.
#[derive(Debug, Clone, Serialize)]
pub struct LeaseBundle {
    pub lease: Lease,
    pub tenant_name: String,
    pub tenant_email: String,
    pub tenant_phone: Option<String>,
    pub unit_number: String,
    pub property_id: String,
    pub property_name: String,
    pub property_location: String,
    pub owner_name: Option<String>,
    pub owner_phone: Option<String>,
    pub guarantor_name: Option<String>,
    pub guarantor_phone: Option<String>,
}

/// One payment with the naming context a printable receipt carries.
#[derive(Debug, Clone, Serialize)]
pub struct ReceiptBundle {
    pub payment: Payment,
    pub tenant_name: String,
    pub unit_number: String,
    pub property_name: String,
    pub company_name: String,
    pub currency: String,
}

fn wrap_unexpected(err: AppError, operation: &'static str) -> AppError {
    AppError::new(GENERIC_FAIL, GENERIC_FAIL_MESSAGE)
        .with_context("operation", operation)
        .with_cause(err)
}

fn parse_slug<T>(raw: &str, field: &'static str) -> AppResult<T>
where
    T: std::str::FromStr<Err = EnumParseError>,
{
    raw.parse().map_err(|err: EnumParseError| {
        AppError::new(MODEL_DECODE_ERROR, format!("Invalid {field} value"))
            .with_context("field", field)
            .with_context("value", err.value().to_string())
    })
}

pub(crate) fn deserialize_lease(row: &SqliteRow) -> AppResult<Lease> {
    let rent_cycle_raw: String = row.get("rent_cycle");
    let status_raw: String = row.get("status");
    let auto_invoice: i64 = row.get("auto_invoice");

    Ok(Lease {
        id: row.get("id"),
        unit_id: row.get("unit_id"),
        tenant_id: row.get("tenant_id"),
        guarantor_id: row.try_get("guarantor_id").ok().flatten(),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        rent_amount: row.get("rent_amount"),
        deposit: row.get("deposit"),
        rent_cycle: parse_slug(&rent_cycle_raw, "rent_cycle")?,
        auto_invoice: auto_invoice != 0,
        guarantor_note: row.try_get("guarantor_note").ok().flatten(),
        vehicle_info: row.try_get("vehicle_info").ok().flatten(),
        weapon_info: row.try_get("weapon_info").ok().flatten(),
        witness_info: row.try_get("witness_info").ok().flatten(),
        status: parse_slug(&status_raw, "status")?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

pub(crate) fn deserialize_payment(row: &SqliteRow) -> AppResult<Payment> {
    let status_raw: String = row.get("status");

    Ok(Payment {
        id: row.get("id"),
        lease_id: row.get("lease_id"),
        amount: row.get("amount"),
        payment_date: row.get("payment_date"),
        method: row.get("method"),
        status: parse_slug(&status_raw, "status")?,
        reference_id: row.try_get("reference_id").ok().flatten(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// Opens a lease for a unit and tenant. The insert rides a transaction with
/// the read-back, so the returned record is exactly what landed on disk.
/// Foreign-key and CHECK violations surface with their SQLite codes intact.
pub async fn create_lease(
    pool: &SqlitePool,
    rules: &IntegrityRules,
    payload: NewLease,
) -> AppResult<Lease> {
    rules.check_lease_dates(Some(payload.start_date), Some(payload.end_date))?;
    let spec = schema::ensure_table("leases")?;
    let mut amounts = Map::new();
    amounts.insert("rent_amount".into(), Value::from(payload.rent_amount));
    amounts.insert("deposit".into(), Value::from(payload.deposit));
    rules.check_amounts(spec, &amounts)?;

    let id = new_uuid_v7();
    let now = now_ms();

    let mut tx = pool
        .begin()
        .await
        .map_err(|err| wrap_unexpected(err.into(), "lease_create_begin"))?;

    sqlx::query(
        "INSERT INTO leases (id, unit_id, tenant_id, guarantor_id, start_date, end_date, \
         rent_amount, deposit, rent_cycle, auto_invoice, guarantor_note, vehicle_info, \
         weapon_info, witness_info, status, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
    )
    .bind(&id)
    .bind(&payload.unit_id)
    .bind(&payload.tenant_id)
    .bind(&payload.guarantor_id)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(payload.rent_amount)
    .bind(payload.deposit)
    .bind(payload.rent_cycle.as_str())
    .bind(payload.auto_invoice as i64)
    .bind(&payload.guarantor_note)
    .bind(&payload.vehicle_info)
    .bind(&payload.weapon_info)
    .bind(&payload.witness_info)
    .bind(LeaseStatus::Active.as_str())
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .map_err(|err| AppError::from(err).with_context("operation", "lease_create"))?;

    let row = sqlx::query("SELECT * FROM leases WHERE id = ?")
        .bind(&id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|err| wrap_unexpected(err.into(), "lease_create_fetch"))?;

    tx.commit()
        .await
        .map_err(|err| wrap_unexpected(err.into(), "lease_create_commit"))?;

    deserialize_lease(&row)
}

/// Joined snapshot behind the lease agreement view. `None` when the lease id
/// is unknown.
pub async fn lease_bundle(pool: &SqlitePool, lease_id: &str) -> AppResult<Option<LeaseBundle>> {
    let row = sqlx::query(
        "SELECT l.*, \
                t.name AS tenant_name, t.email AS tenant_email, t.phone AS tenant_phone, \
                u.unit_number AS unit_number, u.property_id AS property_id, \
                p.name AS property_name, p.location AS property_location, \
                p.owner_name AS owner_name, p.owner_phone AS owner_phone, \
                g.name AS guarantor_name, g.phone AS guarantor_phone \
         FROM leases l \
         JOIN units u ON u.id = l.unit_id \
         JOIN tenants t ON t.id = l.tenant_id \
         JOIN properties p ON p.id = u.property_id \
         LEFT JOIN guarantors g ON g.id = l.guarantor_id \
         WHERE l.id = ?",
    )
    .bind(lease_id)
    .fetch_optional(pool)
    .await
    .map_err(|err| {
        AppError::from(err)
            .with_context("operation", "lease_bundle")
            .with_context("lease_id", lease_id.to_string())
    })?;

    let Some(row) = row else {
        return Ok(None);
    };

    let lease = deserialize_lease(&row)?;
    Ok(Some(LeaseBundle {
        lease,
        tenant_name: row.get("tenant_name"),
        tenant_email: row.get("tenant_email"),
        tenant_phone: row.try_get("tenant_phone").ok().flatten(),
        unit_number: row.get("unit_number"),
        property_id: row.get("property_id"),
        property_name: row.get("property_name"),
        property_location: row.get("property_location"),
        owner_name: row.try_get("owner_name").ok().flatten(),
        owner_phone: row.try_get("owner_phone").ok().flatten(),
        guarantor_name: row.try_get("guarantor_name").ok().flatten(),
        guarantor_phone: row.try_get("guarantor_phone").ok().flatten(),
    }))
}

/// Joined snapshot behind the printable receipt. Company details come from
/// the settings row, falling back to the shipped defaults when none exists.
pub async fn receipt_bundle(pool: &SqlitePool, payment_id: &str) -> AppResult<Option<ReceiptBundle>> {
    let row = sqlx::query(
        "SELECT pay.*, \
                t.name AS tenant_name, u.unit_number AS unit_number, p.name AS property_name \
         FROM payments pay \
         JOIN leases l ON l.id = pay.lease_id \
         JOIN units u ON u.id = l.unit_id \
         JOIN tenants t ON t.id = l.tenant_id \
         JOIN properties p ON p.id = u.property_id \
         WHERE pay.id = ?",
    )
    .bind(payment_id)
    .fetch_optional(pool)
    .await
    .map_err(|err| {
        AppError::from(err)
            .with_context("operation", "receipt_bundle")
            .with_context("payment_id", payment_id.to_string())
    })?;

    let Some(row) = row else {
        return Ok(None);
    };

    let payment = deserialize_payment(&row)?;
    let company = settings::get_settings(pool).await?;
    let (company_name, currency) = match company {
        Some(s) => (s.company_name, s.currency),
        None => (
            crate::model::DEFAULT_COMPANY_NAME.to_string(),
            crate::model::DEFAULT_CURRENCY.to_string(),
        ),
    };

    Ok(Some(ReceiptBundle {
        payment,
        tenant_name: row.get("tenant_name"),
        unit_number: row.get("unit_number"),
        property_name: row.get("property_name"),
        company_name,
        currency,
    }))
}
