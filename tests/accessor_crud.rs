use anyhow::Result;
use serde_json::{json, Map, Value};

use rentdesk::accessors;
use rentdesk::model::{Property, PropertyKind, User};
use rentdesk::IntegrityRules;

#[path = "util.rs"]
mod util;

fn payload(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("object payload")
}

#[tokio::test]
async fn create_folds_camel_case_keys_to_columns() -> Result<()> {
    let pool = util::memory_pool().await?;
    let rules = IntegrityRules::default();

    let created = accessors::properties_create(
        &pool,
        &rules,
        payload(json!({
            "name": "Harbour View",
            "location": "Dock Rd",
            "kind": "apartment",
            "price": 30_000_000,
            "ownerName": "Alice Owner",
            "ownerPhone": "0700000003"
        })),
    )
    .await?;

    assert_eq!(created.get("owner_name"), Some(&json!("Alice Owner")));
    assert!(created.get("ownerName").is_none());
    let id = created
        .get("id")
        .and_then(Value::as_str)
        .expect("generated id")
        .to_string();
    assert!(!id.is_empty());

    let stored = accessors::properties_get(&pool, &id)
        .await?
        .expect("row present");
    assert_eq!(stored.get("owner_name"), Some(&json!("Alice Owner")));
    assert_eq!(stored.get("owner_phone"), Some(&json!("0700000003")));
    assert_eq!(stored.get("price"), Some(&json!(30_000_000)));
    Ok(())
}

#[tokio::test]
async fn colliding_key_spellings_are_rejected() -> Result<()> {
    let pool = util::memory_pool().await?;
    let rules = IntegrityRules::default();

    let err = accessors::properties_create(
        &pool,
        &rules,
        payload(json!({
            "name": "Clash Court",
            "location": "Dock Rd",
            "kind": "apartment",
            "owner_name": "A",
            "ownerName": "B"
        })),
    )
    .await
    .expect_err("two spellings of one column must fail");
    assert_eq!(err.code(), "VALIDATION/DUPLICATE_FIELD");
    Ok(())
}

#[tokio::test]
async fn unknown_column_is_rejected() -> Result<()> {
    let pool = util::memory_pool().await?;
    let rules = IntegrityRules::default();

    let err = accessors::properties_create(
        &pool,
        &rules,
        payload(json!({
            "name": "Garden Flat",
            "location": "Dock Rd",
            "kind": "apartment",
            "garden": true
        })),
    )
    .await
    .expect_err("unknown column must fail");
    assert_eq!(err.code(), "VALIDATION/UNKNOWN_COLUMN");
    assert_eq!(err.context().get("column").map(String::as_str), Some("garden"));
    Ok(())
}

#[tokio::test]
async fn unknown_table_is_rejected() -> Result<()> {
    let pool = util::memory_pool().await?;
    let rules = IntegrityRules::default();

    let err = accessors::create_record(&pool, "invoices", &rules, Map::new())
        .await
        .expect_err("table outside the registry must fail");
    assert_eq!(err.code(), "REPO/INVALID_TABLE");
    assert_eq!(err.context().get("table").map(String::as_str), Some("invoices"));
    Ok(())
}

#[tokio::test]
async fn missing_required_column_surfaces_sqlite_code() -> Result<()> {
    let pool = util::memory_pool().await?;
    let rules = IntegrityRules::default();

    // `kind` is NOT NULL with no default; the constraint speaks for itself.
    let err = accessors::properties_create(
        &pool,
        &rules,
        payload(json!({ "name": "No Kind", "location": "Dock Rd" })),
    )
    .await
    .expect_err("missing NOT NULL column must fail");
    assert_eq!(err.code(), "Sqlite/1299");
    Ok(())
}

#[tokio::test]
async fn list_honours_order_limit_and_offset() -> Result<()> {
    let pool = util::memory_pool().await?;
    let rules = IntegrityRules::default();

    let mut ids = Vec::new();
    for name in ["Anchor", "Beacon", "Compass"] {
        let created = accessors::properties_create(
            &pool,
            &rules,
            payload(json!({ "name": name, "location": "Dock Rd", "kind": "house" })),
        )
        .await?;
        ids.push(created.get("id").and_then(Value::as_str).map(String::from).expect("id"));
    }

    let page = accessors::list_records(&pool, "properties", Some("name DESC"), Some(2), None).await?;
    let names: Vec<_> = page
        .iter()
        .filter_map(|row| row.get("name").and_then(Value::as_str))
        .collect();
    assert_eq!(names, vec!["Compass", "Beacon"]);

    let rest = accessors::list_records(&pool, "properties", Some("name DESC"), None, Some(2)).await?;
    let names: Vec<_> = rest
        .iter()
        .filter_map(|row| row.get("name").and_then(Value::as_str))
        .collect();
    assert_eq!(names, vec!["Anchor"]);

    // Default order is by id, and generated ids are time-ordered, so an
    // unordered list reads back in insertion order.
    let all = accessors::properties_list(&pool).await?;
    let listed: Vec<_> = all
        .iter()
        .filter_map(|row| row.get("id").and_then(Value::as_str).map(String::from))
        .collect();
    assert_eq!(listed, ids);
    Ok(())
}

#[tokio::test]
async fn order_by_injection_is_rejected() -> Result<()> {
    let pool = util::memory_pool().await?;

    let err = accessors::list_records(&pool, "properties", Some("name; DROP TABLE users"), None, None)
        .await
        .expect_err("injection-shaped order_by must fail");
    assert_eq!(err.code(), "REPO/INVALID_ORDER_BY");

    assert_eq!(util::count_rows(&pool, "users").await?, 0);
    Ok(())
}

#[tokio::test]
async fn update_persists_fields_and_guards_immutables() -> Result<()> {
    let pool = util::memory_pool().await?;
    let rules = IntegrityRules::default();

    let created = accessors::properties_create(
        &pool,
        &rules,
        payload(json!({ "name": "Mutable", "location": "Dock Rd", "kind": "apartment", "price": 100 })),
    )
    .await?;
    let id = created.get("id").and_then(Value::as_str).expect("id").to_string();
    let created_at = created
        .get("created_at")
        .and_then(Value::as_i64)
        .expect("created_at");

    accessors::properties_update(
        &pool,
        &rules,
        &id,
        payload(json!({ "id": "hijack", "created_at": 0, "price": 250, "status": "rented" })),
    )
    .await?;

    let stored = accessors::properties_get(&pool, &id)
        .await?
        .expect("row kept its id");
    assert_eq!(stored.get("price"), Some(&json!(250)));
    assert_eq!(stored.get("status"), Some(&json!("rented")));
    assert_eq!(stored.get("created_at").and_then(Value::as_i64), Some(created_at));
    let updated_at = stored
        .get("updated_at")
        .and_then(Value::as_i64)
        .expect("updated_at");
    assert!(updated_at >= created_at);

    assert!(accessors::properties_get(&pool, "hijack").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn missing_rows_report_not_found() -> Result<()> {
    let pool = util::memory_pool().await?;
    let rules = IntegrityRules::default();

    let err = accessors::properties_update(&pool, &rules, "ghost", payload(json!({ "price": 5 })))
        .await
        .expect_err("updating a missing row must fail");
    assert_eq!(err.code(), "REPO/ID_NOT_FOUND");
    assert_eq!(err.context().get("id").map(String::as_str), Some("ghost"));

    let err = accessors::properties_delete(&pool, "ghost")
        .await
        .expect_err("deleting a missing row must fail");
    assert_eq!(err.code(), "REPO/ID_NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn delete_removes_the_row() -> Result<()> {
    let pool = util::memory_pool().await?;
    util::seed_property(&pool, "p-gone", "Ephemeral").await?;

    rentdesk::accessors::properties_delete(&pool, "p-gone").await?;
    assert!(accessors::properties_get(&pool, "p-gone").await?.is_none());
    assert_eq!(util::count_rows(&pool, "properties").await?, 0);
    Ok(())
}

#[tokio::test]
async fn duplicate_email_surfaces_unique_violation() -> Result<()> {
    let pool = util::memory_pool().await?;
    let rules = IntegrityRules::default();

    accessors::users_create(
        &pool,
        &rules,
        payload(json!({
            "name": "Asha",
            "email": "Asha@Example.com",
            "password_hash": "x"
        })),
    )
    .await?;

    // The email index collates NOCASE, so a differently-cased twin still collides.
    let err = accessors::users_create(
        &pool,
        &rules,
        payload(json!({
            "name": "Asha Again",
            "email": "asha@example.com",
            "password_hash": "x"
        })),
    )
    .await
    .expect_err("duplicate email must fail");
    assert_eq!(err.code(), "Sqlite/2067");
    assert!(err.message().contains("UNIQUE constraint failed"));
    Ok(())
}

#[tokio::test]
async fn typed_reads_decode_into_models() -> Result<()> {
    let pool = util::memory_pool().await?;
    let rules = IntegrityRules::default();

    let created = accessors::properties_create(
        &pool,
        &rules,
        payload(json!({
            "name": "Typed Court",
            "location": "Dock Rd",
            "kind": "apartment",
            "images": "[\"front.jpg\"]"
        })),
    )
    .await?;
    let id = created.get("id").and_then(Value::as_str).expect("id").to_string();

    let property: Property = accessors::get_as(&pool, "properties", &id)
        .await?
        .expect("typed property");
    assert_eq!(property.kind, PropertyKind::Apartment);
    assert_eq!(property.images, vec!["front.jpg"]);

    util::seed_user(&pool, "u-typed", "typed@example.com", "admin").await?;
    let users: Vec<User> = accessors::list_as(&pool, "users").await?;
    assert_eq!(users.len(), 1);
    assert!(!users[0].blocked);
    Ok(())
}
