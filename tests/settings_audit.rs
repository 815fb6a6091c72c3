use anyhow::Result;
use serde_json::{json, Map, Value};

use rentdesk::{accessors, audit, settings, IntegrityRules};

#[path = "util.rs"]
mod util;

fn payload(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("object payload")
}

#[tokio::test]
async fn ensure_settings_seeds_the_defaults_exactly_once() -> Result<()> {
    let pool = util::memory_pool().await?;

    assert!(settings::get_settings(&pool).await?.is_none());

    let seeded = settings::ensure_settings(&pool).await?;
    assert_eq!(seeded.company_name, "Rentdesk");
    assert_eq!(seeded.currency, "USD");
    assert_eq!(
        seeded.payment_methods,
        vec!["cash", "bank_transfer", "mobile_money"]
    );

    let again = settings::ensure_settings(&pool).await?;
    assert_eq!(again.id, seeded.id);
    assert_eq!(util::count_rows(&pool, "settings").await?, 1);
    Ok(())
}

#[tokio::test]
async fn update_settings_bootstraps_then_persists() -> Result<()> {
    let pool = util::memory_pool().await?;
    let rules = IntegrityRules::default();

    // Works on a database that has never had a settings row.
    let updated = settings::update_settings(
        &pool,
        &rules,
        payload(json!({
            "companyName": "Dockside Lettings",
            "currency": "KES",
            "payment_methods": ["cash", "cheque"]
        })),
    )
    .await?;
    assert_eq!(updated.company_name, "Dockside Lettings");
    assert_eq!(updated.currency, "KES");
    assert_eq!(updated.payment_methods, vec!["cash", "cheque"]);
    assert_eq!(util::count_rows(&pool, "settings").await?, 1);

    let err = settings::update_settings(&pool, &rules, payload(json!({ "tax_rate": 16 })))
        .await
        .expect_err("unknown settings column must fail");
    assert_eq!(err.code(), "VALIDATION/UNKNOWN_COLUMN");
    Ok(())
}

#[tokio::test]
async fn settings_row_cannot_be_deleted() -> Result<()> {
    let pool = util::memory_pool().await?;
    let seeded = settings::ensure_settings(&pool).await?;

    let err = accessors::delete_record(&pool, "settings", &seeded.id)
        .await
        .expect_err("settings delete must be refused");
    assert_eq!(err.code(), "REPO/PROTECTED_TABLE");
    assert_eq!(util::count_rows(&pool, "settings").await?, 1);
    Ok(())
}

#[tokio::test]
async fn audit_trail_appends_and_lists_newest_first() -> Result<()> {
    let pool = util::memory_pool().await?;
    util::seed_user(&pool, "user-1", "user1@example.com", "admin").await?;
    util::seed_user(&pool, "user-2", "user2@example.com", "manager").await?;

    // Spaced so the three entries land on distinct timestamps.
    audit::record_action(&pool, "user-1", "login", None).await?;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    audit::record_action(&pool, "user-1", "lease_create", Some("lease-1")).await?;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    audit::record_action(&pool, "user-2", "login", None).await?;

    let recent = audit::recent_actions(&pool, 10).await?;
    assert_eq!(recent.len(), 3);
    let actions: Vec<_> = recent.iter().map(|log| log.action.as_str()).collect();
    assert_eq!(actions, vec!["login", "lease_create", "login"]);
    assert_eq!(recent[0].user_id, "user-2");

    let mine = audit::actions_for_user(&pool, "user-1", 10).await?;
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().all(|log| log.user_id == "user-1"));
    assert_eq!(mine[0].action, "lease_create");
    assert_eq!(mine[0].details.as_deref(), Some("lease-1"));
    Ok(())
}

#[tokio::test]
async fn audit_rejects_unknown_users() -> Result<()> {
    let pool = util::memory_pool().await?;

    let err = audit::record_action(&pool, "nobody", "login", None)
        .await
        .expect_err("audit entry for an unknown user must fail");
    assert_eq!(err.code(), "Sqlite/787");
    assert_eq!(util::count_rows(&pool, "audit_logs").await?, 0);
    Ok(())
}

#[tokio::test]
async fn audit_rows_are_append_only() -> Result<()> {
    let pool = util::memory_pool().await?;
    let rules = IntegrityRules::default();
    util::seed_user(&pool, "user-1", "user1@example.com", "admin").await?;
    let entry = audit::record_action(&pool, "user-1", "login", None).await?;

    let err = accessors::update_record(
        &pool,
        "audit_logs",
        &rules,
        &entry.id,
        payload(json!({ "action": "rewritten" })),
    )
    .await
    .expect_err("audit update must be refused");
    assert_eq!(err.code(), "REPO/APPEND_ONLY");

    let err = accessors::delete_record(&pool, "audit_logs", &entry.id)
        .await
        .expect_err("audit delete must be refused");
    assert_eq!(err.code(), "REPO/APPEND_ONLY");

    let action: String = sqlx::query_scalar("SELECT action FROM audit_logs WHERE id = ?")
        .bind(&entry.id)
        .fetch_one(&pool)
        .await?;
    assert_eq!(action, "login");
    Ok(())
}
