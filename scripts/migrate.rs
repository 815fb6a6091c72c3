use std::path::Path;
use std::process::ExitCode;

/// Migration entrypoint. No flags: the database location comes from
/// `DATABASE_URL` (or `RENTDESK_DB`), falling back to the per-user data
/// directory. Exits 0 when the schema is current, 1 on any failure.
#[tokio::main]
async fn main() -> ExitCode {
    rentdesk::logging::init();

    let db_path =
        rentdesk::db::database_path_from_env().unwrap_or_else(rentdesk::db::default_db_path);

    match run(&db_path).await {
        Ok(fingerprint) => {
            println!("{fingerprint}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(target: "rentdesk", event = "migrate_failed", error = %format!("{err:#}"));
            eprintln!("migrate: {err:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(db_path: &Path) -> anyhow::Result<String> {
    let pool = rentdesk::db::open_pool(db_path, true).await?;
    rentdesk::migrate::apply_migrations(&pool).await?;
    let fingerprint = rentdesk::db::schema_fingerprint(&pool).await?;
    tracing::info!(target: "rentdesk", event = "migrate_done", schema = %fingerprint);
    pool.close().await;
    Ok(fingerprint)
}
