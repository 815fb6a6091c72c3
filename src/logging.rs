/// Installs the JSON tracing subscriber plus the `log` bridge. Filtering
/// honours `RENTDESK_LOG`; repeat calls are no-ops.
pub fn init() {
    let _ = tracing_log::LogTracer::init();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RENTDESK_LOG").unwrap_or_else(|_| "rentdesk=info,sqlx=warn".into()),
        )
        .json()
        .with_target(true)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .try_init();
}
