use uuid::Uuid;

/// Row keys are time-ordered UUIDs so default `ORDER BY id` roughly
/// follows insertion order.
pub fn new_uuid_v7() -> String {
    Uuid::now_v7().to_string()
}
