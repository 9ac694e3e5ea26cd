use fleet_model::FleetResult;
use fleet_model::change_log::ChangeLogEntry;
use fleet_model::ids::ChangeLogId;
use serde::Serialize;
use sqlx::PgConnection;

/// Records a before/after diff for an auditable mutation, §4.1. Callers opt
/// in explicitly (discovery upserts and operator-triggered changes do;
/// routine stage-check status refreshes don't) since every write going
/// through the change log would make it noise rather than an audit trail.
pub async fn record<T: Serialize>(
    conn: &mut PgConnection,
    object_type: &str,
    object_id: &str,
    before: Option<&T>,
    after: Option<&T>,
) -> FleetResult<ChangeLogEntry> {
    let before = before.map(serde_json::to_value).transpose().map_err(|e| {
        fleet_model::FleetError::InvalidData(format!("change log before-value: {e}"))
    })?;
    let after = after.map(serde_json::to_value).transpose().map_err(|e| {
        fleet_model::FleetError::InvalidData(format!("change log after-value: {e}"))
    })?;

    sqlx::query_as::<_, ChangeLogEntry>(
        r#"
        INSERT INTO change_log (id, object_type, object_id, before, after, created_at)
        VALUES ($1, $2, $3, $4, $5, now())
        RETURNING id, object_type, object_id, before, after, created_at
        "#,
    )
    .bind(ChangeLogId::new())
    .bind(object_type)
    .bind(object_id)
    .bind(before)
    .bind(after)
    .fetch_one(conn)
    .await
    .map_err(Into::into)
}
