use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::ids::ChangeLogId;

/// Append-only record of (type, object_id, old, new), §3. Written by
/// `fleet-db`'s change-log helper when a caller opts into auditing a
/// mutation (§4.1).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChangeLogEntry {
    pub id: ChangeLogId,
    pub object_type: String,
    pub object_id: String,
    #[sqlx(json)]
    pub before: Option<serde_json::Value>,
    #[sqlx(json)]
    pub after: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}
