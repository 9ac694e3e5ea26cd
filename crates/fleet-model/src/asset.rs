use chrono::{DateTime, Utc};
use mac_address::MacAddress;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::net::IpAddr;

use crate::ids::{AssetId, RackId};
use crate::status::{AssetStatus, AssetType};

/// Physical identity, §3. Unique by serial. `protected = true` suppresses
/// further automated changes from the discovery engine (C3).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Asset {
    pub id: AssetId,
    pub serial: String,
    pub brand: String,
    pub model: String,
    pub ipmi_mac: MacAddress,
    pub ipmi_ip: Option<IpAddr>,
    pub asset_type: AssetType,
    pub status: AssetStatus,
    pub protected: bool,
    pub rack_id: Option<RackId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted: i32,
}

impl Asset {
    /// §4.3 step 8: reverts a protected asset's status to `New` and aborts
    /// the rest of discovery, rather than letting discovery mutate it.
    pub fn revert_protected_status(&mut self) {
        debug_assert!(self.protected);
        self.status = AssetStatus::New;
    }
}
