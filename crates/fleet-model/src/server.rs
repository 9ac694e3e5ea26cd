use chrono::{DateTime, Utc};
use mac_address::MacAddress;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::net::IpAddr;

use crate::ids::{AssetId, ClusterId, ServerId};
use crate::status::{ServerStatus, TargetStatus};

/// Maximum length (in bytes) of [`Server::message`], enforced on every
/// write per §4.4's `error()` contract and the invariant in §3.
pub const MESSAGE_MAX_BYTES: usize = 253;

/// The logical role bound to an [`crate::asset::Asset`], §3.
///
/// Invariants enforced by `fleet-db`/`fleet-statemachine`, not representable
/// purely in the type:
/// (a) `lock_id` non-empty iff a task claims this server;
/// (b) `index(status) <= index(target_status)`, checked on every transition;
/// (c) `version` strictly increases on every persisted mutation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Server {
    pub id: ServerId,
    pub name: String,
    pub status: ServerStatus,
    pub target_status: TargetStatus,
    pub pxe_mac: Option<MacAddress>,
    pub pxe_ip: Option<IpAddr>,
    pub role: String,
    pub fqdn: Option<String>,
    pub server_number: Option<i32>,
    pub rack_unit: Option<i32>,
    pub hdd_type: Option<String>,
    pub os_args: Option<String>,
    pub gateway_network: Option<ipnetwork::IpNetwork>,
    /// Empty string means unlocked, per §3.
    pub lock_id: String,
    pub message: String,
    #[sqlx(json)]
    pub meta: ServerMeta,
    pub version: i64,
    pub cluster_id: Option<ClusterId>,
    pub sku_id: Option<String>,
    pub asset_id: AssetId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted: i32,
}

/// Free-form per-server metadata, §3. `ironicated` marks a server under
/// external control, checked by `rack_trigger`'s guard (c) in §4.4.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerMeta {
    #[serde(default)]
    pub ironicated: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Server {
    pub fn is_locked(&self) -> bool {
        !self.lock_id.is_empty()
    }

    pub fn status_index(&self) -> u8 {
        self.status as u8
    }

    pub fn target_index(&self) -> u8 {
        self.target_status.as_server_status() as u8
    }

    /// `index(status) <= index(target_status)`, §3/§8.
    pub fn satisfies_status_invariant(&self) -> bool {
        self.status_index() <= self.target_index()
    }

    /// Truncates to [`MESSAGE_MAX_BYTES`] on a UTF-8 boundary, per §4.4's
    /// `error()` contract.
    pub fn set_message(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.message = truncate_utf8(&message, MESSAGE_MAX_BYTES);
    }
}

fn truncate_utf8(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_utf8_respects_char_boundaries() {
        let s = "a".repeat(252) + "é"; // é is 2 bytes, would split at byte 253
        let truncated = truncate_utf8(&s, MESSAGE_MAX_BYTES);
        assert!(truncated.len() <= MESSAGE_MAX_BYTES);
        assert!(truncated.is_char_boundary(truncated.len()));
    }

    #[test]
    fn truncate_utf8_is_noop_under_limit() {
        assert_eq!(truncate_utf8("short", MESSAGE_MAX_BYTES), "short");
    }
}
