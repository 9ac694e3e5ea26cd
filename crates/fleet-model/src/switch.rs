use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::ids::{AssetId, RackId, SwitchId};

/// A top-of-rack switch, §3. `name` is the hostname C7 parses into a
/// `(switch_index, rack_name)` pair to resolve server numbers — see
/// [`Switch::parse_index`].
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Switch {
    pub id: SwitchId,
    pub asset_id: AssetId,
    pub rack_id: RackId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Switch {
    /// Parses a `"<rack_name>-sw<index>"` hostname into `(rack_name,
    /// switch_index)`, the declarative replacement for string-evaluating
    /// `network_map.mgmt_port_map` (spec.md §9).
    pub fn parse_index(name: &str) -> Option<(&str, u8)> {
        let (rack_name, suffix) = name.rsplit_once("-sw")?;
        let index: u8 = suffix.parse().ok()?;
        Some((rack_name, index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rack_name_and_index() {
        assert_eq!(Switch::parse_index("rack07-sw1"), Some(("rack07", 1)));
    }

    #[test]
    fn rejects_hostname_without_suffix() {
        assert_eq!(Switch::parse_index("rack07"), None);
    }
}
