use serde::{Deserialize, Serialize};
use sqlx::Type;
use strum::{Display, EnumString};

/// Server lifecycle status, §4.4.
///
/// Ordered by discriminant: `Unknown < Unmanaged < Validating <
/// ValidatedWithErrors < Validated < Provisioning < ProvisionedWithErrors <
/// Provisioned < Deploying < Deployed`. Comparisons elsewhere in the crate
/// (`index(status) <= index(target_status)`) rely on this derive order, not
/// on declaration order happening to match — do not reorder variants.
///
/// `Deploying`/`Deployed` exist per the schema but per the open question in
/// spec.md §9 are operator-set only: the state machine (`fleet-statemachine`)
/// never transitions a server into or out of them on its own.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString, Type,
)]
#[sqlx(type_name = "text", rename_all = "PascalCase")]
#[strum(serialize_all = "PascalCase")]
#[repr(u8)]
pub enum ServerStatus {
    Unknown = 0,
    Unmanaged = 1,
    Validating = 2,
    ValidatedWithErrors = 3,
    Validated = 4,
    Provisioning = 5,
    ProvisionedWithErrors = 6,
    Provisioned = 7,
    Deploying = 8,
    Deployed = 9,
}

impl ServerStatus {
    /// Whether this status is one of the `*WithErrors` terminal-for-this-cycle
    /// states, per §7's transient-vs-terminal distinction.
    pub fn has_errors(self) -> bool {
        matches!(
            self,
            ServerStatus::ValidatedWithErrors | ServerStatus::ProvisionedWithErrors
        )
    }

    /// Stoppable per §4.4 `stop` semantics: only Validating/Provisioning.
    pub fn is_stoppable(self) -> bool {
        matches!(self, ServerStatus::Validating | ServerStatus::Provisioning)
    }
}

/// Target status a server is being driven towards. A strict subset of
/// [`ServerStatus`]; kept as its own type so invalid targets (e.g.
/// `ValidatedWithErrors`) are unrepresentable, per spec.md §3.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString, Type,
)]
#[sqlx(type_name = "text", rename_all = "PascalCase")]
#[strum(serialize_all = "PascalCase")]
pub enum TargetStatus {
    Unmanaged,
    Validated,
    Provisioned,
    Deployed,
}

impl TargetStatus {
    /// The `ServerStatus` index target status compares against in
    /// `index(status) <= index(target_status)`.
    pub fn as_server_status(self) -> ServerStatus {
        match self {
            TargetStatus::Unmanaged => ServerStatus::Unmanaged,
            TargetStatus::Validated => ServerStatus::Validated,
            TargetStatus::Provisioned => ServerStatus::Provisioned,
            TargetStatus::Deployed => ServerStatus::Deployed,
        }
    }
}

/// Asset type, §3.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Type,
)]
#[sqlx(type_name = "text", rename_all = "PascalCase")]
#[strum(serialize_all = "PascalCase")]
pub enum AssetType {
    Server,
    Chassis,
    NetworkDevice,
}

/// Asset status, §3.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Type,
)]
#[sqlx(type_name = "text", rename_all = "PascalCase")]
#[strum(serialize_all = "PascalCase")]
pub enum AssetStatus {
    New,
    Discovered,
    DiscoveryMismatch,
    Decommissioned,
}

/// Rack status. Not enumerated exhaustively in spec.md; modeled narrowly
/// around what C7 (`switch_validate_for_rack`) and the worker loop observe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Type,
)]
#[sqlx(type_name = "text", rename_all = "PascalCase")]
#[strum(serialize_all = "PascalCase")]
pub enum RackStatus {
    Provisioning,
    Validating,
    ValidatedWithErrors,
    Validated,
    Decommissioned,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_status_total_order_matches_spec() {
        assert!(ServerStatus::Unknown < ServerStatus::Unmanaged);
        assert!(ServerStatus::Unmanaged < ServerStatus::Validating);
        assert!(ServerStatus::Validating < ServerStatus::ValidatedWithErrors);
        assert!(ServerStatus::ValidatedWithErrors < ServerStatus::Validated);
        assert!(ServerStatus::Validated < ServerStatus::Provisioning);
        assert!(ServerStatus::Provisioning < ServerStatus::ProvisionedWithErrors);
        assert!(ServerStatus::ProvisionedWithErrors < ServerStatus::Provisioned);
        assert!(ServerStatus::Provisioned < ServerStatus::Deploying);
        assert!(ServerStatus::Deploying < ServerStatus::Deployed);
    }

    #[test]
    fn target_status_round_trips_to_server_status_index() {
        assert_eq!(
            TargetStatus::Validated.as_server_status(),
            ServerStatus::Validated
        );
    }

    #[test]
    fn status_strings_match_spec_spelling() {
        assert_eq!(ServerStatus::ValidatedWithErrors.to_string(), "ValidatedWithErrors");
        assert_eq!("Provisioning".parse::<ServerStatus>().unwrap(), ServerStatus::Provisioning);
        assert!("bogus".parse::<ServerStatus>().is_err());
    }
}
