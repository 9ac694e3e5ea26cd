use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::Type;
use uuid::Uuid;

/// Defines a strongly typed wrapper around a `uuid::Uuid`, with the trait
/// impls needed to pass it through sqlx, serde and the RPC layer.
///
/// Mirrors the per-entity ID newtypes the rest of the fleet (and its
/// upstream relatives) use instead of passing bare `Uuid`/`String` around.
macro_rules! entity_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash, PartialOrd, Ord, Type,
        )]
        #[sqlx(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(RackId);
entity_id!(WorkerId);
entity_id!(NetworkMapId);
entity_id!(SubnetId);
entity_id!(AssetId);
entity_id!(ServerId);
entity_id!(ServerInterfaceId);
entity_id!(SwitchId);
entity_id!(SwitchInterfaceId);
entity_id!(PortId);
entity_id!(ClusterId);
entity_id!(ChangeLogId);
