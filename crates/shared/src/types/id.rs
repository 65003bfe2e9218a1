//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing a `CostItemId` where a
//! `ScenarioProjectId` is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random ID using UUID v7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

typed_id!(ScenarioProjectId, "Unique identifier for a scenario project.");
typed_id!(CostItemId, "Unique identifier for a scenario cost item.");
typed_id!(CreditLineId, "Unique identifier for a credit line.");
typed_id!(CreditMovementId, "Unique identifier for a credit line movement.");
typed_id!(SalesUnitId, "Unique identifier for a sellable unit.");
typed_id!(ActualEntryId, "Unique identifier for a recorded actual amount.");

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(ScenarioProjectId::new(), ScenarioProjectId::new());
    }

    #[test]
    fn test_id_roundtrip_through_string() {
        let id = CostItemId::new();
        let parsed = CostItemId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_id_rejects_garbage() {
        assert!(SalesUnitId::from_str("not-a-uuid").is_err());
    }

    #[test]
    fn test_id_from_uuid() {
        let uuid = Uuid::nil();
        let id: CreditLineId = uuid.into();
        assert_eq!(id, CreditLineId::from_uuid(uuid));
        assert_eq!(id.into_inner(), uuid);
    }
}
