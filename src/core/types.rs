//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Build a fixed identifier (handy for fixtures and replays)
            pub const fn from_u128(value: u128) -> Self {
                Self(Uuid::from_u128(value))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for an encounter
    CombatId
);
uuid_id!(
    /// Unique identifier for a combatant slot in an encounter
    CombatantId
);
uuid_id!(
    /// Weak reference to the actor behind a combatant
    ActorId
);
uuid_id!(
    /// Identity of a physical action card
    CardId
);
uuid_id!(
    /// Identifier of an active status effect
    EffectId
);

/// Named card stack (the action deck) as configured by the host
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeckId(pub String);

impl DeckId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for DeckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Named pile that dealt cards land in
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PileId(pub String);

impl PileId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for PileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Combat round counter (0 = combat not started)
pub type Round = u32;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_ids_order_like_their_hex_form() {
        let a = CombatantId::from_u128(1);
        let b = CombatantId::from_u128(2);
        assert!(a < b);
        assert!(a.to_string() < b.to_string());
    }

    #[test]
    fn test_new_ids_are_unique() {
        assert_ne!(CardId::new(), CardId::new());
    }

    #[test]
    fn test_deck_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&DeckId::new("action-cards")).unwrap();
        assert_eq!(json, "\"action-cards\"");
    }
}
