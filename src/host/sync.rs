//! Request channel between clients
//!
//! Only the authoritative client (the first active GM) writes combat state.
//! Everyone else asks it to advance the round by emitting a `newRound`
//! message; the resulting state comes back through the host's own sync.

use crate::core::types::CombatId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 64;

/// Role of this client for an encounter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Authority {
    /// First active GM; performs every state change
    #[default]
    Authoritative,
    /// Any other client; sends requests instead of writing
    Delegate,
}

impl Authority {
    pub fn is_authoritative(self) -> bool {
        self == Authority::Authoritative
    }
}

/// Wire message. Serializes as `{"type":"newRound","combatId":"..."}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SyncMessage {
    #[serde(rename = "newRound", rename_all = "camelCase")]
    NewRound { combat_id: CombatId },
}

impl SyncMessage {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn combat_id(&self) -> CombatId {
        match self {
            SyncMessage::NewRound { combat_id } => *combat_id,
        }
    }
}

/// Fire-and-forget broadcast of sync messages
#[derive(Debug, Clone)]
pub struct SyncChannel {
    sender: broadcast::Sender<SyncMessage>,
}

impl SyncChannel {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(DEFAULT_CAPACITY);
        Self { sender }
    }

    /// Send a message; no acknowledgement, no retry
    pub fn emit(&self, message: SyncMessage) {
        if self.sender.send(message).is_err() {
            tracing::debug!(?message, "sync message had no listeners");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncMessage> {
        self.sender.subscribe()
    }
}

impl Default for SyncChannel {
    fn default() -> Self {
        Self::new()
    }
}
