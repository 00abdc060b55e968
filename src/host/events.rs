//! Typed combat notifications
//!
//! Replaces the host's global hook registry: an `EventBus` is handed to the
//! engine at construction and anyone interested subscribes to it. Sending
//! never blocks and never fails when nobody is listening.

use crate::cards::Card;
use crate::core::types::{CombatId, CombatantId, DeckId, EffectId, Round};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CombatEvent {
    /// A combatant received a card (rendered as a chat card by the host)
    InitiativeDrawn {
        combat: CombatId,
        combatant: CombatantId,
        name: String,
        card: Card,
    },
    /// Play the draw sound once for a batch of draws
    PlaySound { path: String },
    /// A player character drew a Joker; their side earns a Benny
    JokersWild {
        combat: CombatId,
        combatant: CombatantId,
    },
    DeckReshuffled { deck: DeckId },
    RoundStarted { combat: CombatId, round: Round },
    TurnStarted {
        combat: CombatId,
        round: Round,
        combatant: CombatantId,
    },
    EffectExpired { effect: EffectId, label: String },
    EffectExpiryPrompted { effect: EffectId, label: String },
    CombatEnded { combat: CombatId },
    /// Something the user should see (not enough cards, missing deck)
    Warning { message: String },
}

#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CombatEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CombatEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: CombatEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("combat event dropped, no subscribers");
        }
    }

    pub fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.publish(CombatEvent::Warning { message });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
