//! Host collaborators
//!
//! The engine never stores cards, combat documents or effects itself. The
//! host application supplies them through these traits; `memory` holds a
//! complete in-memory host used by the tests and the CLI.

pub mod events;
pub mod memory;
pub mod sync;

use crate::cards::Card;
use crate::combat::combatant::{Combatant, CombatantUpdate};
use crate::combat::effects::ActiveEffect;
use crate::core::error::HostError;
use crate::core::types::{ActorId, CardId, CombatId, CombatantId, DeckId, EffectId, PileId, Round};
use serde::{Deserialize, Serialize};
use std::future::Future;

pub use events::{CombatEvent, EventBus};
pub use memory::MemoryHost;
pub use sync::{Authority, SyncChannel, SyncMessage};

pub type HostResult<T> = std::result::Result<T, HostError>;

/// Card storage: the action deck and its piles
pub trait DeckStore: Send + Sync {
    fn contains(&self, deck: &DeckId) -> impl Future<Output = bool> + Send;

    /// Undrawn cards left in the deck
    fn available(&self, deck: &DeckId) -> impl Future<Output = HostResult<usize>> + Send;

    fn draw(&self, deck: &DeckId, n: usize) -> impl Future<Output = HostResult<Vec<Card>>> + Send;

    fn deal_to(
        &self,
        deck: &DeckId,
        pile: &PileId,
        n: usize,
    ) -> impl Future<Output = HostResult<Vec<Card>>> + Send;

    /// Recall every card and shuffle
    fn reset(&self, deck: &DeckId) -> impl Future<Output = HostResult<()>> + Send;

    fn card(&self, deck: &DeckId, id: CardId)
        -> impl Future<Output = HostResult<Option<Card>>> + Send;
}

/// Round/turn change sent to the host's combat document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatUpdate {
    pub round: Round,
    pub turn: usize,
    /// World-time seconds to advance alongside the change
    pub advance_time: u32,
}

/// Combat document persistence
pub trait CombatStore: Send + Sync {
    fn update(
        &self,
        combat: CombatId,
        update: &CombatantUpdate,
    ) -> impl Future<Output = HostResult<()>> + Send;

    /// Batched update; all or nothing
    fn update_many(
        &self,
        combat: CombatId,
        updates: &[CombatantUpdate],
    ) -> impl Future<Output = HostResult<()>> + Send;

    fn update_combat(
        &self,
        combat: CombatId,
        update: CombatUpdate,
    ) -> impl Future<Output = HostResult<()>> + Send;

    fn create_combatant(
        &self,
        combat: CombatId,
        combatant: &Combatant,
    ) -> impl Future<Output = HostResult<()>> + Send;

    fn delete_combatant(
        &self,
        combat: CombatId,
        id: CombatantId,
    ) -> impl Future<Output = HostResult<()>> + Send;

    fn delete_combat(&self, combat: CombatId) -> impl Future<Output = HostResult<()>> + Send;
}

/// A card choice put in front of whoever controls the combatant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickRequest {
    pub combatant: CombatantId,
    pub combatant_name: String,
    pub candidates: Vec<Card>,
    pub enable_redraw: bool,
    pub is_quick_draw: bool,
    pub old_card_id: Option<CardId>,
}

/// Answer to a `PickRequest`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardChoice {
    Keep(CardId),
    Redraw,
    /// Dialog closed without a choice
    Cancelled,
}

/// User-facing card choice dialog
pub trait CardPrompt: Send + Sync {
    /// Resolve once the user answers or closes the dialog
    fn choose(&self, request: &PickRequest) -> impl Future<Output = CardChoice> + Send;
}

/// Status-effect storage
pub trait EffectStore: Send + Sync {
    fn effects_for(
        &self,
        actor: ActorId,
    ) -> impl Future<Output = HostResult<Vec<ActiveEffect>>> + Send;

    fn delete_effect(&self, id: EffectId) -> impl Future<Output = HostResult<()>> + Send;

    /// Ask the GM whether to remove the effect
    fn prompt_delete(&self, id: EffectId) -> impl Future<Output = HostResult<()>> + Send;

    fn set_remaining_rounds(
        &self,
        id: EffectId,
        rounds: u32,
    ) -> impl Future<Output = HostResult<()>> + Send;
}

/// What the engine needs to know about an actor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorProfile {
    /// System identifiers of the actor's edges and hindrances
    pub swids: Vec<String>,
    /// Controlled by a player rather than the GM
    pub player_owned: bool,
}

impl ActorProfile {
    pub fn has(&self, swid: &str) -> bool {
        self.swids.iter().any(|s| s.eq_ignore_ascii_case(swid))
    }
}

/// Actor lookups by weak reference
pub trait ActorDirectory: Send + Sync {
    fn profile(&self, actor: ActorId) -> Option<ActorProfile>;
}

/// Bundle of every collaborator the engine talks to
pub trait Host: Send + Sync {
    type Deck: DeckStore;
    type Store: CombatStore;
    type Prompt: CardPrompt;
    type Effects: EffectStore;
    type Actors: ActorDirectory;

    fn deck(&self) -> &Self::Deck;
    fn store(&self) -> &Self::Store;
    fn prompt(&self) -> &Self::Prompt;
    fn effects(&self) -> &Self::Effects;
    fn actors(&self) -> &Self::Actors;
}
