//! Combat engine
//!
//! Owns one encounter and serializes every operation on it. The combat state
//! sits behind a `tokio::sync::Mutex` that each operation holds from start to
//! finish, prompt waits included, so two draws can never interleave.
//!
//! Operations work on a copy of the combat, persist through the host, and only
//! then replace the in-memory state. A host failure leaves the encounter as it
//! was.

use crate::combat::encounter::{Combat, CombatPhase};
use crate::core::config::InitiativeConfig;
use crate::core::error::{InitiativeError, Result};
use crate::core::types::{CombatId, DeckId, Round};
use crate::host::{Authority, DeckStore, EventBus, Host, SyncChannel};
use tokio::sync::Mutex;

/// Knobs for a single initiative draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollOptions {
    /// Publish an `InitiativeDrawn` event per combatant
    pub announce: bool,
    /// Publish the draw sound once for the batch
    pub play_sound: bool,
}

impl Default for RollOptions {
    fn default() -> Self {
        Self {
            announce: true,
            play_sound: true,
        }
    }
}

/// Result of a turn or round advance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Turn { round: Round, turn: usize },
    Round { round: Round, turn: usize },
    /// Sent to the authoritative client instead of applied here
    Requested,
}

pub struct CombatEngine<H: Host> {
    pub(crate) id: CombatId,
    pub(crate) host: H,
    pub(crate) config: InitiativeConfig,
    pub(crate) events: EventBus,
    pub(crate) sync: SyncChannel,
    pub(crate) authority: Authority,
    pub(crate) combat: Mutex<Combat>,
}

impl<H: Host> CombatEngine<H> {
    pub fn new(combat: Combat, host: H, config: InitiativeConfig) -> Self {
        Self {
            id: combat.id,
            host,
            config,
            events: EventBus::new(),
            sync: SyncChannel::new(),
            authority: Authority::Authoritative,
            combat: Mutex::new(combat),
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Join a sync channel with the given role
    pub fn with_sync(mut self, sync: SyncChannel, authority: Authority) -> Self {
        self.sync = sync;
        self.authority = authority;
        self
    }

    pub fn id(&self) -> CombatId {
        self.id
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn config(&self) -> &InitiativeConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn authority(&self) -> Authority {
        self.authority
    }

    /// Copy of the current encounter state
    pub async fn snapshot(&self) -> Combat {
        self.combat.lock().await.clone()
    }

    /// The configured action deck, or the default deck when it is missing
    pub(crate) async fn resolve_deck(&self) -> Result<DeckId> {
        let decks = self.host.deck();
        if decks.contains(&self.config.action_deck).await {
            return Ok(self.config.action_deck.clone());
        }
        if decks.contains(&self.config.default_deck).await {
            self.events.warn(format!(
                "Action deck '{}' not found, using '{}'",
                self.config.action_deck, self.config.default_deck
            ));
            return Ok(self.config.default_deck.clone());
        }
        Err(InitiativeError::DeckNotFound(self.config.action_deck.clone()))
    }
}

pub(crate) fn ensure_open(combat: &Combat) -> Result<()> {
    if combat.phase == CombatPhase::Ended {
        return Err(InitiativeError::CombatEnded);
    }
    Ok(())
}

pub(crate) fn ensure_started(combat: &Combat) -> Result<()> {
    ensure_open(combat)?;
    if combat.round == 0 {
        return Err(InitiativeError::NotStarted);
    }
    Ok(())
}
