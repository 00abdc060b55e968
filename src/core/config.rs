//! Encounter configuration
//!
//! These are the table options a GM would normally toggle in the host's
//! settings screen. Everything has a sensible default so an empty TOML file
//! is a valid configuration.

use crate::core::error::ConfigError;
use crate::core::types::{DeckId, PileId};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the initiative engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitiativeConfig {
    // === CARDS ===
    /// Deck that initiative cards are dealt from
    pub action_deck: DeckId,

    /// Deck used when `action_deck` cannot be found in the deck store
    pub default_deck: DeckId,

    /// Pile that dealt initiative cards are placed on
    pub discard_pile: PileId,

    // === FLOW ===
    /// Draw cards for everyone automatically at the start of each round
    pub auto_initiative: bool,

    /// Skip defeated and turn-lost combatants when advancing turns
    pub skip_defeated: bool,

    /// Announce each drawn card (the host renders these as chat cards)
    pub announce_draws: bool,

    /// Sound played once per batch of drawn cards
    pub draw_sound: Option<String>,

    /// A player character drawing a Joker rewards the whole party
    pub jokers_wild: bool,

    // === TIME ===
    /// World-time seconds that pass per turn advanced
    pub turn_time_secs: u32,

    /// World-time seconds that pass per round
    ///
    /// A SWADE round is six seconds of in-game time.
    pub round_time_secs: u32,
}

impl Default for InitiativeConfig {
    fn default() -> Self {
        Self {
            action_deck: DeckId::new("action-cards"),
            default_deck: DeckId::new("action-cards"),
            discard_pile: PileId::new("action-cards-discards"),
            auto_initiative: true,
            skip_defeated: true,
            announce_draws: true,
            draw_sound: None,
            jokers_wild: true,
            turn_time_secs: 0,
            round_time_secs: 6,
        }
    }
}

impl InitiativeConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: InitiativeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file from disk
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.action_deck.0.trim().is_empty() {
            return Err(ConfigError::Invalid("action_deck must not be empty".into()));
        }
        if self.default_deck.0.trim().is_empty() {
            return Err(ConfigError::Invalid("default_deck must not be empty".into()));
        }
        if self.discard_pile.0.trim().is_empty() {
            return Err(ConfigError::Invalid("discard_pile must not be empty".into()));
        }
        if matches!(self.draw_sound.as_deref(), Some(path) if path.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "draw_sound must be a path or left unset".into(),
            ));
        }
        Ok(())
    }
}
