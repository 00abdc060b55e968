use crate::core::types::{CombatantId, DeckId};
use thiserror::Error;

/// Opaque failure reported by a host collaborator (persistence, deck storage,
/// prompts). Passed through to the caller untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("host error: {0}")]
pub struct HostError(pub String);

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Error, Debug)]
pub enum InitiativeError {
    #[error("Not enough action cards: {needed} needed, {available} available")]
    InsufficientCards { needed: usize, available: usize },

    #[error("Action deck not found: {0}")]
    DeckNotFound(DeckId),

    #[error("Combatant not found: {0}")]
    MissingCombatant(CombatantId),

    #[error("Encounter has no combatants")]
    NoCombatants,

    #[error("Combat has not started")]
    NotStarted,

    #[error("Combat has ended")]
    CombatEnded,

    #[error(transparent)]
    Host(#[from] HostError),
}

pub type Result<T> = std::result::Result<T, InitiativeError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
