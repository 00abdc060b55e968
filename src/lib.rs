//! SWADE action-card initiative
//!
//! Deals action cards, keeps the turn order, and steps an encounter through
//! rounds and turns. Storage, prompts and effects belong to the host and come
//! in through the traits in [`host`].

pub mod cards;
pub mod combat;
pub mod core;
pub mod host;

pub use crate::combat::{Advance, Combat, CombatEngine, Combatant, RollOptions};
pub use crate::core::{InitiativeConfig, InitiativeError, Result};
