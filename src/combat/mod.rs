//! Initiative tracking for one encounter
//!
//! `CombatEngine` is the entry point; the free functions behind it (sorting,
//! draw rules, effect expiry) are public so hosts can preview decisions.

pub mod combatant;
pub mod constants;
pub mod draw;
pub mod effects;
pub mod encounter;
pub mod engine;
pub mod hold;
pub mod roster;
pub mod sort;
pub mod turn;

pub use combatant::{Combatant, CombatantChange, CombatantUpdate};
pub use draw::DrawRule;
pub use effects::{ActiveEffect, EffectDuration, Expiration, ExpiryAction, TurnBoundary};
pub use encounter::{Combat, CombatPhase};
pub use engine::{Advance, CombatEngine, RollOptions};
pub use hold::Interrupt;
pub use sort::{compare_turn_order, sort_turn_order};
