//! Status-effect expiration at turn boundaries
//!
//! Effects are owned by the host's effect store. The engine only decides, at
//! the start or end of a combatant's turn, whether an effect's duration has
//! run out and whether it goes away silently or after asking the GM.

use crate::core::types::{ActorId, EffectId, Round};
use serde::{Deserialize, Serialize};

/// Which edge of a turn is being evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnBoundary {
    Start,
    End,
}

/// When and how an effect expires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Expiration {
    StartOfTurnAuto,
    StartOfTurnPrompt,
    EndOfTurnAuto,
    EndOfTurnPrompt,
}

impl Expiration {
    pub fn boundary(self) -> TurnBoundary {
        match self {
            Expiration::StartOfTurnAuto | Expiration::StartOfTurnPrompt => TurnBoundary::Start,
            Expiration::EndOfTurnAuto | Expiration::EndOfTurnPrompt => TurnBoundary::End,
        }
    }

    /// Removed without asking anyone
    pub fn is_auto(self) -> bool {
        matches!(self, Expiration::StartOfTurnAuto | Expiration::EndOfTurnAuto)
    }
}

/// Where an effect's duration is anchored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectDuration {
    pub start_round: Round,
    pub start_turn: usize,
    /// Rounds still to run; None lasts until the next matching boundary
    pub rounds: Option<u32>,
}

impl EffectDuration {
    pub fn new(start_round: Round, start_turn: usize, rounds: Option<u32>) -> Self {
        Self {
            start_round,
            start_turn,
            rounds,
        }
    }

    /// Started before (round, turn): an earlier turn this round or any earlier round
    pub fn anchored_before(&self, round: Round, turn: usize) -> bool {
        self.start_round < round || (self.start_round == round && self.start_turn < turn)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveEffect {
    pub id: EffectId,
    pub actor: ActorId,
    pub label: String,
    pub expiration: Option<Expiration>,
    pub duration: EffectDuration,
}

impl ActiveEffect {
    pub fn new(
        actor: ActorId,
        label: impl Into<String>,
        expiration: Option<Expiration>,
        duration: EffectDuration,
    ) -> Self {
        Self {
            id: EffectId::new(),
            actor,
            label: label.into(),
            expiration,
            duration,
        }
    }
}

/// What should happen to an effect at a boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryAction {
    Keep,
    /// Count one round off and keep the effect
    Decrement(u32),
    Delete,
    Prompt,
}

/// Decide an effect's fate at `boundary` of the turn at (round, turn)
pub fn resolve_expiry(
    effect: &ActiveEffect,
    boundary: TurnBoundary,
    round: Round,
    turn: usize,
) -> ExpiryAction {
    let Some(expiration) = effect.expiration else {
        return ExpiryAction::Keep;
    };
    if expiration.boundary() != boundary || !effect.duration.anchored_before(round, turn) {
        return ExpiryAction::Keep;
    }

    // Each matching boundary after the anchor consumes one round
    let remaining = effect.duration.rounds.map(|r| r.saturating_sub(1));
    match remaining {
        Some(left) if left > 0 => ExpiryAction::Decrement(left),
        _ if expiration.is_auto() => ExpiryAction::Delete,
        _ => ExpiryAction::Prompt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn effect(expiration: Expiration, round: Round, turn: usize, rounds: Option<u32>) -> ActiveEffect {
        ActiveEffect::new(
            ActorId::new(),
            "Shaken",
            Some(expiration),
            EffectDuration::new(round, turn, rounds),
        )
    }

    #[test]
    fn test_not_expired_on_own_starting_turn() {
        let e = effect(Expiration::EndOfTurnAuto, 1, 2, None);
        assert_eq!(resolve_expiry(&e, TurnBoundary::End, 1, 2), ExpiryAction::Keep);
    }

    #[test]
    fn test_started_earlier_turn_same_round_is_eligible() {
        let e = effect(Expiration::EndOfTurnAuto, 1, 0, None);
        assert_eq!(resolve_expiry(&e, TurnBoundary::End, 1, 2), ExpiryAction::Delete);
    }

    #[test]
    fn test_started_earlier_round_is_eligible() {
        let e = effect(Expiration::StartOfTurnPrompt, 1, 4, None);
        assert_eq!(resolve_expiry(&e, TurnBoundary::Start, 2, 0), ExpiryAction::Prompt);
    }

    #[test]
    fn test_wrong_boundary_kept() {
        let e = effect(Expiration::StartOfTurnAuto, 1, 0, None);
        assert_eq!(resolve_expiry(&e, TurnBoundary::End, 3, 0), ExpiryAction::Keep);
    }

    #[test]
    fn test_rounds_count_down_before_expiring() {
        let e = effect(Expiration::EndOfTurnAuto, 1, 0, Some(3));
        assert_eq!(resolve_expiry(&e, TurnBoundary::End, 2, 0), ExpiryAction::Decrement(2));

        let e = effect(Expiration::EndOfTurnAuto, 1, 0, Some(1));
        assert_eq!(resolve_expiry(&e, TurnBoundary::End, 2, 0), ExpiryAction::Delete);
    }

    #[test]
    fn test_no_expiration_policy_is_permanent() {
        let mut e = effect(Expiration::EndOfTurnAuto, 1, 0, None);
        e.expiration = None;
        assert_eq!(resolve_expiry(&e, TurnBoundary::End, 9, 0), ExpiryAction::Keep);
    }

    #[test]
    fn test_expiration_serializes_kebab_case() {
        let json = serde_json::to_string(&Expiration::EndOfTurnPrompt).unwrap();
        assert_eq!(json, "\"end-of-turn-prompt\"");
    }
}
