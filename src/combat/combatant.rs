//! Combatant record
//!
//! One participant's turn-order slot in an encounter. Everything the engine
//! changes on a combatant goes through `CombatantChange`, so the same values
//! reach the host's persistence layer and the in-memory record.

use crate::cards::Card;
use crate::core::types::{ActorId, CardId, CombatantId, Round};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combatant {
    pub id: CombatantId,
    pub name: String,
    /// Weak reference used to look up edges; never owned by the combatant
    pub actor: Option<ActorId>,
    /// Card that was dealt to this combatant (None for followers)
    pub card_id: Option<CardId>,
    pub card_value: Option<u8>,
    pub suit_value: Option<f64>,
    pub has_joker: bool,
    pub round_held: Option<Round>,
    pub turn_lost: bool,
    pub group_id: Option<CombatantId>,
    pub is_group_leader: bool,
    pub defeated: bool,
}

impl Combatant {
    pub fn new(name: impl Into<String>, actor: Option<ActorId>) -> Self {
        Self::with_id(CombatantId::new(), name, actor)
    }

    pub fn with_id(id: CombatantId, name: impl Into<String>, actor: Option<ActorId>) -> Self {
        Self {
            id,
            name: name.into(),
            actor,
            card_id: None,
            card_value: None,
            suit_value: None,
            has_joker: false,
            round_held: None,
            turn_lost: false,
            group_id: None,
            is_group_leader: false,
            defeated: false,
        }
    }

    /// (card value, suit value) when a card has been drawn this round
    pub fn initiative(&self) -> Option<(u8, f64)> {
        Some((self.card_value?, self.suit_value?))
    }

    pub fn has_initiative(&self) -> bool {
        self.initiative().is_some()
    }

    pub fn is_on_hold(&self) -> bool {
        self.round_held.is_some()
    }

    /// Held since an earlier round and still waiting to act
    pub fn is_stale_hold(&self, round: Round) -> bool {
        matches!(self.round_held, Some(held) if held != round)
    }

    /// Non-leader member of a group
    pub fn is_follower(&self) -> bool {
        self.group_id.is_some() && !self.is_group_leader
    }

    /// Whether this combatant draws its own card
    pub fn draws_own_card(&self) -> bool {
        !self.defeated && !self.is_on_hold() && !self.is_follower()
    }

    pub fn apply(&mut self, change: &CombatantChange) {
        match change {
            CombatantChange::AssignCard {
                card_id,
                card_value,
                suit_value,
                has_joker,
            } => {
                self.card_id = *card_id;
                self.card_value = Some(*card_value);
                self.suit_value = Some(*suit_value);
                self.has_joker = *has_joker;
            }
            CombatantChange::ClearInitiative => {
                self.card_id = None;
                self.card_value = None;
                self.suit_value = None;
                self.has_joker = false;
                self.turn_lost = false;
            }
            CombatantChange::ClearJoker => self.has_joker = false,
            CombatantChange::SetHold(round) => self.round_held = *round,
            CombatantChange::SetTurnLost(lost) => self.turn_lost = *lost,
            CombatantChange::SetGroup(group) => self.group_id = *group,
            CombatantChange::SetGroupLeader(leader) => self.is_group_leader = *leader,
            CombatantChange::SetDefeated(defeated) => self.defeated = *defeated,
        }
    }
}

/// A single field-level change to a combatant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum CombatantChange {
    AssignCard {
        card_id: Option<CardId>,
        card_value: u8,
        suit_value: f64,
        has_joker: bool,
    },
    ClearInitiative,
    ClearJoker,
    SetHold(Option<Round>),
    SetTurnLost(bool),
    SetGroup(Option<CombatantId>),
    SetGroupLeader(bool),
    SetDefeated(bool),
}

impl CombatantChange {
    /// Assign a drawn card as-is
    pub fn from_card(card: &Card) -> Self {
        CombatantChange::AssignCard {
            card_id: Some(card.id),
            card_value: card.value,
            suit_value: f64::from(card.suit),
            has_joker: card.is_joker,
        }
    }
}

/// Partial state for one combatant, as sent to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatantUpdate {
    pub id: CombatantId,
    pub changes: Vec<CombatantChange>,
}

impl CombatantUpdate {
    pub fn new(id: CombatantId) -> Self {
        Self {
            id,
            changes: Vec::new(),
        }
    }

    pub fn single(id: CombatantId, change: CombatantChange) -> Self {
        Self {
            id,
            changes: vec![change],
        }
    }

    pub fn with(mut self, change: CombatantChange) -> Self {
        self.changes.push(change);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::Suit;

    #[test]
    fn test_new_combatant_has_no_initiative() {
        let c = Combatant::new("Red", None);
        assert!(!c.has_initiative());
        assert!(c.draws_own_card());
    }

    #[test]
    fn test_assign_and_clear() {
        let mut c = Combatant::new("Red", None);
        let card = Card::ranked(12, Suit::Hearts);
        c.apply(&CombatantChange::from_card(&card));
        assert_eq!(c.initiative(), Some((12, 3.0)));
        assert_eq!(c.card_id, Some(card.id));

        c.turn_lost = true;
        c.apply(&CombatantChange::ClearInitiative);
        assert_eq!(c.initiative(), None);
        assert!(!c.turn_lost);
    }

    #[test]
    fn test_stale_hold() {
        let mut c = Combatant::new("Gabe", None);
        c.round_held = Some(2);
        assert!(!c.is_stale_hold(2));
        assert!(c.is_stale_hold(3));
        assert!(!c.draws_own_card());
    }

    #[test]
    fn test_follower_does_not_draw() {
        let mut c = Combatant::new("Goon", None);
        c.group_id = Some(CombatantId::new());
        assert!(c.is_follower());
        assert!(!c.draws_own_card());
    }

    #[test]
    fn test_change_serializes_with_kind_tag() {
        let json = serde_json::to_value(CombatantChange::SetTurnLost(true)).unwrap();
        assert_eq!(json["kind"], "setTurnLost");
    }
}
