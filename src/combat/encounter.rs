//! Encounter state
//!
//! Holds the combatants in turn order together with the round and turn
//! counters. The engine is the only writer; everything else gets clones.

use crate::combat::combatant::{Combatant, CombatantUpdate};
use crate::combat::sort::sort_turn_order;
use crate::core::types::{CombatId, CombatantId, Round};
use serde::{Deserialize, Serialize};

/// Lifecycle of an encounter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CombatPhase {
    /// Round 0, nobody has acted yet
    #[default]
    AwaitingDraw,
    /// Round 1 or later
    InProgress,
    /// Combat deleted; no further changes
    Ended,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combat {
    pub id: CombatId,
    pub round: Round,
    pub turn: usize,
    pub phase: CombatPhase,
    combatants: Vec<Combatant>,
}

impl Combat {
    pub fn new(id: CombatId) -> Self {
        Self {
            id,
            round: 0,
            turn: 0,
            phase: CombatPhase::AwaitingDraw,
            combatants: Vec::new(),
        }
    }

    pub fn with_combatants(id: CombatId, combatants: Vec<Combatant>) -> Self {
        let mut combat = Self::new(id);
        combat.combatants = combatants;
        combat.sort();
        combat
    }

    /// Combatants in turn order
    pub fn turns(&self) -> &[Combatant] {
        &self.combatants
    }

    pub fn len(&self) -> usize {
        self.combatants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combatants.is_empty()
    }

    pub fn is_started(&self) -> bool {
        self.phase == CombatPhase::InProgress
    }

    pub fn get(&self, id: CombatantId) -> Option<&Combatant> {
        self.combatants.iter().find(|c| c.id == id)
    }

    pub fn contains(&self, id: CombatantId) -> bool {
        self.get(id).is_some()
    }

    pub fn index_of(&self, id: CombatantId) -> Option<usize> {
        self.combatants.iter().position(|c| c.id == id)
    }

    /// Combatant whose turn it is (None before combat starts)
    pub fn current(&self) -> Option<&Combatant> {
        if self.round == 0 {
            return None;
        }
        self.combatants.get(self.turn)
    }

    /// Followers of a leader, in turn order
    pub fn followers(&self, leader: CombatantId) -> Vec<&Combatant> {
        self.combatants
            .iter()
            .filter(|c| c.group_id == Some(leader) && c.id != leader)
            .collect()
    }

    /// Any combatant is holding a Joker
    pub fn joker_drawn(&self) -> bool {
        self.combatants.iter().any(|c| c.has_joker)
    }

    /// Re-sort into turn order, keeping the turn on the same combatant
    pub fn sort(&mut self) {
        let current = self.combatants.get(self.turn).map(|c| c.id);
        sort_turn_order(&mut self.combatants, self.round);
        if let Some(index) = current.and_then(|id| self.index_of(id)) {
            self.turn = index;
        }
    }

    /// Apply updates that the host has accepted, then re-sort
    pub fn apply_updates(&mut self, updates: &[CombatantUpdate]) {
        for update in updates {
            if let Some(combatant) = self.combatants.iter_mut().find(|c| c.id == update.id) {
                for change in &update.changes {
                    combatant.apply(change);
                }
            }
        }
        self.sort();
    }

    pub(crate) fn push(&mut self, combatant: Combatant) {
        self.combatants.push(combatant);
        self.sort();
    }

    /// Remove a combatant, keeping the turn pointer valid
    pub(crate) fn remove(&mut self, id: CombatantId) -> Option<Combatant> {
        let pos = self.index_of(id)?;
        let removed = self.combatants.remove(pos);
        if pos < self.turn {
            self.turn -= 1;
        }
        if self.turn >= self.combatants.len() {
            self.turn = self.combatants.len().saturating_sub(1);
        }
        Some(removed)
    }

    pub(crate) fn set_position(&mut self, round: Round, turn: usize) {
        self.round = round;
        if round > 0 && self.phase == CombatPhase::AwaitingDraw {
            self.phase = CombatPhase::InProgress;
        }
        // Stale-hold placement depends on the round; `turn` indexes the new order
        sort_turn_order(&mut self.combatants, self.round);
        self.turn = turn;
    }

    pub(crate) fn end(&mut self) {
        self.phase = CombatPhase::Ended;
    }
}
