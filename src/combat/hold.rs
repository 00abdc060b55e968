//! Hold and interrupt
//!
//! A combatant on hold keeps their card but skips their slot. When they want
//! to act they cut in just before or just after whoever currently has the
//! turn by taking that combatant's card value with a nudged suit.

use crate::combat::combatant::{Combatant, CombatantChange, CombatantUpdate};
use crate::combat::constants::INTERRUPT_SUIT_STEP;
use crate::combat::draw::follower_updates;
use crate::combat::effects::TurnBoundary;
use crate::combat::encounter::Combat;
use crate::combat::engine::{ensure_started, CombatEngine};
use crate::core::error::{InitiativeError, Result};
use crate::core::types::CombatantId;
use crate::host::{CombatStore, CombatUpdate, Host};

/// Where a held combatant cuts in relative to the current turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    Before,
    After,
}

impl Interrupt {
    fn suit_offset(self) -> f64 {
        match self {
            Interrupt::Before => INTERRUPT_SUIT_STEP,
            Interrupt::After => -INTERRUPT_SUIT_STEP,
        }
    }
}

/// The combatant and, for a leader, every follower
fn with_followers(combat: &Combat, id: CombatantId) -> Result<Vec<&Combatant>> {
    let combatant = combat
        .get(id)
        .ok_or(InitiativeError::MissingCombatant(id))?;
    let mut members = vec![combatant];
    if combatant.is_group_leader {
        members.extend(combat.followers(id));
    }
    Ok(members)
}

/// Changes that move `actor` (and followers) next to the current combatant
pub fn interrupt_updates(
    combat: &Combat,
    actor: CombatantId,
    position: Interrupt,
) -> Result<Vec<CombatantUpdate>> {
    let current = combat.current().ok_or(InitiativeError::NotStarted)?;
    let members = with_followers(combat, actor)?;
    let release = |c: &Combatant| {
        CombatantUpdate::single(c.id, CombatantChange::SetHold(None))
            .with(CombatantChange::SetTurnLost(false))
    };

    // Nothing to slot next to when the current combatant has no card; the
    // held card stays and only the turn moves
    let Some((value, suit)) = current.initiative().filter(|_| current.id != actor) else {
        return Ok(members.into_iter().map(release).collect());
    };
    let suit = suit + position.suit_offset();
    let leader = members[0];
    let followers = &members[1..];

    let mut updates = vec![release(leader).with(CombatantChange::AssignCard {
        card_id: leader.card_id,
        card_value: value,
        suit_value: suit,
        has_joker: leader.has_joker,
    })];
    // Followers fill the gap between the leader and the next slot
    let step = INTERRUPT_SUIT_STEP / (followers.len() as f64 + 1.0);
    updates.extend(
        follower_updates(followers, value, suit, leader.has_joker, step)
            .into_iter()
            .map(|u| {
                u.with(CombatantChange::SetHold(None))
                    .with(CombatantChange::SetTurnLost(false))
            }),
    );
    Ok(updates)
}

impl<H: Host> CombatEngine<H> {
    /// Put a combatant (and its followers) on hold for this round
    pub async fn hold(&self, id: CombatantId) -> Result<Combat> {
        let mut combat = self.combat.lock().await;
        ensure_started(&combat)?;

        let round = combat.round;
        let updates: Vec<CombatantUpdate> = with_followers(&combat, id)?
            .into_iter()
            .map(|c| CombatantUpdate::single(c.id, CombatantChange::SetHold(Some(round))))
            .collect();

        self.host.store().update_many(combat.id, &updates).await?;
        combat.apply_updates(&updates);
        tracing::info!(combatant = %id, round, "on hold");
        Ok(combat.clone())
    }

    /// Cut in before the current combatant; the turn moves to the held one
    pub async fn act_now(&self, id: CombatantId) -> Result<Combat> {
        let mut combat = self.combat.lock().await;
        ensure_started(&combat)?;

        let updates = interrupt_updates(&combat, id, Interrupt::Before)?;
        let mut next = combat.clone();
        next.apply_updates(&updates);
        let turn = next.index_of(id).ok_or(InitiativeError::MissingCombatant(id))?;
        next.turn = turn;

        self.host.store().update_many(combat.id, &updates).await?;
        self.host
            .store()
            .update_combat(
                combat.id,
                CombatUpdate {
                    round: next.round,
                    turn,
                    advance_time: 0,
                },
            )
            .await?;
        *combat = next;

        tracing::info!(combatant = %id, turn, "acting now");
        self.turn_started(&combat);
        self.expire_effects(&combat, turn, TurnBoundary::Start)
            .await?;
        Ok(combat.clone())
    }

    /// Cut in right after the current combatant; the turn stays put
    pub async fn act_after_current(&self, id: CombatantId) -> Result<Combat> {
        let mut combat = self.combat.lock().await;
        ensure_started(&combat)?;

        let updates = interrupt_updates(&combat, id, Interrupt::After)?;
        self.host.store().update_many(combat.id, &updates).await?;
        combat.apply_updates(&updates);
        tracing::info!(combatant = %id, "acting after the current turn");
        Ok(combat.clone())
    }

    /// Mark a held combatant as having lost their turn (failed interrupt)
    pub async fn lose_turn(&self, id: CombatantId) -> Result<Combat> {
        let mut combat = self.combat.lock().await;
        ensure_started(&combat)?;

        let updates: Vec<CombatantUpdate> = with_followers(&combat, id)?
            .into_iter()
            .map(|c| CombatantUpdate::single(c.id, CombatantChange::SetTurnLost(true)))
            .collect();

        self.host.store().update_many(combat.id, &updates).await?;
        combat.apply_updates(&updates);
        tracing::info!(combatant = %id, "turn lost");
        Ok(combat.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::CombatId;

    fn carded(id: u128, name: &str, value: u8, suit: f64) -> Combatant {
        let mut c = Combatant::with_id(CombatantId::from_u128(id), name, None);
        c.card_value = Some(value);
        c.suit_value = Some(suit);
        c
    }

    fn started(combatants: Vec<Combatant>, turn: usize) -> Combat {
        let mut combat = Combat::with_combatants(CombatId::new(), combatants);
        combat.set_position(1, turn);
        combat
    }

    #[test]
    fn test_interrupt_before_sorts_ahead_of_current() {
        let mut held = carded(1, "Held", 3, 1.0);
        held.round_held = Some(1);
        let mut combat = started(vec![carded(2, "Fast", 12, 4.0), carded(3, "Slow", 8, 2.0), held], 1);
        assert_eq!(combat.current().unwrap().name, "Slow");

        let updates =
            interrupt_updates(&combat, CombatantId::from_u128(1), Interrupt::Before).unwrap();
        combat.apply_updates(&updates);
        let names: Vec<&str> = combat.turns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Fast", "Held", "Slow"]);
        assert!(!combat.get(CombatantId::from_u128(1)).unwrap().is_on_hold());
    }

    #[test]
    fn test_interrupt_after_sorts_behind_current() {
        let mut held = carded(1, "Held", 3, 1.0);
        held.round_held = Some(1);
        let mut combat = started(
            vec![carded(2, "Fast", 12, 4.0), carded(3, "Slow", 8, 2.0), carded(4, "Last", 8, 1.0), held],
            1,
        );
        let updates =
            interrupt_updates(&combat, CombatantId::from_u128(1), Interrupt::After).unwrap();
        combat.apply_updates(&updates);
        let names: Vec<&str> = combat.turns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Fast", "Slow", "Held", "Last"]);
        assert_eq!(combat.current().unwrap().name, "Slow");
    }

    #[test]
    fn test_followers_follow_the_interrupt() {
        let mut boss = carded(1, "Boss", 2, 1.0);
        boss.round_held = Some(1);
        boss.is_group_leader = true;
        boss.group_id = Some(boss.id);
        let mut minion = carded(2, "Minion", 2, 0.99);
        minion.round_held = Some(1);
        minion.group_id = Some(boss.id);
        let combat = started(vec![carded(3, "Hero", 10, 3.0), carded(4, "Next", 10, 2.0), boss, minion], 0);

        let mut after = combat.clone();
        after.apply_updates(&interrupt_updates(&combat, CombatantId::from_u128(1), Interrupt::After).unwrap());
        let names: Vec<&str> = after.turns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Hero", "Boss", "Minion", "Next"]);
    }

    #[test]
    fn test_current_acting_now_only_releases() {
        let mut held = carded(1, "Held", 9, 2.0);
        held.round_held = Some(1);
        let combat = started(vec![held], 0);
        let updates =
            interrupt_updates(&combat, CombatantId::from_u128(1), Interrupt::Before).unwrap();
        assert_eq!(
            updates,
            vec![CombatantUpdate::single(CombatantId::from_u128(1), CombatantChange::SetHold(None))
                .with(CombatantChange::SetTurnLost(false))]
        );
    }

    #[test]
    fn test_interrupt_next_to_uncarded_current_keeps_held_card() {
        let mut held = carded(1, "Held", 9, 3.0);
        held.round_held = Some(1);
        let uncarded = Combatant::with_id(CombatantId::from_u128(2), "Late", None);
        let mut combat = started(vec![held, uncarded], 0);
        combat.turn = combat.index_of(CombatantId::from_u128(2)).unwrap();

        let updates =
            interrupt_updates(&combat, CombatantId::from_u128(1), Interrupt::Before).unwrap();
        combat.apply_updates(&updates);
        let held = combat.get(CombatantId::from_u128(1)).unwrap();
        assert_eq!(held.initiative(), Some((9, 3.0)));
        assert!(!held.is_on_hold());
    }

    #[test]
    fn test_unknown_combatant() {
        let combat = started(vec![carded(1, "A", 5, 1.0)], 0);
        assert!(matches!(
            interrupt_updates(&combat, CombatantId::from_u128(7), Interrupt::Before),
            Err(InitiativeError::MissingCombatant(_))
        ));
    }
}
