//! Encounter roster: who is in the fight and which groups they form

use crate::combat::combatant::{Combatant, CombatantChange, CombatantUpdate};
use crate::combat::constants::GROUP_SUIT_STEP;
use crate::combat::draw::follower_updates;
use crate::combat::effects::TurnBoundary;
use crate::combat::encounter::Combat;
use crate::combat::engine::{ensure_open, CombatEngine};
use crate::combat::turn::takes_turn;
use crate::core::error::{InitiativeError, Result};
use crate::core::types::CombatantId;
use crate::host::{CombatStore, CombatUpdate, Host};

/// Leader at the top of `id`'s group (itself when ungrouped or leading)
fn root_leader(combat: &Combat, id: CombatantId) -> CombatantId {
    match combat.get(id) {
        Some(c) if c.is_follower() => c.group_id.unwrap_or(id),
        _ => id,
    }
}

/// Give every non-held follower of `leader` the leader's initiative
fn propagate(combat: &Combat, leader: CombatantId) -> Vec<CombatantUpdate> {
    let Some((value, suit, joker)) = combat
        .get(leader)
        .and_then(|l| l.initiative().map(|(v, s)| (v, s, l.has_joker)))
    else {
        return Vec::new();
    };
    let followers: Vec<&Combatant> = combat
        .followers(leader)
        .into_iter()
        .filter(|f| !f.is_on_hold())
        .collect();
    follower_updates(&followers, value, suit, joker, GROUP_SUIT_STEP)
}

/// Membership changes for `follower` joining `leader`'s group
pub fn join_updates(
    combat: &Combat,
    leader: CombatantId,
    follower: CombatantId,
) -> Result<Vec<CombatantUpdate>> {
    for id in [leader, follower] {
        if !combat.contains(id) {
            return Err(InitiativeError::MissingCombatant(id));
        }
    }
    let root = root_leader(combat, leader);
    if root == follower {
        return Ok(Vec::new());
    }

    let mut updates = Vec::new();
    if let Some(r) = combat.get(root) {
        if !r.is_group_leader {
            updates.push(
                CombatantUpdate::single(root, CombatantChange::SetGroup(Some(root)))
                    .with(CombatantChange::SetGroupLeader(true)),
            );
        }
    }
    updates.push(
        CombatantUpdate::single(follower, CombatantChange::SetGroup(Some(root)))
            .with(CombatantChange::SetGroupLeader(false)),
    );
    // A leader joining another group brings its own followers along
    updates.extend(
        combat
            .followers(follower)
            .into_iter()
            .map(|f| CombatantUpdate::single(f.id, CombatantChange::SetGroup(Some(root)))),
    );
    Ok(updates)
}

/// Membership changes for `follower` leaving its group
pub fn leave_updates(combat: &Combat, follower: CombatantId) -> Result<Vec<CombatantUpdate>> {
    let member = combat
        .get(follower)
        .ok_or(InitiativeError::MissingCombatant(follower))?;
    let Some(leader) = member.group_id.filter(|_| member.is_follower()) else {
        return Ok(Vec::new());
    };

    let mut updates = vec![CombatantUpdate::single(follower, CombatantChange::SetGroup(None))];
    let remaining = combat
        .followers(leader)
        .iter()
        .filter(|f| f.id != follower)
        .count();
    if remaining == 0 {
        updates.push(
            CombatantUpdate::single(leader, CombatantChange::SetGroup(None))
                .with(CombatantChange::SetGroupLeader(false)),
        );
    }
    Ok(updates)
}

impl<H: Host> CombatEngine<H> {
    /// Add a combatant; it draws with everyone else at the next draw
    pub async fn add_combatant(&self, combatant: Combatant) -> Result<Combat> {
        let mut combat = self.combat.lock().await;
        ensure_open(&combat)?;

        self.host
            .store()
            .create_combatant(combat.id, &combatant)
            .await?;
        tracing::debug!(combatant = %combatant.name, "combatant added");
        combat.push(combatant);
        Ok(combat.clone())
    }

    /// Remove a combatant. Followers of a removed leader keep this round's
    /// slot and become ungrouped.
    ///
    /// Removing the combatant whose turn it is passes the turn to the next
    /// one in line, or starts the next round when nobody is left to act.
    pub async fn remove_combatant(&self, id: CombatantId) -> Result<Combat> {
        let mut combat = self.combat.lock().await;
        ensure_open(&combat)?;
        if !combat.contains(id) {
            return Err(InitiativeError::MissingCombatant(id));
        }

        let mut freed: Vec<CombatantUpdate> = combat
            .followers(id)
            .into_iter()
            .map(|f| CombatantUpdate::single(f.id, CombatantChange::SetGroup(None)))
            .collect();
        // Removing the last follower also dissolves the group
        freed.extend(
            leave_updates(&combat, id)?
                .into_iter()
                .filter(|u| u.id != id),
        );

        // Still to act this round, in order, if the current combatant leaves
        let upcoming: Option<Vec<CombatantId>> = combat
            .current()
            .filter(|c| c.id == id)
            .map(|_| combat.turns().iter().skip(combat.turn + 1).map(|c| c.id).collect());

        let mut next = combat.clone();
        next.remove(id);
        next.apply_updates(&freed);

        let skip = self.config.skip_defeated;
        let handoff = upcoming.as_ref().map(|upcoming| {
            upcoming
                .iter()
                .filter_map(|&u| next.get(u))
                .find(|c| !skip || takes_turn(c))
                .and_then(|c| next.index_of(c.id))
        });
        if let Some(Some(turn)) = handoff {
            next.turn = turn;
        }

        if !freed.is_empty() {
            self.host.store().update_many(combat.id, &freed).await?;
        }
        self.host.store().delete_combatant(combat.id, id).await?;
        if let Some(Some(turn)) = handoff {
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
        }
        *combat = next;
        tracing::debug!(combatant = %id, "combatant removed");

        match handoff {
            Some(Some(turn)) => {
                self.turn_started(&combat);
                self.expire_effects(&combat, turn, TurnBoundary::Start)
                    .await?;
            }
            Some(None) if !combat.is_empty() => {
                self.advance_round(&mut combat, false, false).await?;
            }
            _ => {}
        }
        Ok(combat.clone())
    }

    /// Put `follower` into `leader`'s group
    ///
    /// Joining a follower resolves to that follower's leader, so groups stay
    /// one level deep. The new follower takes the leader's card right away
    /// when the leader already has one.
    pub async fn join_group(&self, leader: CombatantId, follower: CombatantId) -> Result<Combat> {
        let mut combat = self.combat.lock().await;
        ensure_open(&combat)?;

        let mut updates = join_updates(&combat, leader, follower)?;
        if updates.is_empty() {
            tracing::warn!(combatant = %follower, "cannot join its own group");
            return Ok(combat.clone());
        }
        let mut next = combat.clone();
        next.apply_updates(&updates);
        let root = root_leader(&next, leader);
        let derived = propagate(&next, root);
        next.apply_updates(&derived);
        updates.extend(derived);

        self.host.store().update_many(combat.id, &updates).await?;
        *combat = next;
        tracing::debug!(leader = %root, follower = %follower, "group joined");
        Ok(combat.clone())
    }

    /// Take `follower` out of its group, dissolving the group when it was the
    /// last member
    pub async fn leave_group(&self, follower: CombatantId) -> Result<Combat> {
        let mut combat = self.combat.lock().await;
        ensure_open(&combat)?;

        let updates = leave_updates(&combat, follower)?;
        if !updates.is_empty() {
            self.host.store().update_many(combat.id, &updates).await?;
            combat.apply_updates(&updates);
        }
        Ok(combat.clone())
    }

    /// Break up a group entirely
    pub async fn disband_group(&self, leader: CombatantId) -> Result<Combat> {
        let mut combat = self.combat.lock().await;
        ensure_open(&combat)?;
        let head = combat
            .get(leader)
            .ok_or(InitiativeError::MissingCombatant(leader))?;
        if !head.is_group_leader {
            return Ok(combat.clone());
        }

        let mut updates: Vec<CombatantUpdate> = combat
            .followers(leader)
            .into_iter()
            .map(|f| CombatantUpdate::single(f.id, CombatantChange::SetGroup(None)))
            .collect();
        updates.push(
            CombatantUpdate::single(leader, CombatantChange::SetGroup(None))
                .with(CombatantChange::SetGroupLeader(false)),
        );

        self.host.store().update_many(combat.id, &updates).await?;
        combat.apply_updates(&updates);
        Ok(combat.clone())
    }

    pub async fn set_defeated(&self, id: CombatantId, defeated: bool) -> Result<Combat> {
        let mut combat = self.combat.lock().await;
        ensure_open(&combat)?;
        if !combat.contains(id) {
            return Err(InitiativeError::MissingCombatant(id));
        }

        let update = CombatantUpdate::single(id, CombatantChange::SetDefeated(defeated));
        self.host.store().update(combat.id, &update).await?;
        combat.apply_updates(std::slice::from_ref(&update));
        Ok(combat.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::CombatId;

    fn combatant(id: u128, name: &str) -> Combatant {
        Combatant::with_id(CombatantId::from_u128(id), name, None)
    }

    fn id(n: u128) -> CombatantId {
        CombatantId::from_u128(n)
    }

    #[test]
    fn test_join_makes_leader() {
        let combat = Combat::with_combatants(CombatId::new(), vec![combatant(1, "Boss"), combatant(2, "Minion")]);
        let updates = join_updates(&combat, id(1), id(2)).unwrap();
        let mut after = combat.clone();
        after.apply_updates(&updates);

        let boss = after.get(id(1)).unwrap();
        assert!(boss.is_group_leader);
        assert_eq!(boss.group_id, Some(id(1)));
        let minion = after.get(id(2)).unwrap();
        assert!(minion.is_follower());
        assert_eq!(minion.group_id, Some(id(1)));
    }

    #[test]
    fn test_join_through_follower_flattens() {
        let mut boss = combatant(1, "Boss");
        boss.group_id = Some(boss.id);
        boss.is_group_leader = true;
        let mut minion = combatant(2, "Minion");
        minion.group_id = Some(boss.id);
        let combat = Combat::with_combatants(CombatId::new(), vec![boss, minion, combatant(3, "Grunt")]);

        let mut after = combat.clone();
        after.apply_updates(&join_updates(&combat, id(2), id(3)).unwrap());
        assert_eq!(after.get(id(3)).unwrap().group_id, Some(id(1)));
        assert_eq!(after.followers(id(1)).len(), 2);
    }

    #[test]
    fn test_join_self_is_noop() {
        let combat = Combat::with_combatants(CombatId::new(), vec![combatant(1, "Solo")]);
        assert!(join_updates(&combat, id(1), id(1)).unwrap().is_empty());
    }

    #[test]
    fn test_last_follower_leaving_dissolves_group() {
        let mut boss = combatant(1, "Boss");
        boss.group_id = Some(boss.id);
        boss.is_group_leader = true;
        let mut minion = combatant(2, "Minion");
        minion.group_id = Some(boss.id);
        let combat = Combat::with_combatants(CombatId::new(), vec![boss, minion]);

        let mut after = combat.clone();
        after.apply_updates(&leave_updates(&combat, id(2)).unwrap());
        assert!(!after.get(id(1)).unwrap().is_group_leader);
        assert_eq!(after.get(id(2)).unwrap().group_id, None);
    }

    #[test]
    fn test_propagate_uses_leader_card() {
        let mut boss = combatant(1, "Boss");
        boss.group_id = Some(boss.id);
        boss.is_group_leader = true;
        boss.card_value = Some(11);
        boss.suit_value = Some(3.0);
        let mut minion = combatant(2, "Minion");
        minion.group_id = Some(boss.id);
        let combat = Combat::with_combatants(CombatId::new(), vec![boss, minion]);

        let mut after = combat.clone();
        after.apply_updates(&propagate(&combat, id(1)));
        let (value, suit) = after.get(id(2)).unwrap().initiative().unwrap();
        assert_eq!(value, 11);
        assert!((suit - 2.99).abs() < 1e-9);
    }
}
