//! Round and turn advancement
//!
//! `AwaitingDraw` → `InProgress` → `Ended`. Turn changes expire status effects
//! at the boundaries they are tied to; round changes also reshuffle the deck
//! after a Joker, clear last round's cards and deal new ones.

use crate::combat::combatant::{Combatant, CombatantChange, CombatantUpdate};
use crate::combat::draw::{pending_draws, DrawBatch};
use crate::combat::effects::{resolve_expiry, ExpiryAction, TurnBoundary};
use crate::combat::encounter::{Combat, CombatPhase};
use crate::combat::engine::{ensure_open, Advance, CombatEngine, RollOptions};
use crate::core::error::{InitiativeError, Result};
use crate::host::{
    CombatEvent, CombatStore, CombatUpdate, DeckStore, EffectStore, Host, SyncMessage,
};
use tokio::sync::broadcast;

/// Whether a combatant gets a turn when the tracker walks past them
pub fn takes_turn(combatant: &Combatant) -> bool {
    !combatant.defeated && !combatant.turn_lost && !(combatant.is_on_hold() && combatant.is_follower())
}

/// Index of the next turn after `from` (or the first turn when `from` is None)
pub fn next_eligible_turn(turns: &[Combatant], from: Option<usize>, skip: bool) -> Option<usize> {
    let start = from.map_or(0, |turn| turn + 1);
    if !skip {
        return (start < turns.len()).then_some(start);
    }
    turns
        .iter()
        .enumerate()
        .skip(start)
        .find(|(_, c)| takes_turn(c))
        .map(|(i, _)| i)
}

/// Updates that clear last round's initiative
///
/// Held combatants keep their card; a held group member that lost its turn
/// gives up the Joker so it is not reshuffled twice.
pub fn round_resets(combat: &Combat) -> Vec<CombatantUpdate> {
    combat
        .turns()
        .iter()
        .filter_map(|c| {
            if !c.is_on_hold() {
                (c.has_initiative() || c.has_joker || c.turn_lost || c.card_id.is_some())
                    .then(|| CombatantUpdate::single(c.id, CombatantChange::ClearInitiative))
            } else if c.turn_lost && c.group_id.is_some() && c.has_joker {
                Some(CombatantUpdate::single(c.id, CombatantChange::ClearJoker))
            } else {
                None
            }
        })
        .collect()
}

fn seconds(turns: usize, per_turn: u32) -> u32 {
    u32::try_from(turns).unwrap_or(u32::MAX).saturating_mul(per_turn)
}

impl<H: Host> CombatEngine<H> {
    /// Start round 1, drawing for everyone when auto-initiative is on
    ///
    /// Cards drawn before the fight are kept as the opening round's cards.
    pub async fn start_combat(&self) -> Result<Advance> {
        let mut combat = self.combat.lock().await;
        ensure_open(&combat)?;
        if combat.round > 0 {
            tracing::debug!(round = combat.round, "combat already started");
            return Ok(Advance::Round {
                round: combat.round,
                turn: combat.turn,
            });
        }
        self.advance_round(&mut combat, false, true).await
    }

    /// Move to the next combatant, rolling over into a new round at the end
    pub async fn next_turn(&self) -> Result<Advance> {
        let mut combat = self.combat.lock().await;
        ensure_open(&combat)?;
        if combat.round == 0 {
            return self.advance_round(&mut combat, false, false).await;
        }
        if combat.is_empty() {
            return Err(InitiativeError::NoCombatants);
        }

        let skip = self.config.skip_defeated;
        let Some(next) = next_eligible_turn(combat.turns(), Some(combat.turn), skip) else {
            return self.advance_round(&mut combat, true, false).await;
        };

        self.expire_effects(&combat, combat.turn, TurnBoundary::End)
            .await?;

        let update = CombatUpdate {
            round: combat.round,
            turn: next,
            advance_time: seconds(next.saturating_sub(combat.turn), self.config.turn_time_secs),
        };
        self.host.store().update_combat(combat.id, update).await?;
        combat.turn = next;

        self.turn_started(&combat);
        self.expire_effects(&combat, next, TurnBoundary::Start)
            .await?;
        Ok(Advance::Turn {
            round: combat.round,
            turn: next,
        })
    }

    /// Begin the next round. Delegates only send the request.
    pub async fn next_round(&self) -> Result<Advance> {
        let mut combat = self.combat.lock().await;
        ensure_open(&combat)?;
        self.advance_round(&mut combat, true, false).await
    }

    /// Clear every card and hold, and shuffle the deck back together
    pub async fn reset_all(&self) -> Result<Combat> {
        let mut combat = self.combat.lock().await;
        ensure_open(&combat)?;

        let updates: Vec<CombatantUpdate> = combat
            .turns()
            .iter()
            .filter(|c| c.has_initiative() || c.is_on_hold() || c.turn_lost || c.has_joker)
            .map(|c| {
                CombatantUpdate::single(c.id, CombatantChange::ClearInitiative)
                    .with(CombatantChange::SetHold(None))
            })
            .collect();

        let mut next = combat.clone();
        if !updates.is_empty() {
            self.host.store().update_many(combat.id, &updates).await?;
            next.apply_updates(&updates);
        }
        *combat = next;

        self.reshuffle().await?;
        tracing::info!(combat = %combat.id, "initiative reset");
        Ok(combat.clone())
    }

    /// Delete the encounter. Every later change fails with `CombatEnded`.
    pub async fn end_combat(&self) -> Result<()> {
        let mut combat = self.combat.lock().await;
        if combat.phase == CombatPhase::Ended {
            return Ok(());
        }

        match self.reshuffle().await {
            Ok(()) | Err(InitiativeError::DeckNotFound(_)) => {}
            Err(e) => return Err(e),
        }
        self.host.store().delete_combat(combat.id).await?;
        combat.end();

        tracing::info!(combat = %combat.id, rounds = combat.round, "combat ended");
        self.events
            .publish(CombatEvent::CombatEnded { combat: combat.id });
        Ok(())
    }

    /// Act on a message from another client
    ///
    /// Only the authoritative client answers; anything for another encounter
    /// is ignored.
    pub async fn handle_sync(&self, message: SyncMessage) -> Result<Option<Advance>> {
        if message.combat_id() != self.id || !self.authority.is_authoritative() {
            return Ok(None);
        }
        match message {
            SyncMessage::NewRound { .. } => {
                tracing::debug!(combat = %self.id, "newRound requested by another client");
                self.next_round().await.map(Some)
            }
        }
    }

    /// Answer sync messages until the channel closes or the combat ends
    pub async fn serve_sync(&self, mut rx: broadcast::Receiver<SyncMessage>) {
        loop {
            let message = match rx.recv().await {
                Ok(message) => message,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "sync listener fell behind");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            match self.handle_sync(message).await {
                Ok(_) => {}
                Err(InitiativeError::CombatEnded) => break,
                Err(e) => self.events.warn(format!("Could not start the next round: {e}")),
            }
            if self.combat.lock().await.phase == CombatPhase::Ended {
                break;
            }
        }
        tracing::debug!(combat = %self.id, "sync listener stopped");
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Round change on an already locked combat
    ///
    /// `keep_drawn` skips the Joker reshuffle and the card resets; only the
    /// opening round started through `start_combat` uses it.
    pub(crate) async fn advance_round(
        &self,
        combat: &mut Combat,
        end_current_turn: bool,
        keep_drawn: bool,
    ) -> Result<Advance> {
        if !self.authority.is_authoritative() {
            self.sync.emit(SyncMessage::NewRound {
                combat_id: combat.id,
            });
            tracing::info!(combat = %combat.id, "asked the GM to start the next round");
            return Ok(Advance::Requested);
        }
        if combat.is_empty() {
            return Err(InitiativeError::NoCombatants);
        }

        let starting = combat.round == 0;
        if end_current_turn && !starting {
            self.expire_effects(combat, combat.turn, TurnBoundary::End)
                .await?;
        }

        if !keep_drawn && combat.joker_drawn() {
            self.reshuffle().await?;
        }

        let round = combat.round + 1;
        let mut next = combat.clone();
        next.set_position(round, 0);
        let mut updates = if keep_drawn { Vec::new() } else { round_resets(&next) };
        next.apply_updates(&updates);

        let batch = if self.config.auto_initiative {
            let ids = pending_draws(&next, |_| true);
            match self.draw_batch(&next, &ids).await {
                Ok(batch) => batch,
                // Already reported to the user; the round goes ahead without cards
                Err(InitiativeError::InsufficientCards { .. }) => DrawBatch::default(),
                Err(e) => return Err(e),
            }
        } else {
            DrawBatch::default()
        };
        next.apply_updates(&batch.updates);
        updates.extend(batch.updates.iter().cloned());

        let turn = next_eligible_turn(next.turns(), None, self.config.skip_defeated).unwrap_or(0);
        next.set_position(round, turn);

        let advance_time = if starting {
            0
        } else {
            seconds(combat.len().saturating_sub(combat.turn), self.config.turn_time_secs)
                .saturating_add(self.config.round_time_secs)
        };

        if !updates.is_empty() {
            self.host.store().update_many(combat.id, &updates).await?;
        }
        self.host
            .store()
            .update_combat(
                combat.id,
                CombatUpdate {
                    round,
                    turn,
                    advance_time,
                },
            )
            .await?;
        *combat = next;

        tracing::info!(combat = %combat.id, round, turn, "round started");
        self.events.publish(CombatEvent::RoundStarted {
            combat: combat.id,
            round,
        });
        self.announce(combat.id, &batch, RollOptions::default());
        self.turn_started(combat);
        self.expire_effects(combat, turn, TurnBoundary::Start)
            .await?;

        Ok(Advance::Round { round, turn })
    }

    pub(crate) fn turn_started(&self, combat: &Combat) {
        if let Some(current) = combat.current() {
            tracing::info!(
                round = combat.round,
                turn = combat.turn,
                combatant = %current.name,
                "turn started"
            );
            self.events.publish(CombatEvent::TurnStarted {
                combat: combat.id,
                round: combat.round,
                combatant: current.id,
            });
        }
    }

    pub(crate) async fn reshuffle(&self) -> Result<()> {
        let deck = self.resolve_deck().await?;
        self.host.deck().reset(&deck).await?;
        tracing::info!(deck = %deck, "action deck reshuffled");
        self.events.publish(CombatEvent::DeckReshuffled { deck });
        Ok(())
    }

    /// Expire the effects of the combatant at `index` for one turn boundary
    pub(crate) async fn expire_effects(
        &self,
        combat: &Combat,
        index: usize,
        boundary: TurnBoundary,
    ) -> Result<()> {
        let Some(actor) = combat.turns().get(index).and_then(|c| c.actor) else {
            return Ok(());
        };

        let effects = self.host.effects();
        for effect in effects.effects_for(actor).await? {
            match resolve_expiry(&effect, boundary, combat.round, index) {
                ExpiryAction::Keep => {}
                ExpiryAction::Decrement(left) => {
                    tracing::debug!(effect = %effect.label, left, "effect counts down");
                    effects.set_remaining_rounds(effect.id, left).await?;
                }
                ExpiryAction::Delete => {
                    tracing::info!(effect = %effect.label, "effect expired");
                    effects.delete_effect(effect.id).await?;
                    self.events.publish(CombatEvent::EffectExpired {
                        effect: effect.id,
                        label: effect.label,
                    });
                }
                ExpiryAction::Prompt => {
                    effects.prompt_delete(effect.id).await?;
                    self.events.publish(CombatEvent::EffectExpiryPrompted {
                        effect: effect.id,
                        label: effect.label,
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{CombatId, CombatantId};

    fn combatant(id: u128, name: &str) -> Combatant {
        Combatant::with_id(CombatantId::from_u128(id), name, None)
    }

    #[test]
    fn test_next_eligible_without_skip() {
        let mut down = combatant(2, "B");
        down.defeated = true;
        let turns = vec![combatant(1, "A"), down, combatant(3, "C")];
        assert_eq!(next_eligible_turn(&turns, Some(0), false), Some(1));
        assert_eq!(next_eligible_turn(&turns, Some(2), false), None);
        assert_eq!(next_eligible_turn(&turns, None, false), Some(0));
    }

    #[test]
    fn test_next_eligible_skips_defeated_and_lost() {
        let mut down = combatant(2, "B");
        down.defeated = true;
        let mut lost = combatant(3, "C");
        lost.turn_lost = true;
        let turns = vec![combatant(1, "A"), down, lost, combatant(4, "D")];
        assert_eq!(next_eligible_turn(&turns, Some(0), true), Some(3));
        assert_eq!(next_eligible_turn(&turns, Some(3), true), None);
    }

    #[test]
    fn test_held_follower_is_skipped_but_held_leader_is_not() {
        let mut leader = combatant(1, "Boss");
        leader.group_id = Some(leader.id);
        leader.is_group_leader = true;
        leader.round_held = Some(1);
        let mut minion = combatant(2, "Minion");
        minion.group_id = Some(leader.id);
        minion.round_held = Some(1);
        let turns = vec![leader, minion];
        assert_eq!(next_eligible_turn(&turns, None, true), Some(0));
        assert_eq!(next_eligible_turn(&turns, Some(0), true), None);
    }

    #[test]
    fn test_round_resets_keep_holds() {
        let mut fresh = combatant(1, "Fresh");
        fresh.card_value = Some(7);
        fresh.suit_value = Some(2.0);
        let mut held = combatant(2, "Held");
        held.card_value = Some(9);
        held.suit_value = Some(1.0);
        held.round_held = Some(1);
        let mut lost = combatant(3, "Lost");
        lost.round_held = Some(1);
        lost.turn_lost = true;
        lost.has_joker = true;
        lost.group_id = Some(CombatantId::from_u128(9));
        let idle = combatant(4, "Idle");

        let combat = Combat::with_combatants(CombatId::new(), vec![fresh, held, lost, idle]);
        let resets = round_resets(&combat);
        assert_eq!(resets.len(), 2);
        assert!(resets.contains(&CombatantUpdate::single(
            CombatantId::from_u128(1),
            CombatantChange::ClearInitiative
        )));
        assert!(resets.contains(&CombatantUpdate::single(
            CombatantId::from_u128(3),
            CombatantChange::ClearJoker
        )));
    }

    #[test]
    fn test_seconds_saturates() {
        assert_eq!(seconds(3, 6), 18);
        assert_eq!(seconds(usize::MAX, 2), u32::MAX);
    }
}
