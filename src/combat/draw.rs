//! Initiative draw engine
//!
//! Deals action cards to combatants and applies the edges and hindrances that
//! change how many cards are drawn and who gets to choose:
//!
//! - Level Headed / Improved Level Headed: draw 2 / 3, keep one
//! - Hesitant: draw 2, keep the worse unless a Joker shows up
//! - Quick: a card of 5 or lower may be redrawn
//!
//! Group followers never draw; they take their leader's card with a slightly
//! lower suit so the leader always acts first.

use crate::cards::Card;
use crate::combat::combatant::{Combatant, CombatantChange, CombatantUpdate};
use crate::combat::constants::{
    GROUP_SUIT_STEP, HESITANT_DRAW, IMPROVED_LEVEL_HEADED_DRAW, LEVEL_HEADED_DRAW,
    QUICK_REDRAW_THRESHOLD, STANDARD_DRAW, SWID_HESITANT, SWID_IMPROVED_LEVEL_HEADED,
    SWID_LEVEL_HEADED, SWID_QUICK,
};
use crate::combat::encounter::Combat;
use crate::combat::engine::{ensure_open, CombatEngine, RollOptions};
use crate::core::error::{InitiativeError, Result};
use crate::core::types::{CardId, CombatId, CombatantId, DeckId};
use crate::host::{
    ActorDirectory, ActorProfile, CardChoice, CardPrompt, CombatEvent, CombatStore, DeckStore,
    Host, PickRequest,
};

/// How a combatant draws their initiative
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawRule {
    Standard,
    Quick,
    Hesitant,
    LevelHeaded { cards: usize, quick: bool },
}

impl DrawRule {
    pub fn for_profile(profile: &ActorProfile) -> Self {
        let quick = profile.has(SWID_QUICK);
        let hesitant = profile.has(SWID_HESITANT);
        let level_headed = if profile.has(SWID_IMPROVED_LEVEL_HEADED) {
            Some(IMPROVED_LEVEL_HEADED_DRAW)
        } else if profile.has(SWID_LEVEL_HEADED) {
            Some(LEVEL_HEADED_DRAW)
        } else {
            None
        };

        match level_headed {
            Some(cards) => {
                if hesitant {
                    tracing::warn!(
                        cards,
                        "combatant has both Level Headed and Hesitant; drawing as Level Headed"
                    );
                }
                DrawRule::LevelHeaded { cards, quick }
            }
            None if hesitant => DrawRule::Hesitant,
            None if quick => DrawRule::Quick,
            None => DrawRule::Standard,
        }
    }

    pub fn cards_to_draw(&self) -> usize {
        match self {
            DrawRule::Standard | DrawRule::Quick => STANDARD_DRAW,
            DrawRule::Hesitant => HESITANT_DRAW,
            DrawRule::LevelHeaded { cards, .. } => *cards,
        }
    }
}

/// Flags for the pick-a-card prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PickContext {
    pub enable_redraw: bool,
    pub is_quick_draw: bool,
    pub old_card_id: Option<CardId>,
}

/// Card applied when the prompt is closed: a Joker, else the old card, else
/// the first card drawn
pub fn fallback_card(candidates: &[Card], old_card_id: Option<CardId>) -> Option<&Card> {
    candidates
        .iter()
        .find(|c| c.is_joker)
        .or_else(|| old_card_id.and_then(|old| candidates.iter().find(|c| c.id == old)))
        .or_else(|| candidates.first())
}

/// Whether a redraw may be offered for the current candidates
pub fn redraw_allowed(
    candidates: &[Card],
    context: &PickContext,
    redraw_used: bool,
    available: usize,
) -> bool {
    if !context.enable_redraw || redraw_used || available == 0 {
        return false;
    }
    // Quick only redraws while every card is 5 or lower
    !(context.is_quick_draw && candidates.iter().any(|c| c.value > QUICK_REDRAW_THRESHOLD))
}

/// Worse card by rank, then suit
pub fn lowest_card(cards: &[Card]) -> Option<&Card> {
    cards.iter().min_by_key(|c| (c.value, c.suit))
}

/// Card changes for a group's followers once the leader's card is known.
/// Each follower sits `step` further below the leader's suit than the last.
pub fn follower_updates(
    followers: &[&Combatant],
    card_value: u8,
    leader_suit: f64,
    has_joker: bool,
    step: f64,
) -> Vec<CombatantUpdate> {
    followers
        .iter()
        .enumerate()
        .map(|(i, follower)| {
            CombatantUpdate::single(
                follower.id,
                CombatantChange::AssignCard {
                    card_id: None,
                    card_value,
                    suit_value: leader_suit - step * (i as f64 + 1.0),
                    has_joker,
                },
            )
        })
        .collect()
}

/// One combatant's resolved card
#[derive(Debug, Clone)]
pub(crate) struct DrawnInitiative {
    pub combatant: CombatantId,
    pub name: String,
    pub card: Card,
    pub announce: bool,
    pub player_owned: bool,
}

/// Everything a batch of draws wants to change, not yet persisted
#[derive(Debug, Clone, Default)]
pub(crate) struct DrawBatch {
    pub updates: Vec<CombatantUpdate>,
    pub drawn: Vec<DrawnInitiative>,
}

impl<H: Host> CombatEngine<H> {
    /// Draw initiative for the given combatants
    ///
    /// Fails with `InsufficientCards` before touching anything when the deck
    /// holds fewer undrawn cards than `ids`, or than the drawing combatants'
    /// edges will deal between them. Defeated, held and follower
    /// combatants are skipped; followers receive their leader's card.
    pub async fn roll_initiative(
        &self,
        ids: &[CombatantId],
        options: RollOptions,
    ) -> Result<Combat> {
        let mut combat = self.combat.lock().await;
        ensure_open(&combat)?;
        self.roll_locked(&mut combat, ids, options).await
    }

    /// Draw for every combatant that has no card yet
    pub async fn roll_all(&self, options: RollOptions) -> Result<Combat> {
        let mut combat = self.combat.lock().await;
        ensure_open(&combat)?;
        let ids = pending_draws(&combat, |_| true);
        self.roll_locked(&mut combat, &ids, options).await
    }

    /// Draw for every GM-controlled combatant that has no card yet
    pub async fn roll_npcs(&self, options: RollOptions) -> Result<Combat> {
        let mut combat = self.combat.lock().await;
        ensure_open(&combat)?;
        let ids = pending_draws(&combat, |c| !self.is_player_owned(c));
        self.roll_locked(&mut combat, &ids, options).await
    }

    /// Draw, persist and commit on an already locked combat
    async fn roll_locked(
        &self,
        combat: &mut Combat,
        ids: &[CombatantId],
        options: RollOptions,
    ) -> Result<Combat> {
        let batch = self.draw_batch(combat, ids).await?;
        let mut next = combat.clone();
        if !batch.updates.is_empty() {
            self.host.store().update_many(combat.id, &batch.updates).await?;
            next.apply_updates(&batch.updates);
        }
        *combat = next;
        self.announce(combat.id, &batch, options);
        Ok(combat.clone())
    }

    fn profile_of(&self, combatant: &Combatant) -> ActorProfile {
        combatant
            .actor
            .and_then(|actor| self.host.actors().profile(actor))
            .unwrap_or_default()
    }

    fn is_player_owned(&self, combatant: &Combatant) -> bool {
        self.profile_of(combatant).player_owned
    }

    /// Resolve cards for `ids` against `combat` without changing it
    pub(crate) async fn draw_batch(&self, combat: &Combat, ids: &[CombatantId]) -> Result<DrawBatch> {
        let mut unique: Vec<CombatantId> = Vec::with_capacity(ids.len());
        for &id in ids {
            if !combat.contains(id) {
                return Err(InitiativeError::MissingCombatant(id));
            }
            if !unique.contains(&id) {
                unique.push(id);
            }
        }

        let mut batch = DrawBatch::default();
        if unique.is_empty() {
            return Ok(batch);
        }

        // Who draws and by which rule, settled before anything is dealt
        let mut plans: Vec<(&Combatant, ActorProfile, DrawRule)> = Vec::with_capacity(unique.len());
        for id in unique {
            let Some(combatant) = combat.get(id) else {
                continue;
            };
            if !combatant.draws_own_card() {
                tracing::debug!(
                    combatant = %combatant.name,
                    defeated = combatant.defeated,
                    held = combatant.is_on_hold(),
                    follower = combatant.is_follower(),
                    "skipping initiative draw"
                );
                continue;
            }
            let profile = self.profile_of(combatant);
            let rule = DrawRule::for_profile(&profile);
            plans.push((combatant, profile, rule));
        }

        // Optional redraws are not counted; they stop short with a warning
        let needed = plans
            .iter()
            .map(|(combatant, _, rule)| {
                if combatant.card_id.is_some() {
                    STANDARD_DRAW
                } else {
                    rule.cards_to_draw()
                }
            })
            .sum::<usize>()
            .max(ids.len());

        let deck = self.resolve_deck().await?;
        let available = self.host.deck().available(&deck).await?;
        if available < needed {
            self.events.warn(format!(
                "Not enough action cards: {needed} needed, {available} left. Reset the deck first."
            ));
            return Err(InitiativeError::InsufficientCards { needed, available });
        }

        for (combatant, profile, rule) in plans {
            let id = combatant.id;
            let (card, announce) = self.draw_for(combatant, rule, &deck).await?;
            tracing::debug!(combatant = %combatant.name, card = %card.name, "initiative card");

            batch
                .updates
                .push(CombatantUpdate::single(id, CombatantChange::from_card(&card)));
            if combatant.is_group_leader {
                let followers: Vec<&Combatant> = combat
                    .followers(id)
                    .into_iter()
                    .filter(|f| !f.is_on_hold())
                    .collect();
                batch.updates.extend(follower_updates(
                    &followers,
                    card.value,
                    f64::from(card.suit),
                    card.is_joker,
                    GROUP_SUIT_STEP,
                ));
            }
            batch.drawn.push(DrawnInitiative {
                combatant: id,
                name: combatant.name.clone(),
                card,
                announce,
                player_owned: profile.player_owned,
            });
        }
        Ok(batch)
    }

    /// Pick one card for a combatant. The flag is false when a redraw kept the
    /// old card, which is not worth announcing again.
    async fn draw_for(
        &self,
        combatant: &Combatant,
        rule: DrawRule,
        deck: &DeckId,
    ) -> Result<(Card, bool)> {
        // Redraw: offer the old card against one fresh card
        if let Some(old_id) = combatant.card_id {
            if let Some(old) = self.host.deck().card(deck, old_id).await? {
                let mut candidates = vec![old];
                candidates.extend(self.deal(deck, STANDARD_DRAW).await?);
                let context = PickContext {
                    old_card_id: Some(old_id),
                    ..PickContext::default()
                };
                let kept = self.pick_card(combatant, deck, candidates, context).await?;
                let announce = kept.id != old_id;
                return Ok((kept, announce));
            }
        }

        let cards = self.deal(deck, rule.cards_to_draw()).await?;
        let card = match rule {
            DrawRule::Standard => first_card(cards)?,
            DrawRule::Quick => {
                let card = first_card(cards)?;
                if card.value <= QUICK_REDRAW_THRESHOLD {
                    let context = PickContext {
                        enable_redraw: true,
                        is_quick_draw: true,
                        old_card_id: None,
                    };
                    self.pick_card(combatant, deck, vec![card], context).await?
                } else {
                    card
                }
            }
            DrawRule::Hesitant => {
                if cards.iter().any(|c| c.is_joker) {
                    self.pick_card(combatant, deck, cards, PickContext::default())
                        .await?
                } else {
                    lowest_card(&cards)
                        .cloned()
                        .ok_or(InitiativeError::InsufficientCards {
                            needed: HESITANT_DRAW,
                            available: 0,
                        })?
                }
            }
            DrawRule::LevelHeaded { quick, .. } => {
                let context = PickContext {
                    enable_redraw: quick,
                    is_quick_draw: quick,
                    old_card_id: None,
                };
                self.pick_card(combatant, deck, cards, context).await?
            }
        };
        Ok((card, true))
    }

    /// Pick-a-card: ask the controlling party, with an optional single redraw
    async fn pick_card(
        &self,
        combatant: &Combatant,
        deck: &DeckId,
        mut candidates: Vec<Card>,
        context: PickContext,
    ) -> Result<Card> {
        let mut redraw_used = false;
        loop {
            let available = self.host.deck().available(deck).await?;
            let enable_redraw = redraw_allowed(&candidates, &context, redraw_used, available);
            let request = PickRequest {
                combatant: combatant.id,
                combatant_name: combatant.name.clone(),
                candidates: candidates.clone(),
                enable_redraw,
                is_quick_draw: context.is_quick_draw,
                old_card_id: context.old_card_id,
            };

            match self.host.prompt().choose(&request).await {
                CardChoice::Keep(id) => {
                    if let Some(card) = candidates.iter().find(|c| c.id == id) {
                        return Ok(card.clone());
                    }
                    tracing::warn!(combatant = %combatant.name, "prompt picked a card that was not offered");
                }
                CardChoice::Redraw if enable_redraw => {
                    candidates.extend(self.deal(deck, STANDARD_DRAW).await?);
                    redraw_used = true;
                    continue;
                }
                CardChoice::Redraw | CardChoice::Cancelled => {}
            }

            return fallback_card(&candidates, context.old_card_id)
                .cloned()
                .ok_or(InitiativeError::InsufficientCards {
                    needed: 1,
                    available: 0,
                });
        }
    }

    /// Deal `n` cards onto the discard pile
    async fn deal(&self, deck: &DeckId, n: usize) -> Result<Vec<Card>> {
        let decks = self.host.deck();
        let available = decks.available(deck).await?;
        if available < n {
            self.events.warn(format!(
                "Action deck ran out mid-draw: {n} needed, {available} left"
            ));
            return Err(InitiativeError::InsufficientCards {
                needed: n,
                available,
            });
        }
        Ok(decks.deal_to(deck, &self.config.discard_pile, n).await?)
    }

    /// Publish the notifications for an applied batch
    pub(crate) fn announce(&self, combat: CombatId, batch: &DrawBatch, options: RollOptions) {
        if batch.drawn.is_empty() {
            return;
        }
        if options.announce && self.config.announce_draws {
            for drawn in batch.drawn.iter().filter(|d| d.announce) {
                self.events.publish(CombatEvent::InitiativeDrawn {
                    combat,
                    combatant: drawn.combatant,
                    name: drawn.name.clone(),
                    card: drawn.card.clone(),
                });
            }
        }
        if options.play_sound {
            if let Some(path) = &self.config.draw_sound {
                self.events.publish(CombatEvent::PlaySound { path: path.clone() });
            }
        }
        if self.config.jokers_wild {
            for drawn in batch
                .drawn
                .iter()
                .filter(|d| d.player_owned && d.card.is_joker)
            {
                tracing::info!(combatant = %drawn.name, "jokers wild");
                self.events.publish(CombatEvent::JokersWild {
                    combat,
                    combatant: drawn.combatant,
                });
            }
        }
    }
}

fn first_card(cards: Vec<Card>) -> Result<Card> {
    cards
        .into_iter()
        .next()
        .ok_or(InitiativeError::InsufficientCards {
            needed: 1,
            available: 0,
        })
}

/// Combatants with no card yet that would draw their own
pub(crate) fn pending_draws(
    combat: &Combat,
    mut include: impl FnMut(&Combatant) -> bool,
) -> Vec<CombatantId> {
    combat
        .turns()
        .iter()
        .filter(|c| c.draws_own_card() && !c.has_initiative() && include(c))
        .map(|c| c.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::Suit;

    fn profile(swids: &[&str]) -> ActorProfile {
        ActorProfile {
            swids: swids.iter().map(|s| s.to_string()).collect(),
            player_owned: false,
        }
    }

    #[test]
    fn test_rule_selection() {
        assert_eq!(DrawRule::for_profile(&profile(&[])), DrawRule::Standard);
        assert_eq!(DrawRule::for_profile(&profile(&["quick"])), DrawRule::Quick);
        assert_eq!(DrawRule::for_profile(&profile(&["hesitant"])), DrawRule::Hesitant);
        assert_eq!(
            DrawRule::for_profile(&profile(&["level-headed", "quick"])),
            DrawRule::LevelHeaded { cards: 2, quick: true }
        );
        assert_eq!(
            DrawRule::for_profile(&profile(&["level-headed", "improved-level-headed"])),
            DrawRule::LevelHeaded { cards: 3, quick: false }
        );
    }

    #[test]
    fn test_level_headed_beats_hesitant() {
        let rule = DrawRule::for_profile(&profile(&["hesitant", "improved-level-headed"]));
        assert_eq!(rule, DrawRule::LevelHeaded { cards: 3, quick: false });
        assert_eq!(rule.cards_to_draw(), 3);
    }

    #[test]
    fn test_fallback_prefers_joker_then_old_then_first() {
        let first = Card::ranked(4, Suit::Clubs);
        let old = Card::ranked(9, Suit::Hearts);
        let joker = Card::joker(false);

        let cards = vec![first.clone(), old.clone(), joker.clone()];
        assert_eq!(fallback_card(&cards, Some(old.id)).unwrap().id, joker.id);

        let cards = vec![first.clone(), old.clone()];
        assert_eq!(fallback_card(&cards, Some(old.id)).unwrap().id, old.id);
        assert_eq!(fallback_card(&cards, None).unwrap().id, first.id);
        assert!(fallback_card(&[], None).is_none());
    }

    #[test]
    fn test_quick_redraw_only_while_all_low() {
        let context = PickContext {
            enable_redraw: true,
            is_quick_draw: true,
            old_card_id: None,
        };
        let low = vec![Card::ranked(3, Suit::Spades)];
        assert!(redraw_allowed(&low, &context, false, 10));
        assert!(!redraw_allowed(&low, &context, true, 10));
        assert!(!redraw_allowed(&low, &context, false, 0));

        let mixed = vec![Card::ranked(3, Suit::Spades), Card::ranked(6, Suit::Clubs)];
        assert!(!redraw_allowed(&mixed, &context, false, 10));
    }

    #[test]
    fn test_non_quick_redraw_ignores_values() {
        let context = PickContext {
            enable_redraw: true,
            is_quick_draw: false,
            old_card_id: None,
        };
        let high = vec![Card::ranked(13, Suit::Spades)];
        assert!(redraw_allowed(&high, &context, false, 5));
    }

    #[test]
    fn test_lowest_card_uses_suit_tie_break() {
        let cards = vec![Card::ranked(3, Suit::Hearts), Card::ranked(3, Suit::Clubs)];
        assert_eq!(lowest_card(&cards).unwrap().suit, Suit::Clubs.value());
    }

    #[test]
    fn test_follower_offsets_strictly_decrease() {
        let a = Combatant::new("A", None);
        let b = Combatant::new("B", None);
        let updates = follower_updates(&[&a, &b], 9, 2.0, false, GROUP_SUIT_STEP);
        let suits: Vec<f64> = updates
            .iter()
            .map(|u| match u.changes[0] {
                CombatantChange::AssignCard { suit_value, .. } => suit_value,
                _ => unreachable!(),
            })
            .collect();
        assert!(suits[0] < 2.0);
        assert!(suits[1] < suits[0]);
    }
}
