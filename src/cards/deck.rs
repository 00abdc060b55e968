//! In-memory action deck
//!
//! Cards are dealt from the top of the draw order. A dealt card stays out of
//! the draw order until `reset`, which recalls every pile and shuffles.

use crate::cards::card::{standard_action_deck, Card};
use crate::core::types::{CardId, PileId};
use ahash::{AHashMap, AHashSet};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Clone)]
pub struct ActionDeck {
    cards: AHashMap<CardId, Card>,
    /// Undrawn cards, top of the deck last
    draw_order: Vec<CardId>,
    drawn: AHashSet<CardId>,
    piles: AHashMap<PileId, Vec<CardId>>,
    /// Box order, used to rebuild `draw_order` on reset
    box_order: Vec<CardId>,
    rng: ChaCha8Rng,
}

impl ActionDeck {
    /// Standard 54-card deck, shuffled with the given seed
    pub fn standard(seed: u64) -> Self {
        Self::shuffled(standard_action_deck(), seed)
    }

    /// Arbitrary cards, shuffled with the given seed
    pub fn shuffled(cards: Vec<Card>, seed: u64) -> Self {
        let mut deck = Self::stacked(cards);
        deck.rng = ChaCha8Rng::seed_from_u64(seed);
        deck.shuffle();
        deck
    }

    /// Cards dealt in exactly the given order until the first reset
    pub fn stacked(cards: Vec<Card>) -> Self {
        let box_order: Vec<CardId> = cards.iter().map(|c| c.id).collect();
        let mut draw_order = box_order.clone();
        draw_order.reverse();
        Self {
            cards: cards.into_iter().map(|c| (c.id, c)).collect(),
            draw_order,
            drawn: AHashSet::new(),
            piles: AHashMap::new(),
            box_order,
            rng: ChaCha8Rng::seed_from_u64(0),
        }
    }

    /// Total cards in the deck, drawn or not
    pub fn size(&self) -> usize {
        self.cards.len()
    }

    /// Cards still available to draw
    pub fn available(&self) -> usize {
        self.draw_order.len()
    }

    pub fn is_drawn(&self, id: CardId) -> bool {
        self.drawn.contains(&id)
    }

    pub fn card(&self, id: CardId) -> Option<&Card> {
        self.cards.get(&id)
    }

    /// Cards currently sitting on a pile, in the order they were dealt
    pub fn pile(&self, pile: &PileId) -> &[CardId] {
        self.piles.get(pile).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Take `n` cards off the top. Returns None (and draws nothing) when fewer
    /// than `n` remain.
    pub fn draw(&mut self, n: usize) -> Option<Vec<Card>> {
        if n > self.draw_order.len() {
            return None;
        }
        let mut taken = Vec::with_capacity(n);
        for _ in 0..n {
            let id = self.draw_order.pop()?;
            self.drawn.insert(id);
            taken.push(self.cards.get(&id)?.clone());
        }
        Some(taken)
    }

    /// Draw `n` cards and place them on `pile`
    pub fn deal_to(&mut self, pile: &PileId, n: usize) -> Option<Vec<Card>> {
        let cards = self.draw(n)?;
        self.piles
            .entry(pile.clone())
            .or_default()
            .extend(cards.iter().map(|c| c.id));
        Some(cards)
    }

    /// Recall every card and shuffle
    pub fn reset(&mut self) {
        self.drawn.clear();
        self.piles.clear();
        self.draw_order = self.box_order.clone();
        self.shuffle();
    }

    fn shuffle(&mut self) {
        self.draw_order.shuffle(&mut self.rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::card::Suit;

    fn three_cards() -> Vec<Card> {
        vec![
            Card::ranked(10, Suit::Hearts),
            Card::ranked(4, Suit::Clubs),
            Card::joker(true),
        ]
    }

    #[test]
    fn test_stacked_deals_in_order() {
        let cards = three_cards();
        let mut deck = ActionDeck::stacked(cards.clone());
        let drawn = deck.draw(2).unwrap();
        assert_eq!(drawn[0].id, cards[0].id);
        assert_eq!(drawn[1].id, cards[1].id);
        assert_eq!(deck.available(), 1);
    }

    #[test]
    fn test_draw_more_than_available_takes_nothing() {
        let mut deck = ActionDeck::stacked(three_cards());
        assert!(deck.draw(4).is_none());
        assert_eq!(deck.available(), 3);
    }

    #[test]
    fn test_drawn_card_not_redrawn_until_reset() {
        let mut deck = ActionDeck::standard(7);
        let first = deck.draw(54).unwrap();
        let unique: AHashSet<CardId> = first.iter().map(|c| c.id).collect();
        assert_eq!(unique.len(), 54);
        assert!(deck.draw(1).is_none());

        deck.reset();
        assert_eq!(deck.available(), 54);
        assert!(!deck.is_drawn(first[0].id));
    }

    #[test]
    fn test_deal_to_fills_pile_and_reset_clears_it() {
        let mut deck = ActionDeck::standard(3);
        let pile = PileId::new("discard");
        let dealt = deck.deal_to(&pile, 2).unwrap();
        assert_eq!(deck.pile(&pile), &[dealt[0].id, dealt[1].id]);

        deck.reset();
        assert!(deck.pile(&pile).is_empty());
    }

    #[test]
    fn test_same_seed_same_order() {
        let cards = standard_action_deck();
        let mut a = ActionDeck::shuffled(cards.clone(), 42);
        let mut b = ActionDeck::shuffled(cards, 42);
        let a_ids: Vec<_> = a.draw(10).unwrap().into_iter().map(|c| c.id).collect();
        let b_ids: Vec<_> = b.draw(10).unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(a_ids, b_ids);
    }
}
