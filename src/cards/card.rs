//! Action cards
//!
//! A standard action deck is 52 ranked cards plus two Jokers. Cards are
//! immutable values; the deck only tracks which ones have been dealt.

use crate::core::types::CardId;
use serde::{Deserialize, Serialize};

/// Value of the lowest ranked card (Two)
pub const LOWEST_VALUE: u8 = 2;

/// Value of the highest ranked card (Ace)
pub const ACE_VALUE: u8 = 14;

/// Jokers beat every ranked card
pub const JOKER_VALUE: u8 = 15;

/// Card suits in tie-break order (Clubs lowest, Spades highest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Suit {
    Clubs = 1,
    Diamonds = 2,
    Hearts = 3,
    Spades = 4,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades];

    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn symbol(self) -> char {
        match self {
            Suit::Clubs => '♣',
            Suit::Diamonds => '♦',
            Suit::Hearts => '♥',
            Suit::Spades => '♠',
        }
    }
}

/// A single action card
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub name: String,
    /// Rank value: 2..=14 for ranked cards, `JOKER_VALUE` for Jokers
    pub value: u8,
    /// Tie-break value, higher wins
    pub suit: u8,
    pub is_joker: bool,
}

impl Card {
    /// A ranked card
    pub fn ranked(value: u8, suit: Suit) -> Self {
        Self {
            id: CardId::new(),
            name: format!("{}{}", rank_label(value), suit.symbol()),
            value,
            suit: suit.value(),
            is_joker: false,
        }
    }

    /// One of the two Jokers (red outranks black on suit)
    pub fn joker(red: bool) -> Self {
        Self {
            id: CardId::new(),
            name: if red { "Red Joker" } else { "Black Joker" }.to_string(),
            value: JOKER_VALUE,
            suit: if red { 2 } else { 1 },
            is_joker: true,
        }
    }

    /// Builder for hand-made cards (fixtures, custom decks)
    pub fn custom(name: impl Into<String>, value: u8, suit: u8, is_joker: bool) -> Self {
        Self {
            id: CardId::new(),
            name: name.into(),
            value,
            suit,
            is_joker,
        }
    }

    /// Better card by rank, then suit
    pub fn beats(&self, other: &Card) -> bool {
        (self.value, self.suit) > (other.value, other.suit)
    }
}

/// Short rank label used in card names
pub fn rank_label(value: u8) -> String {
    match value {
        11 => "J".to_string(),
        12 => "Q".to_string(),
        13 => "K".to_string(),
        14 => "A".to_string(),
        v => v.to_string(),
    }
}

/// The standard 54-card action deck in fresh-box order
pub fn standard_action_deck() -> Vec<Card> {
    let mut cards = Vec::with_capacity(54);
    for suit in Suit::ALL {
        for value in LOWEST_VALUE..=ACE_VALUE {
            cards.push(Card::ranked(value, suit));
        }
    }
    cards.push(Card::joker(false));
    cards.push(Card::joker(true));
    cards
}
