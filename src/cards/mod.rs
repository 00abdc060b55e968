pub mod card;
pub mod deck;

pub use card::{standard_action_deck, Card, Suit, ACE_VALUE, JOKER_VALUE};
pub use deck::ActionDeck;
