//! Turn-order sort
//!
//! Higher cards act first. The comparator is a strict total order: two
//! distinct combatants never compare equal, so repeated sorts are stable
//! regardless of input order.

use crate::combat::combatant::Combatant;
use crate::core::types::Round;
use ordered_float::OrderedFloat;
use std::cmp::Ordering;

/// Compare two combatants for turn order in `round` (Less = acts earlier)
pub fn compare_turn_order(a: &Combatant, b: &Combatant, round: Round) -> Ordering {
    // Stale holds surface at the top so the GM can let them act
    match (a.is_stale_hold(round), b.is_stale_hold(round)) {
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        (true, true) => {
            return a
                .round_held
                .cmp(&b.round_held)
                .then_with(|| a.id.cmp(&b.id));
        }
        (false, false) => {}
    }

    match (a.initiative(), b.initiative()) {
        (Some((a_card, a_suit)), Some((b_card, b_suit))) => b_card
            .cmp(&a_card)
            .then_with(|| OrderedFloat(b_suit).cmp(&OrderedFloat(a_suit)))
            .then_with(|| by_name_then_id(a, b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => by_name_then_id(a, b),
    }
}

fn by_name_then_id(a: &Combatant, b: &Combatant) -> Ordering {
    a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id))
}

/// Sort combatants in place into turn order
pub fn sort_turn_order(combatants: &mut [Combatant], round: Round) {
    combatants.sort_by(|a, b| compare_turn_order(a, b, round));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::CombatantId;

    fn carded(name: &str, id: u128, card: u8, suit: f64) -> Combatant {
        let mut c = Combatant::with_id(CombatantId::from_u128(id), name, None);
        c.card_value = Some(card);
        c.suit_value = Some(suit);
        c
    }

    fn names(combatants: &[Combatant]) -> Vec<&str> {
        combatants.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_card_then_suit_descending() {
        let mut list = vec![
            carded("X", 1, 10, 3.0),
            carded("Y", 2, 10, 1.0),
            carded("Z", 3, 13, 0.0),
        ];
        sort_turn_order(&mut list, 1);
        assert_eq!(names(&list), vec!["Z", "X", "Y"]);
    }

    #[test]
    fn test_carded_before_uncarded() {
        let mut list = vec![
            Combatant::with_id(CombatantId::from_u128(1), "Aaron", None),
            carded("Zed", 2, 2, 1.0),
        ];
        sort_turn_order(&mut list, 1);
        assert_eq!(names(&list), vec!["Zed", "Aaron"]);
    }

    #[test]
    fn test_uncarded_by_name_then_id() {
        let mut list = vec![
            Combatant::with_id(CombatantId::from_u128(9), "Bandit", None),
            Combatant::with_id(CombatantId::from_u128(3), "Bandit", None),
            Combatant::with_id(CombatantId::from_u128(5), "Archer", None),
        ];
        sort_turn_order(&mut list, 0);
        let ids: Vec<u128> = list.iter().map(|c| c.id.0.as_u128()).collect();
        assert_eq!(ids, vec![5, 3, 9]);
    }

    #[test]
    fn test_stale_hold_first_and_ordered_by_round() {
        let mut late = carded("Late", 1, 3, 1.0);
        late.round_held = Some(2);
        let mut early = carded("Early", 2, 2, 1.0);
        early.round_held = Some(1);
        let mut fresh = carded("Fresh", 3, 14, 4.0);
        fresh.round_held = Some(3);

        let mut list = vec![carded("Ace", 4, 15, 2.0), late, fresh, early];
        sort_turn_order(&mut list, 3);
        // A hold from the current round is not stale and sorts by card
        assert_eq!(names(&list), vec!["Early", "Late", "Ace", "Fresh"]);
    }

    #[test]
    fn test_distinct_combatants_never_equal() {
        let a = carded("Twin", 1, 7, 2.0);
        let b = carded("Twin", 2, 7, 2.0);
        assert_ne!(compare_turn_order(&a, &b, 1), Ordering::Equal);
        assert_eq!(
            compare_turn_order(&a, &b, 1),
            compare_turn_order(&b, &a, 1).reverse()
        );
    }

    #[test]
    fn test_follower_offset_sorts_after_leader() {
        let leader = carded("Leader", 9, 9, 2.0);
        let follower = carded("Aardvark", 1, 9, 1.99);
        assert_eq!(compare_turn_order(&leader, &follower, 1), Ordering::Less);
    }
}
