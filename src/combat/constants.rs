//! Initiative constants - all tunable values in one place

// Draw counts
pub const STANDARD_DRAW: usize = 1;
pub const HESITANT_DRAW: usize = 2;
pub const LEVEL_HEADED_DRAW: usize = 2;
pub const IMPROVED_LEVEL_HEADED_DRAW: usize = 3;

/// Quick lets a combatant redraw a card of this value or lower
pub const QUICK_REDRAW_THRESHOLD: u8 = 5;

/// Suit offset between a group leader and each follower (leader - step * n)
pub const GROUP_SUIT_STEP: f64 = 0.01;

/// Suit offset used when a held combatant cuts in before/after someone
pub const INTERRUPT_SUIT_STEP: f64 = 0.01;

// Edge identifiers as the host's items carry them
pub const SWID_QUICK: &str = "quick";
pub const SWID_LEVEL_HEADED: &str = "level-headed";
pub const SWID_IMPROVED_LEVEL_HEADED: &str = "improved-level-headed";
pub const SWID_HESITANT: &str = "hesitant";
