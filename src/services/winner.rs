//! Winner resolution — pure majority computation over the final board.
//!
//! DESIGN
//! ======
//! Count owned cells per player id; the unique maximum wins. Ties and
//! all-unclaimed boards have no winner. A claimant id with no roster
//! entry also yields no winner: the engine never validated claim ids,
//! so a board can legitimately reference unknown players.

use std::collections::HashMap;

use uuid::Uuid;

use crate::state::Player;

/// Resolve the outcome of a finished board. Deterministic and pure.
#[must_use]
pub fn resolve(board: &[Option<Uuid>], players: &[Player]) -> Option<Player> {
    let mut counts: HashMap<Uuid, usize> = HashMap::new();
    for owner in board.iter().flatten() {
        *counts.entry(*owner).or_default() += 1;
    }

    let max = counts.values().copied().max()?;
    let mut leaders = counts.iter().filter(|(_, count)| **count == max).map(|(id, _)| *id);
    let leader = leaders.next()?;
    if leaders.next().is_some() {
        return None;
    }

    players.iter().find(|p| p.id == leader).cloned()
}

#[cfg(test)]
#[path = "winner_test.rs"]
mod tests;
