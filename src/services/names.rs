//! Display-name generation.
//!
//! Players never pick their own names: the server assigns one at
//! admission, adjective-animal pairs drawn from fixed word lists.

use rand::Rng;
use rand::seq::IndexedRandom;

const ADJECTIVES: [&str; 16] = [
    "Brisk", "Clever", "Daring", "Eager", "Fierce", "Gentle", "Hasty", "Keen", "Lucky", "Mellow",
    "Nimble", "Plucky", "Quiet", "Rapid", "Sly", "Witty",
];

const ANIMALS: [&str; 16] = [
    "Badger", "Crane", "Dingo", "Falcon", "Gecko", "Heron", "Ibex", "Jackal", "Lynx", "Marmot",
    "Otter", "Puffin", "Raven", "Stoat", "Tapir", "Wombat",
];

/// Generate a display name from the thread-local RNG.
#[must_use]
pub fn display_name() -> String {
    display_name_with(&mut rand::rng())
}

/// Generate a display name from a caller-supplied RNG.
pub fn display_name_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    let adjective = ADJECTIVES.choose(rng).copied().unwrap_or("Anonymous");
    let animal = ANIMALS.choose(rng).copied().unwrap_or("Player");
    format!("{adjective} {animal}")
}

#[cfg(test)]
#[path = "names_test.rs"]
mod tests;
