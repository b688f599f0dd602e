//! Run identifiers: human-pronounceable word triples with a random suffix
//!
//! Shape: `<adjective>-<adjective>-<noun>-<6 hex digits>`, e.g.
//! `quiet-amber-falcon-3f9c0a`. The space holds 64³ × 2²⁴ ≈ 4.4e12
//! identifiers, so ten thousand draws collide with probability around 1e-5
//! (birthday bound), and the registry's primary key catches the rest.

use rand::seq::SliceRandom;
use rand::Rng;

/// Adjectives for the first two words.
pub const ADJECTIVES: [&str; 64] = [
    "amber", "ancient", "autumn", "bold", "brave", "bright", "calm", "clever", "cold", "cosmic",
    "crimson", "curly", "damp", "dark", "dawn", "delicate", "eager", "early", "fancy", "fierce",
    "frosty", "gentle", "golden", "green", "hidden", "hollow", "icy", "jolly", "keen", "late",
    "lively", "lucky", "misty", "modest", "noble", "odd", "old", "pale", "patient", "polished",
    "proud", "purple", "quick", "quiet", "rapid", "rough", "rustic", "shiny", "silent", "silver",
    "sleepy", "small", "snowy", "solid", "spring", "steady", "still", "sunny", "swift", "tidy",
    "twilight", "velvet", "wandering", "wild",
];

/// Nouns for the third word.
pub const NOUNS: [&str; 64] = [
    "badger", "bird", "breeze", "brook", "butterfly", "canyon", "cedar", "cloud", "comet", "coral",
    "crane", "creek", "dew", "dove", "dune", "eagle", "ember", "falcon", "fern", "field", "firefly",
    "flower", "fog", "forest", "fox", "frog", "glade", "glacier", "harbor", "hawk", "heron",
    "hill", "island", "lake", "leaf", "lichen", "meadow", "moon", "moss", "mountain", "night",
    "oak", "otter", "owl", "pebble", "pine", "pond", "rain", "reef", "river", "salmon", "sea",
    "shadow", "sky", "snow", "sparrow", "star", "stone", "sun", "thunder", "tide", "violet",
    "water", "wolf",
];

const SUFFIX_SPACE: u32 = 1 << 24;

/// Generator of unique, human-readable run identifiers.
///
/// Stateless apart from the thread-local RNG it draws from.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdGenerator;

impl IdGenerator {
    /// Create a generator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Draw a fresh run identifier.
    #[must_use]
    pub fn generate(&self) -> String {
        let mut rng = rand::thread_rng();
        let first = ADJECTIVES.choose(&mut rng).copied().unwrap_or("plain");
        let second = ADJECTIVES.choose(&mut rng).copied().unwrap_or("plain");
        let noun = NOUNS.choose(&mut rng).copied().unwrap_or("run");
        let suffix: u32 = rng.gen_range(0..SUFFIX_SPACE);
        format!("{first}-{second}-{noun}-{suffix:06x}")
    }
}

/// Draw a fresh run identifier with the default generator.
#[must_use]
pub fn generate_run_id() -> String {
    IdGenerator::new().generate()
}
