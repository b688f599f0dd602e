//! Identity Generator tests

use runlog::identity::{ADJECTIVES, NOUNS};
use runlog::{generate_run_id, IdGenerator};
use std::collections::HashSet;

#[test]
fn test_ten_thousand_ids_are_distinct() {
    let generator = IdGenerator::new();
    let ids: HashSet<String> = (0..10_000).map(|_| generator.generate()).collect();
    assert_eq!(ids.len(), 10_000);
}

#[test]
fn test_id_is_built_from_word_lists() {
    for _ in 0..100 {
        let id = generate_run_id();
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 4, "{id}");
        assert!(ADJECTIVES.contains(&parts[0]));
        assert!(ADJECTIVES.contains(&parts[1]));
        assert!(NOUNS.contains(&parts[2]));
        assert_eq!(parts[3].len(), 6);
        assert!(parts[3].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}

#[test]
fn test_ids_are_filename_safe() {
    let id = generate_run_id();
    assert!(id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
}
