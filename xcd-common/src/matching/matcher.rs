//! Fuzzy binding of roster athletes to timing entries
//!
//! Timing feeds and scraped result tables carry free-text names and schools
//! with no stable identifiers. Matching is a yes/no predicate per candidate;
//! the first qualifying candidate in feed order wins. Candidates are not
//! ranked against each other, so two athletes sharing a surname and school
//! can be bound to the same entry.

use crate::matching::normalize::{normalize_name, normalize_school};
use crate::models::{Gender, RosterAthlete, TimingEntry};

/// Whether two free-text athlete names plausibly identify the same person.
///
/// Matches when the normalized forms are equal, when one contains the other,
/// or when the surnames (last tokens) agree and the first tokens share an
/// initial. Names that normalize to nothing never match.
pub fn names_match(a: &str, b: &str) -> bool {
    let n1 = normalize_name(a);
    let n2 = normalize_name(b);

    if n1.is_empty() || n2.is_empty() {
        return false;
    }
    if n1 == n2 || n1.contains(&n2) || n2.contains(&n1) {
        return true;
    }

    let parts1: Vec<&str> = n1.split(' ').collect();
    let parts2: Vec<&str> = n2.split(' ').collect();
    let same_surname = parts1.last() == parts2.last();
    let same_initial = match (parts1[0].chars().next(), parts2[0].chars().next()) {
        (Some(i1), Some(i2)) => i1 == i2,
        _ => false,
    };

    same_surname && same_initial
}

/// Whether two free-text school names plausibly identify the same school.
///
/// Matches when the normalized forms are equal, when one contains the other,
/// or when at least half of the smaller token set also appears in the other.
/// A missing school is contained in every school and therefore matches.
pub fn schools_match(a: &str, b: &str) -> bool {
    let s1 = normalize_school(a);
    let s2 = normalize_school(b);

    if s1 == s2 || s1.contains(&s2) || s2.contains(&s1) {
        return true;
    }

    let words1: Vec<&str> = s1.split_whitespace().collect();
    let words2: Vec<&str> = s2.split_whitespace().collect();
    let shared = words1.iter().filter(|w| words2.contains(w)).count();
    let smaller = words1.len().min(words2.len());

    shared as f64 >= smaller as f64 / 2.0
}

/// Whether one timing entry identifies one roster athlete
pub fn entry_matches(athlete: &RosterAthlete, entry: &TimingEntry) -> bool {
    names_match(&entry.name, &athlete.name)
        && schools_match(&entry.school, &athlete.school)
        && Gender::compatible(entry.gender, athlete.gender)
}

/// First candidate (in feed order) that identifies `athlete`, if any
pub fn find_match<'a, I>(athlete: &RosterAthlete, candidates: I) -> Option<&'a TimingEntry>
where
    I: IntoIterator<Item = &'a TimingEntry>,
{
    candidates
        .into_iter()
        .find(|entry| entry_matches(athlete, entry))
}

/// Link a scraped historical result row to an existing athlete record.
///
/// Uses the same rules as live scoring; returns the id of the first known
/// athlete the row identifies.
pub fn resolve_athlete(entry: &TimingEntry, known: &[RosterAthlete]) -> Option<i64> {
    known
        .iter()
        .find(|athlete| entry_matches(athlete, entry))
        .map(|athlete| athlete.id)
}
