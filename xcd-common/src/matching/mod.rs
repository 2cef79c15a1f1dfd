//! Fuzzy athlete matching
//!
//! Shared by live race scoring and historical results import.

pub mod matcher;
pub mod normalize;

pub use matcher::{entry_matches, find_match, names_match, resolve_athlete, schools_match};
pub use normalize::{normalize_name, normalize_school};
