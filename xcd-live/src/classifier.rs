//! Race classification for multi-race feeds
//!
//! A meet feed usually carries the men's and women's championship races side
//! by side. A draft is (almost always) single-gender, so entries are filtered
//! to the distances that gender runs before any matching happens. This keeps
//! a men's roster from binding to a same-named runner in the women's race.

use xcd_common::{DraftTeam, Gender, TimingEntry};

/// Share of gendered roster athletes needed to call a draft single-gender
pub const GENDER_MAJORITY_THRESHOLD: f64 = 0.8;

const MEN_DISTANCE_MARKERS: [&str; 4] = ["8000", "10000", "8k", "10k"];
const WOMEN_DISTANCE_MARKERS: [&str; 4] = ["5000", "6000", "5k", "6k"];

/// Gender of a draft: strictly more than 80% of athletes with known gender.
///
/// Mixed drafts and drafts with no gender data return `None`.
pub fn draft_gender(teams: &[DraftTeam]) -> Option<Gender> {
    let (mut men, mut women) = (0usize, 0usize);
    for athlete in teams.iter().flat_map(|team| team.roster.iter()) {
        match athlete.gender {
            Some(Gender::Male) => men += 1,
            Some(Gender::Female) => women += 1,
            None => {}
        }
    }

    let total = men + women;
    if total == 0 {
        return None;
    }
    if men as f64 / total as f64 > GENDER_MAJORITY_THRESHOLD {
        Some(Gender::Male)
    } else if women as f64 / total as f64 > GENDER_MAJORITY_THRESHOLD {
        Some(Gender::Female)
    } else {
        None
    }
}

/// Whether an event label names a distance run by `gender`
pub fn event_matches_gender(event_label: &str, gender: Gender) -> bool {
    let label = event_label.to_lowercase();
    let markers = match gender {
        Gender::Male => &MEN_DISTANCE_MARKERS,
        Gender::Female => &WOMEN_DISTANCE_MARKERS,
    };
    markers.iter().any(|marker| label.contains(marker))
}

/// Entries eligible for matching against a draft of the given gender.
///
/// With no target gender every entry is kept. Feed order is preserved.
pub fn classify_feed_for_draft(
    entries: &[TimingEntry],
    gender: Option<Gender>,
) -> Vec<&TimingEntry> {
    match gender {
        Some(gender) => entries
            .iter()
            .filter(|entry| event_matches_gender(&entry.event_label, gender))
            .collect(),
        None => entries.iter().collect(),
    }
}

/// Event a team mostly ran in.
///
/// Majority vote over the matched runners' event labels, ties going to the
/// label seen first. Falls back to the first eligible entry's label.
pub fn primary_event(matched: &[&TimingEntry], eligible: &[&TimingEntry]) -> Option<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for entry in matched {
        match counts.iter_mut().find(|(label, _)| *label == entry.event_label) {
            Some((_, count)) => *count += 1,
            None => counts.push((entry.event_label.as_str(), 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (label, count) in counts {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((label, count));
        }
    }

    best.map(|(label, _)| label.to_string())
        .or_else(|| eligible.first().map(|entry| entry.event_label.clone()))
}

/// Split labels a team can be scored on, ordered by lap number.
///
/// Taken from matched runners in the primary event; when nothing matched,
/// from any eligible entry in the primary event.
pub fn available_splits(
    matched: &[&TimingEntry],
    eligible: &[&TimingEntry],
    primary_event: Option<&str>,
) -> Vec<String> {
    let Some(primary_event) = primary_event else {
        return Vec::new();
    };
    let source = if matched.is_empty() { eligible } else { matched };

    let mut labels: Vec<String> = Vec::new();
    for entry in source.iter().filter(|e| e.event_label == primary_event) {
        for split in &entry.splits {
            if !labels.contains(&split.label) {
                labels.push(split.label.clone());
            }
        }
    }
    sort_split_labels(&mut labels);
    labels
}

/// Order split labels by the number they contain (labels without one first)
pub fn sort_split_labels(labels: &mut [String]) {
    labels.sort_by_key(|label| split_number(label));
}

fn split_number(label: &str) -> u64 {
    label
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect::<String>()
        .parse()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use xcd_common::{RosterAthlete, SplitMark};

    fn team(genders: &[Option<Gender>]) -> DraftTeam {
        DraftTeam {
            team_id: 1,
            team_name: "Hawks".to_string(),
            roster: genders
                .iter()
                .enumerate()
                .map(|(i, gender)| RosterAthlete {
                    id: i as i64,
                    name: format!("Runner {}", i),
                    school: "Somewhere".to_string(),
                    gender: *gender,
                })
                .collect(),
        }
    }

    fn entry(event: &str, splits: &[&str]) -> TimingEntry {
        TimingEntry {
            place: Some(1),
            name: "A B".to_string(),
            school: "C".to_string(),
            time: "20:00.0".to_string(),
            gender: None,
            event_label: event.to_string(),
            splits: splits
                .iter()
                .map(|label| SplitMark {
                    label: label.to_string(),
                    time: "3:00.0".to_string(),
                    place: Some(1),
                })
                .collect(),
        }
    }

    #[test]
    fn test_draft_gender_threshold() {
        let mut genders = vec![Some(Gender::Male); 23];
        genders.extend(vec![Some(Gender::Female); 2]);
        // 92% male
        assert_eq!(draft_gender(&[team(&genders)]), Some(Gender::Male));

        // exactly 80% is not a majority
        let mut genders = vec![Some(Gender::Female); 8];
        genders.extend(vec![Some(Gender::Male); 2]);
        assert_eq!(draft_gender(&[team(&genders)]), None);

        // unknowns do not count
        let genders = vec![Some(Gender::Female), None, None, None];
        assert_eq!(draft_gender(&[team(&genders)]), Some(Gender::Female));

        assert_eq!(draft_gender(&[team(&[None, None])]), None);
        assert_eq!(draft_gender(&[]), None);
    }

    #[test]
    fn test_men_draft_excludes_women_distances() {
        let entries = vec![
            entry("Women 5000m", &[]),
            entry("Men 8000m Run CC", &[]),
            entry("Women 6K", &[]),
            entry("MEN 10K", &[]),
        ];

        let men: Vec<&str> = classify_feed_for_draft(&entries, Some(Gender::Male))
            .iter()
            .map(|e| e.event_label.as_str())
            .collect();
        assert_eq!(men, vec!["Men 8000m Run CC", "MEN 10K"]);

        let women = classify_feed_for_draft(&entries, Some(Gender::Female));
        assert_eq!(women.len(), 2);

        assert_eq!(classify_feed_for_draft(&entries, None).len(), 4);
    }

    #[test]
    fn test_primary_event_majority_and_fallback() {
        let a = entry("Men 8000m", &[]);
        let b = entry("Men 10000m", &[]);
        let c = entry("Men 10000m", &[]);

        assert_eq!(primary_event(&[&a, &b, &c], &[]), Some("Men 10000m".to_string()));
        // tie goes to first seen
        assert_eq!(primary_event(&[&a, &b], &[]), Some("Men 8000m".to_string()));
        assert_eq!(primary_event(&[], &[&b, &a]), Some("Men 10000m".to_string()));
        assert_eq!(primary_event(&[], &[]), None);
    }

    #[test]
    fn test_available_splits_sorted_numerically() {
        let a = entry("Men 10000m", &["Split 10", "Split 2"]);
        let b = entry("Men 10000m", &["Split 1", "Split 2"]);
        let other = entry("Men 8000m", &["Split 7"]);

        assert_eq!(
            available_splits(&[&a, &b, &other], &[], Some("Men 10000m")),
            vec!["Split 1", "Split 2", "Split 10"]
        );
        // no matched runners: any eligible entry in the primary event
        assert_eq!(
            available_splits(&[], &[&other, &a], Some("Men 8000m")),
            vec!["Split 7"]
        );
        assert!(available_splits(&[&a], &[], None).is_empty());
    }
}
