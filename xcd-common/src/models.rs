//! Timing feed and roster models shared by live scoring and historical import

use serde::{Deserialize, Serialize};

/// Time string reported for an athlete who has not finished yet
pub const IN_PROGRESS: &str = "In Progress";

/// Athlete gender as recorded on rosters and timing feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Gender {
    /// Parse the loose gender markers found in feeds and roster imports.
    ///
    /// Anything unrecognised is treated as unknown (`None`).
    pub fn parse(value: &str) -> Option<Gender> {
        match value.trim().to_lowercase().as_str() {
            "m" | "male" | "men" | "man" | "boys" => Some(Gender::Male),
            "f" | "w" | "female" | "women" | "woman" | "girls" => Some(Gender::Female),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
        }
    }

    /// Two genders are compatible unless both are known and differ
    pub fn compatible(a: Option<Gender>, b: Option<Gender>) -> bool {
        match (a, b) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }
}

/// One intermediate split reported for an entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitMark {
    /// Opaque ordered label ("Split 1", "Split 2", ...)
    pub label: String,
    /// Cumulative time at this split
    pub time: String,
    pub place: Option<u32>,
}

/// One athlete's reported state in a timing feed or a scraped results table
///
/// Rebuilt wholesale on every fetch; carries no identity across fetches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingEntry {
    pub place: Option<u32>,
    pub name: String,
    pub school: String,
    /// Formatted mark (`M:SS.s`) or [`IN_PROGRESS`]
    pub time: String,
    pub gender: Option<Gender>,
    /// Free-text race/event name, used to separate concurrent races
    pub event_label: String,
    /// Splits in lap order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub splits: Vec<SplitMark>,
}

impl TimingEntry {
    /// Look up a split by label
    pub fn split(&self, label: &str) -> Option<&SplitMark> {
        self.splits.iter().find(|s| s.label == label)
    }
}

/// One drafted athlete on a team roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterAthlete {
    pub id: i64,
    pub name: String,
    pub school: String,
    pub gender: Option<Gender>,
}

/// A draft team with the roster captured at session start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftTeam {
    pub team_id: i64,
    pub team_name: String,
    pub roster: Vec<RosterAthlete>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_parse_markers() {
        assert_eq!(Gender::parse("M"), Some(Gender::Male));
        assert_eq!(Gender::parse(" f "), Some(Gender::Female));
        assert_eq!(Gender::parse("Women"), Some(Gender::Female));
        assert_eq!(Gender::parse(""), None);
        assert_eq!(Gender::parse("X"), None);
    }

    #[test]
    fn test_gender_compatible_with_unknown() {
        assert!(Gender::compatible(None, Some(Gender::Male)));
        assert!(Gender::compatible(Some(Gender::Female), None));
        assert!(Gender::compatible(Some(Gender::Male), Some(Gender::Male)));
        assert!(!Gender::compatible(Some(Gender::Male), Some(Gender::Female)));
    }

    #[test]
    fn test_entry_serializes_camel_case() {
        let entry = TimingEntry {
            place: Some(3),
            name: "Colin Sahlman".to_string(),
            school: "Northern Arizona".to_string(),
            time: "23:01.4".to_string(),
            gender: Some(Gender::Male),
            event_label: "Men 8000m".to_string(),
            splits: Vec::new(),
        };

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["eventLabel"], "Men 8000m");
        assert_eq!(json["gender"], "M");
        assert!(json.get("splits").is_none());
    }

    #[test]
    fn test_split_lookup_by_label() {
        let entry = TimingEntry {
            place: None,
            name: "A B".to_string(),
            school: "C".to_string(),
            time: IN_PROGRESS.to_string(),
            gender: None,
            event_label: String::new(),
            splits: vec![
                SplitMark {
                    label: "Split 1".to_string(),
                    time: "3:01.0".to_string(),
                    place: Some(4),
                },
                SplitMark { label: "Split 2".to_string(), time: "6:05.2".to_string(), place: None },
            ],
        };

        assert_eq!(entry.split("Split 2").map(|s| s.time.as_str()), Some("6:05.2"));
        assert!(entry.split("Split 3").is_none());
    }
}
