//! PTTiming live results client
//!
//! PTTiming's public live pages (`...pttiming.com/...?mid=12345`) are backed
//! by a Firebase JSON document per meet. The document is loosely typed:
//! collections appear either as objects keyed by id or as arrays with null
//! holes, places may be numbers or numeric strings, and most fields are
//! optional. Parsing degrades missing or malformed fields instead of failing.
//!
//! Layout consumed here:
//!
//! ```text
//! { "Meta": { "name": meet name },
//!   "MeetEvents": { <event key>: {
//!       "E":  { "N": event name },
//!       "ED": { <entry key>: {
//!           "A":   { "N" | "FN"+"LN", "S", "T", "G" },
//!           "P":   place, "M" | "FT": mark, "TN": team name,
//!           "SPD": [ { "L": lap, "CS": cumulative time, "P": place } ] } } } } }
//! ```

use super::{FeedError, FeedSource, RaceFeed};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::time::Duration;
use tracing::{debug, info, warn};
use xcd_common::models::{Gender, SplitMark, TimingEntry, IN_PROGRESS};

const USER_AGENT: &str = concat!("xcdraft/", env!("CARGO_PKG_VERSION"));

/// Title used when the feed names neither the meet nor any event
pub const DEFAULT_RACE_TITLE: &str = "Live Race Results";

/// Extract the meet id from a PTTiming live results URL
///
/// # Examples
///
/// ```
/// use xcd_live::feed::pttiming::extract_meet_id;
///
/// assert_eq!(
///     extract_meet_id("https://live.pttiming.com/results.html?mid=8123&r=2"),
///     Some("8123")
/// );
/// assert_eq!(extract_meet_id("https://live.pttiming.com/results.html"), None);
/// assert_eq!(extract_meet_id("https://example.com/?mid=8123"), None);
/// ```
pub fn extract_meet_id(url: &str) -> Option<&str> {
    if !url.contains("pttiming.com") {
        return None;
    }
    url.match_indices("mid=").find_map(|(index, pattern)| {
        let rest = &url[index + pattern.len()..];
        let end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if end > 0 {
            Some(&rest[..end])
        } else {
            None
        }
    })
}

/// HTTP client for PTTiming meet documents
pub struct PtTimingClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl PtTimingClient {
    /// Create a client reading meet documents from `base_url`
    ///
    /// `timeout` bounds each request end to end.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FeedError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// JSON document URL for a meet
    pub fn meet_data_url(&self, meet_id: &str) -> String {
        format!("{}/{}.json", self.base_url, meet_id)
    }
}

#[async_trait]
impl FeedSource for PtTimingClient {
    fn validate_url(&self, url: &str) -> Result<(), FeedError> {
        extract_meet_id(url)
            .map(|_| ())
            .ok_or_else(|| FeedError::InvalidUrl(url.to_string()))
    }

    async fn fetch(&self, url: &str) -> Result<RaceFeed, FeedError> {
        let meet_id = extract_meet_id(url).ok_or_else(|| FeedError::InvalidUrl(url.to_string()))?;
        let data_url = self.meet_data_url(meet_id);
        debug!(meet_id = %meet_id, url = %data_url, "Fetching meet data");

        let response = self.http_client.get(&data_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        let document: Value = response.json().await?;
        let feed = parse_meet(&document)?;

        info!(
            meet_id = %meet_id,
            entries = feed.entries.len(),
            title = %feed.race_title,
            "Parsed meet data"
        );
        Ok(feed)
    }
}

/// Parse a meet document into a feed snapshot.
///
/// Entries are grouped by event key; within an event, placed entries come
/// first in ascending place order and unplaced entries keep feed order.
pub fn parse_meet(document: &Value) -> Result<RaceFeed, FeedError> {
    let root = document
        .as_object()
        .ok_or_else(|| FeedError::Parse("meet document is not an object".to_string()))?;

    let meet_name = root
        .get("Meta")
        .and_then(|meta| meta.get("name"))
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or("");

    let mut entries = Vec::new();
    let mut event_names = Vec::new();

    for (event_key, event) in keyed_children(root.get("MeetEvents")) {
        let Some(event_data) = event.get("ED") else {
            continue;
        };

        let event_name = text(event.get("E").and_then(|e| e.get("N"))).unwrap_or_default();
        if !event_name.is_empty() {
            event_names.push(event_name.clone());
        }

        let mut event_entries: Vec<TimingEntry> = keyed_children(Some(event_data))
            .into_iter()
            .filter_map(|(_, entry)| parse_entry(entry, &event_name))
            .collect();
        event_entries.sort_by_key(|entry| (entry.place.is_none(), entry.place));

        debug!(
            event_key = %event_key,
            event = %event_name,
            entries = event_entries.len(),
            "Parsed event"
        );
        entries.extend(event_entries);
    }

    if entries.is_empty() {
        warn!("No results found in meet data");
        return Ok(RaceFeed::empty(DEFAULT_RACE_TITLE));
    }

    let race_title = match (meet_name.is_empty(), event_names.is_empty()) {
        (false, false) => format!("{} - {}", meet_name, event_names.join(" & ")),
        (true, false) => event_names.join(" & "),
        (false, true) => meet_name.to_string(),
        (true, true) => DEFAULT_RACE_TITLE.to_string(),
    };

    Ok(RaceFeed {
        race_title,
        entries,
    })
}

fn parse_entry(entry: &Value, event_label: &str) -> Option<TimingEntry> {
    let athlete = entry.get("A")?;
    if !athlete.is_object() {
        return None;
    }

    let name = text(athlete.get("N")).unwrap_or_else(|| {
        let first = text(athlete.get("FN")).unwrap_or_default();
        let last = text(athlete.get("LN")).unwrap_or_default();
        format!("{} {}", first, last).trim().to_string()
    });
    if name.is_empty() {
        return None;
    }

    let time = text(entry.get("M"))
        .or_else(|| text(entry.get("FT")))
        .unwrap_or_else(|| IN_PROGRESS.to_string());
    let school = text(entry.get("TN"))
        .or_else(|| text(athlete.get("S")))
        .or_else(|| text(athlete.get("T")))
        .unwrap_or_default();

    Some(TimingEntry {
        place: place(entry.get("P")),
        name,
        school,
        time,
        gender: text(athlete.get("G")).as_deref().and_then(Gender::parse),
        event_label: event_label.to_string(),
        splits: parse_splits(entry.get("SPD")),
    })
}

/// Splits in lap order; only laps with a cumulative time count
fn parse_splits(split_data: Option<&Value>) -> Vec<SplitMark> {
    let Some(laps) = split_data.and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut splits: Vec<SplitMark> = Vec::new();
    for (index, lap) in laps.iter().enumerate() {
        let Some(time) = text(lap.get("CS")) else {
            continue;
        };
        let lap_number = text(lap.get("L"))
            .filter(|l| l != "0")
            .unwrap_or_else(|| (index + 1).to_string());

        let mark = SplitMark {
            label: format!("Split {}", lap_number),
            time,
            place: place(lap.get("P")),
        };
        match splits.iter_mut().find(|s| s.label == mark.label) {
            Some(existing) => *existing = mark,
            None => splits.push(mark),
        }
    }
    splits
}

/// Children of an object-or-array collection, ordered by key
fn keyed_children(collection: Option<&Value>) -> Vec<(String, &Value)> {
    let mut children: Vec<(String, &Value)> = match collection {
        Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => Vec::new(),
    };
    children.retain(|(_, v)| v.is_object());
    children.sort_by(|a, b| compare_keys(&a.0, &b.0));
    children
}

/// Integer-like keys first in numeric order, then the rest lexically
fn compare_keys(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Non-empty string (trimmed) or number rendered as text
fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Places above this are feed garbage and treated as unplaced
const MAX_PLACE: u32 = 100_000;

/// Positive place from a number or a string with leading digits; 0 means unplaced
fn place(value: Option<&Value>) -> Option<u32> {
    let parsed = match value? {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f as u64))?,
        Value::String(s) => {
            let s = s.trim();
            let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
            s[..end].parse::<u64>().ok()?
        }
        _ => return None,
    };
    u32::try_from(parsed)
        .ok()
        .filter(|p| (1..=MAX_PLACE).contains(p))
}
