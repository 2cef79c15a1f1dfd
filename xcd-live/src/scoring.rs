//! Cross-country team scoring
//!
//! Standard dual/invitational scoring applied to fantasy rosters:
//!
//! - A team scores when at least five of its athletes have a place at the
//!   scope being scored (the finish or one intermediate split).
//! - The five best places are summed; lowest total wins.
//! - The 6th and 7th runners are displacers: they do not score but are
//!   reported, along with the 1-5 and 1-7 spreads.
//! - Fewer than five placed runners is a DNF with no score.
//!
//! Places are the athletes' places in the whole race, not re-ranked among
//! drafted runners. Scoring is a pure function of roster and feed, so
//! re-scoring the same snapshot yields the same standings.

use crate::classifier::{
    available_splits, classify_feed_for_draft, draft_gender, primary_event, sort_split_labels,
};
use crate::feed::RaceFeed;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use xcd_common::matching::entry_matches;
use xcd_common::race_time::mean_race_time;
use xcd_common::{DraftTeam, RosterAthlete, SplitMark, TimingEntry};

/// Runners whose places are summed
pub const SCORING_RUNNERS: usize = 5;
/// Non-scoring runners reported after the scorers
pub const MAX_DISPLACERS: usize = 2;

/// Scope a standing is computed for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    Finish,
    Split(&'a str),
}

/// Whether a team produced a score at a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StandingStatus {
    Scored,
    Dnf,
}

/// A roster athlete bound to a timing entry at one scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedRunner {
    pub athlete_name: String,
    pub school: String,
    pub place: u32,
    pub time: String,
    pub event_label: String,
    /// Splits carried through from the entry; finish scope only
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub splits: Vec<SplitMark>,
}

/// Scored state of one team at one scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamStanding {
    pub status: StandingStatus,
    pub score: Option<u64>,
    /// Best five (or every placed runner when DNF), ascending by place
    pub scoring_runners: Vec<MatchedRunner>,
    pub displacers: Vec<MatchedRunner>,
    pub gap1to5: Option<u32>,
    pub gap1to7: Option<u32>,
    pub avg_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Standing at one intermediate split
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitStanding {
    pub label: String,
    #[serde(flatten)]
    pub standing: TeamStanding,
}

/// Standings at the finish and at every split the team has data for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllScopes {
    pub finish: TeamStanding,
    pub splits: Vec<SplitStanding>,
}

/// One team's entry in a race snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamResult {
    pub team_id: i64,
    pub team_name: String,
    #[serde(flatten)]
    pub finish: TeamStanding,
    /// Runners with a finish place
    pub total_finishers: usize,
    pub primary_event: Option<String>,
    pub available_splits: Vec<String>,
    pub split_scores: Vec<SplitStanding>,
}

/// Output of one scoring cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceSnapshot {
    pub race_title: String,
    /// Entries in the raw feed, before gender filtering
    pub total_results: usize,
    /// Ranked: ascending score, DNF teams last
    pub team_scores: Vec<TeamResult>,
    pub last_update: DateTime<Utc>,
    /// Set when this is a cached snapshot served after a failed refresh
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Bind each roster athlete to its first matching entry.
///
/// Bindings come back in feed order so that equal places keep the order the
/// feed reported them in.
pub fn match_roster<'e>(
    roster: &[RosterAthlete],
    entries: &[&'e TimingEntry],
) -> Vec<(&'e TimingEntry, String)> {
    let mut bound: Vec<(usize, &'e TimingEntry, String)> = Vec::new();
    for athlete in roster {
        match entries
            .iter()
            .enumerate()
            .find(|(_, entry)| entry_matches(athlete, entry))
        {
            Some((index, entry)) => {
                debug!(
                    athlete = %athlete.name,
                    place = ?entry.place,
                    event = %entry.event_label,
                    "Matched"
                );
                bound.push((index, *entry, athlete.name.clone()));
            }
            None => {
                debug!(athlete = %athlete.name, school = %athlete.school, "No match");
            }
        }
    }
    bound.sort_by_key(|(index, _, _)| *index);
    bound
        .into_iter()
        .map(|(_, entry, athlete_name)| (entry, athlete_name))
        .collect()
}

/// Matched runners eligible at a scope, ascending by place (stable)
fn runners_at_scope(bound: &[(&TimingEntry, String)], scope: Scope<'_>) -> Vec<MatchedRunner> {
    let mut runners: Vec<MatchedRunner> = bound
        .iter()
        .filter_map(|(entry, athlete_name)| match scope {
            Scope::Finish => entry.place.map(|place| MatchedRunner {
                athlete_name: athlete_name.clone(),
                school: entry.school.clone(),
                place,
                time: entry.time.clone(),
                event_label: entry.event_label.clone(),
                splits: entry.splits.clone(),
            }),
            Scope::Split(label) => {
                let split = entry.split(label)?;
                split.place.map(|place| MatchedRunner {
                    athlete_name: athlete_name.clone(),
                    school: entry.school.clone(),
                    place,
                    time: split.time.clone(),
                    event_label: entry.event_label.clone(),
                    splits: Vec::new(),
                })
            }
        })
        .collect();
    runners.sort_by_key(|runner| runner.place);
    runners
}

/// Apply scoring rules to place-ordered runners
fn standing_from_runners(mut runners: Vec<MatchedRunner>) -> TeamStanding {
    if runners.len() < SCORING_RUNNERS {
        return TeamStanding {
            status: StandingStatus::Dnf,
            score: None,
            reason: Some(format!(
                "Only {} runner(s) finished (minimum {} required)",
                runners.len(),
                SCORING_RUNNERS
            )),
            scoring_runners: runners,
            displacers: Vec::new(),
            gap1to5: None,
            gap1to7: None,
            avg_time: None,
        };
    }

    let mut displacers = runners.split_off(SCORING_RUNNERS);
    displacers.truncate(MAX_DISPLACERS);
    let scorers = runners;

    let first = scorers[0].place;
    let score: u64 = scorers.iter().map(|r| u64::from(r.place)).sum();
    let gap1to5 = scorers[SCORING_RUNNERS - 1].place - first;
    let gap1to7 = if displacers.len() == MAX_DISPLACERS {
        Some(displacers[MAX_DISPLACERS - 1].place - first)
    } else {
        None
    };
    let avg_time = mean_race_time(scorers.iter().map(|r| r.time.as_str()));

    TeamStanding {
        status: StandingStatus::Scored,
        score: Some(score),
        scoring_runners: scorers,
        displacers,
        gap1to5: Some(gap1to5),
        gap1to7,
        avg_time,
        reason: None,
    }
}

/// Score one roster against eligible entries at one scope.
///
/// Never fails: an empty roster or feed is a DNF with zero runners.
pub fn score_team(
    roster: &[RosterAthlete],
    entries: &[&TimingEntry],
    scope: Scope<'_>,
) -> TeamStanding {
    let bound = match_roster(roster, entries);
    standing_from_runners(runners_at_scope(&bound, scope))
}

fn split_labels(bound: &[(&TimingEntry, String)]) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for (entry, _) in bound {
        for split in &entry.splits {
            if !labels.contains(&split.label) {
                labels.push(split.label.clone());
            }
        }
    }
    sort_split_labels(&mut labels);
    labels
}

fn all_scopes(bound: &[(&TimingEntry, String)]) -> AllScopes {
    let finish = standing_from_runners(runners_at_scope(bound, Scope::Finish));
    let splits = split_labels(bound)
        .into_iter()
        .map(|label| {
            let standing = standing_from_runners(runners_at_scope(bound, Scope::Split(&label)));
            SplitStanding { label, standing }
        })
        .collect();
    AllScopes { finish, splits }
}

/// Score one roster at the finish and at every split its matched runners report
pub fn score_team_all_scopes(roster: &[RosterAthlete], entries: &[&TimingEntry]) -> AllScopes {
    all_scopes(&match_roster(roster, entries))
}

/// Score a draft team against gender-filtered entries
pub fn score_draft_team(team: &DraftTeam, eligible: &[&TimingEntry]) -> TeamResult {
    let bound = match_roster(&team.roster, eligible);
    let matched: Vec<&TimingEntry> = bound.iter().map(|(entry, _)| *entry).collect();

    let primary = primary_event(&matched, eligible);
    let available = available_splits(&matched, eligible, primary.as_deref());
    let scopes = all_scopes(&bound);
    let total_finishers = matched.iter().filter(|entry| entry.place.is_some()).count();

    debug!(
        team_id = team.team_id,
        team = %team.team_name,
        matched = matched.len(),
        finishers = total_finishers,
        "Scored team"
    );

    TeamResult {
        team_id: team.team_id,
        team_name: team.team_name.clone(),
        finish: scopes.finish,
        total_finishers,
        primary_event: primary,
        available_splits: available,
        split_scores: scopes.splits,
    }
}

/// Rank teams by finish score ascending, DNF last; ties keep input order
pub fn rank_teams(teams: &mut [TeamResult]) {
    teams.sort_by_key(|team| match team.finish.status {
        StandingStatus::Scored => (0u8, team.finish.score.unwrap_or(u64::MAX)),
        StandingStatus::Dnf => (1u8, 0),
    });
}

/// Score every team of a draft against one feed snapshot
pub fn score_race(teams: &[DraftTeam], entries: &[TimingEntry]) -> Vec<TeamResult> {
    let gender = draft_gender(teams);
    let eligible = classify_feed_for_draft(entries, gender);
    info!(
        teams = teams.len(),
        entries = entries.len(),
        eligible = eligible.len(),
        draft_gender = ?gender,
        "Scoring race"
    );

    let mut results: Vec<TeamResult> = teams
        .iter()
        .map(|team| score_draft_team(team, &eligible))
        .collect();
    rank_teams(&mut results);
    results
}

/// Build a fresh snapshot from one feed fetch
pub fn build_snapshot(teams: &[DraftTeam], feed: &RaceFeed) -> RaceSnapshot {
    RaceSnapshot {
        race_title: feed.race_title.clone(),
        total_results: feed.entries.len(),
        team_scores: score_race(teams, &feed.entries),
        last_update: Utc::now(),
        error: None,
    }
}
