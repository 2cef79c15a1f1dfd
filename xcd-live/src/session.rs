//! Live race sessions
//!
//! One session per draft tracks one live feed. Starting a session captures
//! the draft's rosters and scores a first fetch; every poll re-fetches the
//! feed and replaces the cached snapshot. Sessions are independent and only
//! the registry's keyed table is shared between them.
//!
//! Concurrency rules:
//! - At most one fetch is in flight per session. A poll arriving while one
//!   is running gets the cached snapshot unchanged.
//! - A fetch that outlives its session (stopped or replaced) is discarded.
//! - A failed or timed-out fetch leaves the cache intact; the caller gets
//!   the previous snapshot with its `error` set and tracking continues.

use crate::classifier::{classify_feed_for_draft, draft_gender};
use crate::feed::{FeedError, FeedSource, RaceFeed};
use crate::roster::RosterProvider;
use crate::scoring::{build_snapshot, RaceSnapshot, TeamResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use xcd_common::matching::find_match;
use xcd_common::{DraftTeam, Gender, RosterAthlete, TimingEntry};

/// Message attached to a cached snapshot served after a failed refresh
pub const STALE_SNAPSHOT_MESSAGE: &str = "Failed to fetch latest data, showing cached results";

/// Raw entries included in a debug report
pub const DEBUG_SAMPLE_SIZE: usize = 20;

/// Candidate entries listed per athlete in a debug report
pub const MAX_POTENTIAL_MATCHES: usize = 5;

/// Live race session errors
#[derive(Debug, Error)]
pub enum LiveRaceError {
    #[error("Invalid PTTiming URL: {0}")]
    InvalidFeedUrl(String),

    #[error("Draft {0} not found")]
    DraftNotFound(i64),

    #[error("No active race tracking for draft {0}")]
    NotTracking(i64),

    #[error("Team {team_id} not found in race results for draft {draft_id}")]
    TeamNotFound { draft_id: i64, team_id: i64 },

    #[error("Failed to fetch live results: {0}")]
    FeedUnavailable(#[from] FeedError),

    #[error("Roster lookup failed: {0}")]
    Roster(#[from] xcd_common::Error),
}

struct SessionCache {
    feed: RaceFeed,
    snapshot: RaceSnapshot,
}

/// Tracking state for one draft
pub struct LiveRaceSession {
    draft_id: i64,
    feed_url: String,
    /// Rosters as of session start
    teams: Vec<DraftTeam>,
    cache: RwLock<SessionCache>,
    fetch_lock: Mutex<()>,
}

impl LiveRaceSession {
    fn new(
        draft_id: i64,
        feed_url: String,
        teams: Vec<DraftTeam>,
        feed: RaceFeed,
        snapshot: RaceSnapshot,
    ) -> Self {
        Self {
            draft_id,
            feed_url,
            teams,
            cache: RwLock::new(SessionCache { feed, snapshot }),
            fetch_lock: Mutex::new(()),
        }
    }

    pub fn draft_id(&self) -> i64 {
        self.draft_id
    }

    pub fn feed_url(&self) -> &str {
        &self.feed_url
    }

    /// Last successfully computed snapshot
    pub async fn snapshot(&self) -> RaceSnapshot {
        self.cache.read().await.snapshot.clone()
    }
}

/// Cached team entry plus race context
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamDetail {
    #[serde(flatten)]
    pub team: TeamResult,
    pub race_title: String,
    pub last_update: DateTime<Utc>,
}

/// Matching diagnostics for a tracked draft
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugReport {
    pub race_title: String,
    pub total_live_results: usize,
    pub sample_live_results: Vec<TimingEntry>,
    pub team_rosters: Vec<DebugTeam>,
    pub last_update: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugTeam {
    pub team_id: i64,
    pub team_name: String,
    pub roster: Vec<DebugAthlete>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugAthlete {
    pub name: String,
    pub school: String,
    pub gender: Option<Gender>,
    /// Entry the scorer binds this athlete to, if any
    pub matched_entry: Option<EntrySummary>,
    /// Loose candidates (same school or containing the last name)
    pub potential_matches: Vec<EntrySummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySummary {
    pub name: String,
    pub school: String,
    pub gender: Option<Gender>,
    pub place: Option<u32>,
    pub time: String,
}

impl From<&TimingEntry> for EntrySummary {
    fn from(entry: &TimingEntry) -> Self {
        Self {
            name: entry.name.clone(),
            school: entry.school.clone(),
            gender: entry.gender,
            place: entry.place,
            time: entry.time.clone(),
        }
    }
}

/// Loose candidate test for diagnostics; much wider than the matcher
fn is_potential_match(athlete: &RosterAthlete, entry: &TimingEntry) -> bool {
    let entry_school = entry.school.to_lowercase();
    let athlete_school = athlete.school.to_lowercase();
    let athlete_name = athlete.name.to_lowercase();
    let last_name = athlete_name.split_whitespace().last().unwrap_or("");

    entry_school.contains(&athlete_school)
        || athlete_school.contains(&entry_school)
        || entry.name.to_lowercase().contains(last_name)
}

/// Registry of live race sessions, keyed by draft id
pub struct SessionRegistry {
    sessions: RwLock<HashMap<i64, Arc<LiveRaceSession>>>,
    feed: Arc<dyn FeedSource>,
    rosters: Arc<dyn RosterProvider>,
    fetch_timeout: Duration,
}

impl SessionRegistry {
    pub fn new(
        feed: Arc<dyn FeedSource>,
        rosters: Arc<dyn RosterProvider>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            feed,
            rosters,
            fetch_timeout,
        }
    }

    /// Fetch with the configured upper bound
    async fn fetch(&self, url: &str) -> Result<RaceFeed, FeedError> {
        match tokio::time::timeout(self.fetch_timeout, self.feed.fetch(url)).await {
            Ok(result) => result,
            Err(_) => Err(FeedError::Timeout(self.fetch_timeout)),
        }
    }

    async fn session(&self, draft_id: i64) -> Result<Arc<LiveRaceSession>, LiveRaceError> {
        self.sessions
            .read()
            .await
            .get(&draft_id)
            .cloned()
            .ok_or(LiveRaceError::NotTracking(draft_id))
    }

    /// Start tracking `feed_url` for a draft and return the first snapshot.
    ///
    /// Replaces any session already tracking the draft.
    pub async fn start(
        &self,
        draft_id: i64,
        feed_url: &str,
    ) -> Result<RaceSnapshot, LiveRaceError> {
        self.feed
            .validate_url(feed_url)
            .map_err(|_| LiveRaceError::InvalidFeedUrl(feed_url.to_string()))?;

        let teams = self
            .rosters
            .load_teams(draft_id)
            .await?
            .filter(|teams| !teams.is_empty())
            .ok_or(LiveRaceError::DraftNotFound(draft_id))?;

        info!(draft_id, url = %feed_url, teams = teams.len(), "Starting live race tracking");

        let feed = self.fetch(feed_url).await.map_err(|e| {
            warn!(draft_id, error = %e, "Initial live results fetch failed");
            LiveRaceError::FeedUnavailable(e)
        })?;
        let snapshot = build_snapshot(&teams, &feed);

        let session = Arc::new(LiveRaceSession::new(
            draft_id,
            feed_url.to_string(),
            teams,
            feed,
            snapshot.clone(),
        ));
        if self.sessions.write().await.insert(draft_id, session).is_some() {
            info!(draft_id, "Replaced existing live race session");
        }

        Ok(snapshot)
    }

    /// Re-fetch and re-score a tracked draft
    pub async fn poll(&self, draft_id: i64) -> Result<RaceSnapshot, LiveRaceError> {
        let session = self.session(draft_id).await?;

        let Ok(_fetch_guard) = session.fetch_lock.try_lock() else {
            debug!(draft_id, "Fetch already in flight, serving cached snapshot");
            return Ok(session.snapshot().await);
        };

        let fetched = self.fetch(&session.feed_url).await;

        // Commit under the registry lock so a concurrent stop cannot interleave
        let sessions = self.sessions.read().await;
        match sessions.get(&draft_id) {
            Some(current) if Arc::ptr_eq(current, &session) => {}
            Some(current) => {
                debug!(draft_id, "Session replaced during fetch, discarding result");
                return Ok(current.snapshot().await);
            }
            None => {
                debug!(draft_id, "Session stopped during fetch, discarding result");
                return Err(LiveRaceError::NotTracking(draft_id));
            }
        }

        match fetched {
            Ok(feed) => {
                let snapshot = build_snapshot(&session.teams, &feed);
                let mut cache = session.cache.write().await;
                cache.feed = feed;
                cache.snapshot = snapshot.clone();
                Ok(snapshot)
            }
            Err(e) => {
                warn!(draft_id, error = %e, "Error updating live results, serving cached snapshot");
                let mut snapshot = session.snapshot().await;
                snapshot.error = Some(STALE_SNAPSHOT_MESSAGE.to_string());
                Ok(snapshot)
            }
        }
    }

    /// Poll if tracked; `None` when the draft is not being tracked
    pub async fn status(&self, draft_id: i64) -> Result<Option<RaceSnapshot>, LiveRaceError> {
        match self.poll(draft_id).await {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(LiveRaceError::NotTracking(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Stop tracking; returns whether a session existed
    pub async fn stop(&self, draft_id: i64) -> bool {
        let was_tracking = self.sessions.write().await.remove(&draft_id).is_some();
        if was_tracking {
            info!(draft_id, "Stopped live race tracking");
        }
        was_tracking
    }

    pub async fn is_tracking(&self, draft_id: i64) -> bool {
        self.sessions.read().await.contains_key(&draft_id)
    }

    /// Number of drafts currently tracked
    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Cached standing of one team; does not fetch
    pub async fn team(&self, draft_id: i64, team_id: i64) -> Result<TeamDetail, LiveRaceError> {
        let session = self.session(draft_id).await?;
        let cache = session.cache.read().await;

        let team = cache
            .snapshot
            .team_scores
            .iter()
            .find(|t| t.team_id == team_id)
            .cloned()
            .ok_or(LiveRaceError::TeamNotFound { draft_id, team_id })?;

        Ok(TeamDetail {
            team,
            race_title: cache.snapshot.race_title.clone(),
            last_update: cache.snapshot.last_update,
        })
    }

    /// Matching diagnostics from the cached feed; does not fetch
    pub async fn debug(&self, draft_id: i64) -> Result<DebugReport, LiveRaceError> {
        let session = self.session(draft_id).await?;
        let cache = session.cache.read().await;
        let entries = &cache.feed.entries;
        let eligible = classify_feed_for_draft(entries, draft_gender(&session.teams));

        let team_rosters = session
            .teams
            .iter()
            .map(|team| DebugTeam {
                team_id: team.team_id,
                team_name: team.team_name.clone(),
                roster: team
                    .roster
                    .iter()
                    .map(|athlete| DebugAthlete {
                        name: athlete.name.clone(),
                        school: athlete.school.clone(),
                        gender: athlete.gender,
                        matched_entry: find_match(athlete, eligible.iter().copied())
                            .map(EntrySummary::from),
                        potential_matches: entries
                            .iter()
                            .filter(|entry| is_potential_match(athlete, entry))
                            .take(MAX_POTENTIAL_MATCHES)
                            .map(EntrySummary::from)
                            .collect(),
                    })
                    .collect(),
            })
            .collect();

        Ok(DebugReport {
            race_title: cache.feed.race_title.clone(),
            total_live_results: entries.len(),
            sample_live_results: entries.iter().take(DEBUG_SAMPLE_SIZE).cloned().collect(),
            team_rosters,
            last_update: cache.snapshot.last_update,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::pttiming::extract_meet_id;
    use crate::scoring::StandingStatus;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    const URL: &str = "https://live.pttiming.com/results?mid=4242";

    enum Step {
        Ok(RaceFeed),
        Fail,
        /// Signals `started`, then waits for `release`
        Gated(RaceFeed),
        Hang,
    }

    #[derive(Default)]
    struct ScriptedFeed {
        steps: std::sync::Mutex<VecDeque<Step>>,
        fetches: AtomicUsize,
        started: Notify,
        release: Notify,
    }

    impl ScriptedFeed {
        fn new(steps: Vec<Step>) -> Arc<Self> {
            Arc::new(Self {
                steps: std::sync::Mutex::new(steps.into()),
                ..Default::default()
            })
        }
    }

    #[async_trait]
    impl FeedSource for ScriptedFeed {
        fn validate_url(&self, url: &str) -> Result<(), FeedError> {
            extract_meet_id(url)
                .map(|_| ())
                .ok_or_else(|| FeedError::InvalidUrl(url.to_string()))
        }

        async fn fetch(&self, _url: &str) -> Result<RaceFeed, FeedError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let step = self.steps.lock().unwrap().pop_front();
            match step {
                Some(Step::Ok(feed)) => Ok(feed),
                Some(Step::Gated(feed)) => {
                    self.started.notify_one();
                    self.release.notified().await;
                    Ok(feed)
                }
                Some(Step::Hang) => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
                Some(Step::Fail) | None => Err(FeedError::Status(503)),
            }
        }
    }

    struct StaticRosters(HashMap<i64, Vec<DraftTeam>>);

    #[async_trait]
    impl RosterProvider for StaticRosters {
        async fn load_teams(&self, draft_id: i64) -> xcd_common::Result<Option<Vec<DraftTeam>>> {
            Ok(self.0.get(&draft_id).cloned())
        }
    }

    fn runner(team: &str, i: u32) -> RosterAthlete {
        RosterAthlete {
            id: i as i64,
            name: format!("{} Runner{}x", team, i),
            school: format!("{} State", team),
            gender: Some(Gender::Male),
        }
    }

    fn teams() -> Vec<DraftTeam> {
        vec![
            DraftTeam {
                team_id: 1,
                team_name: "Hawks".to_string(),
                roster: (1..=7).map(|i| runner("Hawk", i)).collect(),
            },
            DraftTeam {
                team_id: 2,
                team_name: "Owls".to_string(),
                roster: (1..=7).map(|i| runner("Owl", i)).collect(),
            },
        ]
    }

    /// Hawks fully placed; Owls with `owl_finishers` placed
    fn feed(owl_finishers: u32) -> RaceFeed {
        let mut entries = Vec::new();
        let mut place = 1;
        for i in 1..=7 {
            for (team, placed) in [("Hawk", true), ("Owl", i <= owl_finishers)] {
                entries.push(TimingEntry {
                    place: placed.then_some(place),
                    name: format!("{} Runner{}x", team, i),
                    school: format!("{} State University", team),
                    time: if placed { "24:00.0".to_string() } else { "In Progress".to_string() },
                    gender: Some(Gender::Male),
                    event_label: "Men 8000m".to_string(),
                    splits: Vec::new(),
                });
                if placed {
                    place += 1;
                }
            }
        }
        RaceFeed {
            race_title: "Regionals - Men 8000m".to_string(),
            entries,
        }
    }

    fn registry(steps: Vec<Step>) -> (Arc<SessionRegistry>, Arc<ScriptedFeed>) {
        registry_with(steps, HashMap::from([(7, teams()), (8, Vec::new())]))
    }

    fn registry_with(
        steps: Vec<Step>,
        rosters: HashMap<i64, Vec<DraftTeam>>,
    ) -> (Arc<SessionRegistry>, Arc<ScriptedFeed>) {
        let feed = ScriptedFeed::new(steps);
        let registry = SessionRegistry::new(
            feed.clone(),
            Arc::new(StaticRosters(rosters)),
            Duration::from_millis(200),
        );
        (Arc::new(registry), feed)
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_url_before_fetching() {
        let (registry, feed) = registry(vec![Step::Ok(feed(7))]);

        let result = registry.start(7, "https://example.com/results?mid=1").await;
        assert!(matches!(result, Err(LiveRaceError::InvalidFeedUrl(_))));
        let result = registry.start(7, "https://live.pttiming.com/results").await;
        assert!(matches!(result, Err(LiveRaceError::InvalidFeedUrl(_))));

        assert_eq!(feed.fetches.load(Ordering::SeqCst), 0);
        assert!(!registry.is_tracking(7).await);
    }

    #[tokio::test]
    async fn test_start_unknown_or_empty_draft() {
        let (registry, _feed) = registry(vec![]);

        assert!(matches!(registry.start(99, URL).await, Err(LiveRaceError::DraftNotFound(99))));
        assert!(matches!(registry.start(8, URL).await, Err(LiveRaceError::DraftNotFound(8))));
    }

    #[tokio::test]
    async fn test_start_fetch_failure_does_not_track() {
        let (registry, _feed) = registry(vec![Step::Fail]);

        let result = registry.start(7, URL).await;
        assert!(matches!(result, Err(LiveRaceError::FeedUnavailable(FeedError::Status(503)))));
        assert!(!registry.is_tracking(7).await);
    }

    #[tokio::test]
    async fn test_start_scores_first_fetch() {
        let (registry, _feed) = registry(vec![Step::Ok(feed(4))]);

        let snapshot = registry.start(7, URL).await.unwrap();
        assert_eq!(snapshot.race_title, "Regionals - Men 8000m");
        assert_eq!(snapshot.total_results, 14);
        assert!(snapshot.error.is_none());

        let hawks = &snapshot.team_scores[0];
        assert_eq!(hawks.team_name, "Hawks");
        assert_eq!(hawks.finish.status, StandingStatus::Scored);

        let owls = &snapshot.team_scores[1];
        assert_eq!(owls.finish.status, StandingStatus::Dnf);
        assert_eq!(owls.total_finishers, 4);
        assert!(registry.is_tracking(7).await);
    }

    #[tokio::test]
    async fn test_poll_failure_serves_cached_snapshot() {
        let (registry, _feed) = registry(vec![Step::Ok(feed(7)), Step::Fail, Step::Ok(feed(3))]);

        let first = registry.start(7, URL).await.unwrap();

        let second = registry.poll(7).await.unwrap();
        assert_eq!(second.team_scores, first.team_scores);
        assert_eq!(second.last_update, first.last_update);
        assert_eq!(second.error.as_deref(), Some(STALE_SNAPSHOT_MESSAGE));
        assert!(registry.is_tracking(7).await);

        // recovery clears the error and rescoring picks up the new feed
        let third = registry.poll(7).await.unwrap();
        assert!(third.error.is_none());
        let owls = third.team_scores.iter().find(|t| t.team_id == 2).unwrap();
        assert_eq!(owls.finish.status, StandingStatus::Dnf);
    }

    #[tokio::test]
    async fn test_poll_timeout_is_soft_error() {
        let (registry, _feed) = registry(vec![Step::Ok(feed(7)), Step::Hang]);
        registry.start(7, URL).await.unwrap();

        let snapshot = registry.poll(7).await.unwrap();
        assert_eq!(snapshot.error.as_deref(), Some(STALE_SNAPSHOT_MESSAGE));
        assert!(registry.is_tracking(7).await);
    }

    #[tokio::test]
    async fn test_untracked_poll_and_status() {
        let (registry, _feed) = registry(vec![]);

        assert!(matches!(registry.poll(7).await, Err(LiveRaceError::NotTracking(7))));
        assert!(registry.status(7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let (registry, _feed) = registry(vec![Step::Ok(feed(7))]);
        registry.start(7, URL).await.unwrap();

        assert!(registry.stop(7).await);
        assert!(!registry.stop(7).await);
        assert!(!registry.is_tracking(7).await);
        assert_eq!(registry.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_stop_during_fetch_discards_result() {
        let (registry, feed) = registry(vec![Step::Ok(feed(7)), Step::Gated(feed(7))]);
        registry.start(7, URL).await.unwrap();

        let polling = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.poll(7).await })
        };
        feed.started.notified().await;

        assert!(registry.stop(7).await);
        feed.release.notify_one();

        let result = polling.await.unwrap();
        assert!(matches!(result, Err(LiveRaceError::NotTracking(7))));
        assert!(!registry.is_tracking(7).await);
    }

    #[tokio::test]
    async fn test_concurrent_poll_serves_cache() {
        let (registry, feed) =
            registry(vec![Step::Ok(feed(7)), Step::Gated(feed(2)), Step::Ok(feed(2))]);
        let first = registry.start(7, URL).await.unwrap();

        let polling = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.poll(7).await })
        };
        feed.started.notified().await;

        let concurrent = registry.poll(7).await.unwrap();
        assert_eq!(concurrent, first);
        assert_eq!(feed.fetches.load(Ordering::SeqCst), 2);

        feed.release.notify_one();
        let refreshed = polling.await.unwrap().unwrap();
        let owls = refreshed.team_scores.iter().find(|t| t.team_id == 2).unwrap();
        assert_eq!(owls.total_finishers, 2);
    }

    #[tokio::test]
    async fn test_restart_replaces_session() {
        let (registry, _feed) = registry(vec![Step::Ok(feed(7)), Step::Ok(feed(1))]);
        registry.start(7, URL).await.unwrap();
        let second = registry.start(7, "https://live.pttiming.com/results?mid=5151").await.unwrap();

        assert_eq!(registry.active_count().await, 1);
        let owls = second.team_scores.iter().find(|t| t.team_id == 2).unwrap();
        assert_eq!(owls.total_finishers, 1);
    }

    #[tokio::test]
    async fn test_team_detail() {
        let (registry, _feed) = registry(vec![Step::Ok(feed(7))]);
        assert!(matches!(registry.team(7, 1).await, Err(LiveRaceError::NotTracking(7))));

        registry.start(7, URL).await.unwrap();
        let detail = registry.team(7, 2).await.unwrap();
        assert_eq!(detail.team.team_name, "Owls");
        assert_eq!(detail.race_title, "Regionals - Men 8000m");

        assert!(matches!(
            registry.team(7, 3).await,
            Err(LiveRaceError::TeamNotFound { draft_id: 7, team_id: 3 })
        ));
    }

    #[tokio::test]
    async fn test_debug_report() {
        let mut big = feed(7);
        for i in 0..20 {
            big.entries.push(TimingEntry {
                place: None,
                name: format!("Extra Person{}x", i),
                school: "Hawk State".to_string(),
                time: "In Progress".to_string(),
                gender: Some(Gender::Male),
                event_label: "Men 8000m".to_string(),
                splits: Vec::new(),
            });
        }
        let (registry, _feed) = registry(vec![Step::Ok(big)]);
        registry.start(7, URL).await.unwrap();

        let report = registry.debug(7).await.unwrap();
        assert_eq!(report.total_live_results, 34);
        assert_eq!(report.sample_live_results.len(), DEBUG_SAMPLE_SIZE);
        assert_eq!(report.team_rosters.len(), 2);

        let hawk = &report.team_rosters[0].roster[0];
        assert_eq!(hawk.matched_entry.as_ref().map(|e| e.name.as_str()), Some("Hawk Runner1x"));
        assert_eq!(hawk.potential_matches.len(), MAX_POTENTIAL_MATCHES);
    }
}
