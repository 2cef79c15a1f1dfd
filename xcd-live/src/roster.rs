//! Draft roster lookup
//!
//! Rosters are read once, when tracking starts. Later changes to the draft
//! are not seen by a running session.

use async_trait::async_trait;
use sqlx::SqlitePool;
use xcd_common::db::load_draft_teams;
use xcd_common::DraftTeam;

/// Source of draft rosters
#[async_trait]
pub trait RosterProvider: Send + Sync {
    /// Teams of a draft with their rosters; `None` if the draft does not exist
    async fn load_teams(&self, draft_id: i64) -> xcd_common::Result<Option<Vec<DraftTeam>>>;
}

/// Rosters backed by the draft database
#[derive(Clone)]
pub struct SqliteRosterProvider {
    db: SqlitePool,
}

impl SqliteRosterProvider {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RosterProvider for SqliteRosterProvider {
    async fn load_teams(&self, draft_id: i64) -> xcd_common::Result<Option<Vec<DraftTeam>>> {
        load_draft_teams(&self.db, draft_id).await
    }
}
