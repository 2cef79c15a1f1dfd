//! Draft, team and athlete queries

use crate::models::{DraftTeam, Gender, RosterAthlete};
use crate::Result;
use sqlx::SqlitePool;

type AthleteRow = (i64, String, String, Option<String>);

fn athlete_from_row((id, name, school, gender): AthleteRow) -> RosterAthlete {
    RosterAthlete {
        id,
        name,
        school,
        gender: gender.as_deref().and_then(Gender::parse),
    }
}

/// Load every team of a draft with its drafted athletes.
///
/// Returns `None` when the draft does not exist. Teams come back in
/// creation order, rosters in pick order.
pub async fn load_draft_teams(pool: &SqlitePool, draft_id: i64) -> Result<Option<Vec<DraftTeam>>> {
    let draft: Option<(i64,)> = sqlx::query_as("SELECT id FROM drafts WHERE id = ?")
        .bind(draft_id)
        .fetch_optional(pool)
        .await?;
    if draft.is_none() {
        return Ok(None);
    }

    let teams: Vec<(i64, String)> =
        sqlx::query_as("SELECT id, name FROM teams WHERE draft_id = ? ORDER BY id")
            .bind(draft_id)
            .fetch_all(pool)
            .await?;

    let mut result = Vec::with_capacity(teams.len());
    for (team_id, team_name) in teams {
        let rows: Vec<AthleteRow> = sqlx::query_as(
            r#"
            SELECT a.id, a.name, a.school, a.gender
            FROM athletes a
            JOIN draft_picks dp ON a.id = dp.athlete_id
            WHERE dp.team_id = ?
            ORDER BY dp.overall_pick
            "#,
        )
        .bind(team_id)
        .fetch_all(pool)
        .await?;

        result.push(DraftTeam {
            team_id,
            team_name,
            roster: rows.into_iter().map(athlete_from_row).collect(),
        });
    }

    Ok(Some(result))
}

/// All known athletes, for linking scraped historical results
pub async fn list_athletes(pool: &SqlitePool) -> Result<Vec<RosterAthlete>> {
    let rows: Vec<AthleteRow> =
        sqlx::query_as("SELECT id, name, school, gender FROM athletes ORDER BY id")
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(athlete_from_row).collect())
}

pub async fn insert_athlete(
    pool: &SqlitePool,
    name: &str,
    school: &str,
    gender: Option<Gender>,
) -> Result<i64> {
    let result = sqlx::query("INSERT INTO athletes (name, school, gender) VALUES (?, ?, ?)")
        .bind(name)
        .bind(school)
        .bind(gender.map(|g| g.as_str()))
        .execute(pool)
        .await?;
    Ok(result.last_insert_rowid())
}

pub async fn create_draft(pool: &SqlitePool, name: &str) -> Result<i64> {
    let result = sqlx::query("INSERT INTO drafts (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await?;
    Ok(result.last_insert_rowid())
}

pub async fn create_team(pool: &SqlitePool, draft_id: i64, name: &str) -> Result<i64> {
    let result = sqlx::query("INSERT INTO teams (draft_id, name) VALUES (?, ?)")
        .bind(draft_id)
        .bind(name)
        .execute(pool)
        .await?;
    Ok(result.last_insert_rowid())
}

/// Record a pick; the overall pick number is assigned sequentially per draft
pub async fn record_pick(
    pool: &SqlitePool,
    draft_id: i64,
    team_id: i64,
    athlete_id: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO draft_picks (draft_id, team_id, athlete_id, overall_pick)
        VALUES (?, ?, ?, (
            SELECT COALESCE(MAX(overall_pick), 0) + 1 FROM draft_picks WHERE draft_id = ?
        ))
        "#,
    )
    .bind(draft_id)
    .bind(team_id)
    .bind(athlete_id)
    .bind(draft_id)
    .execute(pool)
    .await?;

    Ok(())
}
