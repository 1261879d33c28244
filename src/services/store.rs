//! Row access for drafts, participants, picks and matches.
//!
//! Functions take any SQLite executor so the same query runs on the pool or
//! inside a transaction.

use sqlx::{Sqlite, SqliteConnection};

use crate::dto::draft_dto::{Draft, Match, Participant, PickView};
use crate::error::DraftError;

const DRAFT_COLUMNS: &str = r#"
    id, code, name, admin_name, status, current_round, current_pick_in_round,
    total_rounds, participant_count, created_at, started_at, completed_at
"#;

const PARTICIPANT_COLUMNS: &str = r#"
    id, draft_id, name, draft_order, is_admin, joined_at,
    picks_85_89, picks_80_84, picks_75_79, picks_up_to_74
"#;

const MATCH_COLUMNS: &str = r#"
    id, draft_id, home_team_id, away_team_id, home_team_name, away_team_name,
    home_score, away_score, played_at, recorded_by
"#;

/// Take the write lock on a draft row before reading it.
///
/// The no-op update makes this transaction the database writer immediately,
/// so concurrent mutations of the same draft queue behind it and each sees
/// the previous one's committed counters.
pub async fn lock_draft(conn: &mut SqliteConnection, code: &str) -> Result<Draft, DraftError> {
    let touched = sqlx::query("UPDATE drafts SET id = id WHERE code = ?")
        .bind(code)
        .execute(&mut *conn)
        .await?;

    if touched.rows_affected() == 0 {
        return Err(DraftError::NotFound("draft"));
    }

    find_draft(conn, code).await
}

pub async fn find_draft<'e, E>(executor: E, code: &str) -> Result<Draft, DraftError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Draft>(&format!("SELECT {DRAFT_COLUMNS} FROM drafts WHERE code = ?"))
        .bind(code)
        .fetch_optional(executor)
        .await?
        .ok_or(DraftError::NotFound("draft"))
}

pub async fn find_draft_by_id<'e, E>(executor: E, id: i64) -> Result<Draft, DraftError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Draft>(&format!("SELECT {DRAFT_COLUMNS} FROM drafts WHERE id = ?"))
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or(DraftError::NotFound("draft"))
}

pub async fn draft_code_exists<'e, E>(executor: E, code: &str) -> Result<bool, DraftError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM drafts WHERE code = ?)")
        .bind(code)
        .fetch_one(executor)
        .await?;
    Ok(exists)
}

pub async fn find_participant<'e, E>(
    executor: E,
    draft_id: i64,
    name: &str,
) -> Result<Option<Participant>, DraftError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let participant = sqlx::query_as::<_, Participant>(&format!(
        "SELECT {PARTICIPANT_COLUMNS} FROM draft_participants WHERE draft_id = ? AND name = ?"
    ))
    .bind(draft_id)
    .bind(name)
    .fetch_optional(executor)
    .await?;
    Ok(participant)
}

pub async fn find_participant_by_order<'e, E>(
    executor: E,
    draft_id: i64,
    draft_order: i64,
) -> Result<Option<Participant>, DraftError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let participant = sqlx::query_as::<_, Participant>(&format!(
        "SELECT {PARTICIPANT_COLUMNS} FROM draft_participants WHERE draft_id = ? AND draft_order = ?"
    ))
    .bind(draft_id)
    .bind(draft_order)
    .fetch_optional(executor)
    .await?;
    Ok(participant)
}

pub async fn find_participant_by_id<'e, E>(executor: E, id: i64) -> Result<Participant, DraftError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Participant>(&format!(
        "SELECT {PARTICIPANT_COLUMNS} FROM draft_participants WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or(DraftError::NotFound("participant"))
}

/// Participants of a draft ordered by draft order.
pub async fn list_participants<'e, E>(executor: E, draft_id: i64) -> Result<Vec<Participant>, DraftError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let participants = sqlx::query_as::<_, Participant>(&format!(
        "SELECT {PARTICIPANT_COLUMNS} FROM draft_participants WHERE draft_id = ? ORDER BY draft_order"
    ))
    .bind(draft_id)
    .fetch_all(executor)
    .await?;
    Ok(participants)
}

/// Committed picks ordered by overall pick number, with picker name and player fields.
pub async fn list_picks<'e, E>(executor: E, draft_id: i64) -> Result<Vec<PickView>, DraftError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let picks = sqlx::query_as::<_, PickView>(
        r#"
        SELECT dp.id, dp.draft_id, dp.participant_id, dp.player_id, dp.round_number,
               dp.pick_in_round, dp.overall_pick_number, dp.player_rating_tier, dp.picked_at,
               part.name AS participant_name,
               p.first_name, p.last_name, p.common_name, p.overall_rating, p.position_short_label,
               p.team_label, p.team_image_url, p.nationality_label, p.nationality_image_url,
               p.avatar_url, p.shield_url, p.league_name
        FROM draft_picks dp
        JOIN players p ON dp.player_id = p.id
        JOIN draft_participants part ON dp.participant_id = part.id
        WHERE dp.draft_id = ?
        ORDER BY dp.overall_pick_number
        "#,
    )
    .bind(draft_id)
    .fetch_all(executor)
    .await?;
    Ok(picks)
}

pub async fn count_picks<'e, E>(executor: E, draft_id: i64) -> Result<i64, DraftError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM draft_picks WHERE draft_id = ?")
        .bind(draft_id)
        .fetch_one(executor)
        .await?;
    Ok(count)
}

/// Matches of a draft, newest first.
pub async fn list_matches<'e, E>(executor: E, draft_id: i64) -> Result<Vec<Match>, DraftError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let matches = sqlx::query_as::<_, Match>(&format!(
        "SELECT {MATCH_COLUMNS} FROM matches WHERE draft_id = ? ORDER BY played_at DESC, id DESC"
    ))
    .bind(draft_id)
    .fetch_all(executor)
    .await?;
    Ok(matches)
}

pub async fn find_match<'e, E>(executor: E, id: i64) -> Result<Match, DraftError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Match>(&format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = ?"))
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or(DraftError::NotFound("match"))
}
