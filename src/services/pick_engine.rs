//! Validates and commits a single pick as one atomic transition.

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{error, info};

use crate::dto::draft_dto::DraftStatus;
use crate::error::DraftError;
use crate::services::store;
use crate::services::turn::{self, RatingTier};

/// What a successful pick changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickOutcome {
    pub pick_id: i64,
    pub participant_id: i64,
    pub player_id: i64,
    pub round_number: i64,
    pub pick_in_round: i64,
    pub overall_pick_number: i64,
    pub tier: RatingTier,
    pub draft_completed: bool,
}

/// Commit `player_id` for `participant_name` in draft `code`, or explain why not.
///
/// Runs inside a single transaction that holds the draft's write lock from the
/// first statement; any error drops the transaction and rolls everything back.
pub async fn submit_pick(
    pool: &SqlitePool,
    code: &str,
    participant_name: &str,
    player_id: i64,
) -> Result<PickOutcome, DraftError> {
    let mut tx = pool.begin().await?;

    let draft = store::lock_draft(&mut tx, code).await?;
    if draft.status != DraftStatus::Active {
        return Err(DraftError::InvalidState("draft is not active".into()));
    }

    let participant = store::find_participant(&mut *tx, draft.id, participant_name)
        .await?
        .ok_or(DraftError::NotFound("participant"))?;

    let on_clock = turn::on_the_clock(
        draft.current_round,
        draft.current_pick_in_round,
        draft.participant_count,
    );
    if participant.draft_order != on_clock {
        let on_clock_name = store::find_participant_by_order(&mut *tx, draft.id, on_clock)
            .await?
            .map(|p| p.name);
        return Err(DraftError::NotYourTurn {
            on_clock,
            on_clock_name,
        });
    }

    let rating: Option<Option<i64>> =
        sqlx::query_scalar("SELECT overall_rating FROM players WHERE id = ?")
            .bind(player_id)
            .fetch_optional(&mut *tx)
            .await?;
    let rating = rating.ok_or(DraftError::NotFound("player"))?;

    let tier = RatingTier::classify(rating)?;

    let already_picked: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM draft_picks WHERE draft_id = ? AND player_id = ?)",
    )
    .bind(draft.id)
    .bind(player_id)
    .fetch_one(&mut *tx)
    .await?;
    if already_picked {
        return Err(DraftError::AlreadyPicked { player_id });
    }

    tier.check_quota(&participant)?;

    let overall = turn::overall_pick_number(
        draft.current_round,
        draft.current_pick_in_round,
        draft.participant_count,
    );
    let now = Utc::now();

    let inserted = sqlx::query(
        r#"
        INSERT INTO draft_picks (draft_id, participant_id, player_id, round_number, pick_in_round,
                                 overall_pick_number, player_rating_tier, picked_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(draft.id)
    .bind(participant.id)
    .bind(player_id)
    .bind(draft.current_round)
    .bind(draft.current_pick_in_round)
    .bind(overall)
    .bind(tier.label())
    .bind(now)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        let duplicate = e
            .as_database_error()
            .is_some_and(|db| db.is_unique_violation());
        if duplicate {
            DraftError::AlreadyPicked { player_id }
        } else {
            error!("Insert pick error: {:?}", e);
            DraftError::CommitFailed(e)
        }
    })?;
    let pick_id = inserted.last_insert_rowid();

    let column = tier.counter_column();
    sqlx::query(&format!(
        "UPDATE draft_participants SET {column} = {column} + 1 WHERE id = ?"
    ))
    .bind(participant.id)
    .execute(&mut *tx)
    .await?;

    let (next_round, next_pick) = turn::next_turn(
        draft.current_round,
        draft.current_pick_in_round,
        draft.participant_count,
    );
    let draft_completed = next_round > draft.total_rounds;

    if draft_completed {
        sqlx::query(
            r#"
            UPDATE drafts
            SET current_round = ?, current_pick_in_round = ?, status = ?, completed_at = ?
            WHERE id = ?
            "#,
        )
        .bind(next_round)
        .bind(next_pick)
        .bind(DraftStatus::Completed)
        .bind(now)
        .bind(draft.id)
        .execute(&mut *tx)
        .await?;
    } else {
        sqlx::query("UPDATE drafts SET current_round = ?, current_pick_in_round = ? WHERE id = ?")
            .bind(next_round)
            .bind(next_pick)
            .bind(draft.id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await.map_err(|e| {
        error!("Commit pick transaction error: {:?}", e);
        DraftError::CommitFailed(e)
    })?;

    info!(
        "Pick successful: {} picked player {} (round {}, pick {}) in draft {}",
        participant_name, player_id, draft.current_round, draft.current_pick_in_round, code
    );
    if draft_completed {
        info!("Draft {} completed after {} picks", code, overall);
    }

    Ok(PickOutcome {
        pick_id,
        participant_id: participant.id,
        player_id,
        round_number: draft.current_round,
        pick_in_round: draft.current_pick_in_round,
        overall_pick_number: overall,
        tier,
        draft_completed,
    })
}
