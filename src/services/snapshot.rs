//! Fresh, consistent views of a draft for broadcasting.
//!
//! Each snapshot is read inside one transaction so draft header, participants
//! and picks all come from the same committed state. Nothing is cached.

use sqlx::SqlitePool;

use crate::dto::draft_dto::{
    Draft, DraftSnapshot, DraftStatus, TournamentSnapshot, TransferSnapshot,
};
use crate::dto::ws_dto::ServerMessage;
use crate::error::DraftError;
use crate::services::{standings, store, turn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    Draft,
    /// Tournament view; drafts not yet in tournament status get the draft view.
    Tournament,
}

/// Draft order on the clock, or `None` outside the active phase.
pub fn current_picker(draft: &Draft) -> Option<i64> {
    if draft.status != DraftStatus::Active || draft.participant_count == 0 {
        return None;
    }
    Some(turn::on_the_clock(
        draft.current_round,
        draft.current_pick_in_round,
        draft.participant_count,
    ))
}

pub async fn draft_snapshot(pool: &SqlitePool, code: &str) -> Result<DraftSnapshot, DraftError> {
    let mut tx = pool.begin().await?;
    let draft = store::find_draft(&mut *tx, code).await?;
    let participants = store::list_participants(&mut *tx, draft.id).await?;
    let picks = store::list_picks(&mut *tx, draft.id).await?;
    tx.commit().await?;

    Ok(DraftSnapshot {
        current_picker: current_picker(&draft),
        draft,
        participants,
        picks,
    })
}

/// Tournament data for a draft that has finished picking.
///
/// Fails with `InvalidState` while the draft is still waiting or active.
pub async fn tournament_snapshot(
    pool: &SqlitePool,
    code: &str,
) -> Result<TournamentSnapshot, DraftError> {
    let mut tx = pool.begin().await?;
    let draft = store::find_draft(&mut *tx, code).await?;
    if !matches!(draft.status, DraftStatus::Completed | DraftStatus::Tournament) {
        return Err(DraftError::InvalidState("draft is not completed yet".into()));
    }
    let participants = store::list_participants(&mut *tx, draft.id).await?;
    let matches = store::list_matches(&mut *tx, draft.id).await?;
    tx.commit().await?;

    Ok(TournamentSnapshot {
        standings: standings::compute_standings(&participants, &matches),
        draft,
        participants,
        matches,
    })
}

/// Picks of a completed draft with full player details, league included.
pub async fn transfer_snapshot(
    pool: &SqlitePool,
    code: &str,
) -> Result<TransferSnapshot, DraftError> {
    let mut tx = pool.begin().await?;
    let draft = store::find_draft(&mut *tx, code).await?;
    if !matches!(draft.status, DraftStatus::Completed | DraftStatus::Tournament) {
        return Err(DraftError::InvalidState("draft is not completed yet".into()));
    }
    let picks = store::list_picks(&mut *tx, draft.id).await?;
    tx.commit().await?;

    Ok(TransferSnapshot { draft, picks })
}

/// The message a room pushes for `kind`.
pub async fn assemble(
    pool: &SqlitePool,
    code: &str,
    kind: SnapshotKind,
) -> Result<ServerMessage, DraftError> {
    if kind == SnapshotKind::Tournament {
        let draft = store::find_draft(pool, code).await?;
        if draft.status == DraftStatus::Tournament {
            return Ok(ServerMessage::TournamentState(
                tournament_snapshot(pool, code).await?,
            ));
        }
    }
    Ok(ServerMessage::DraftState(draft_snapshot(pool, code).await?))
}
