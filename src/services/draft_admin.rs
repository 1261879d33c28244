//! Administrative transitions: create, join, start, start tournament, record match.
//!
//! Each mutation runs in one transaction that first takes the draft's write
//! lock, the same way a pick does.

use chrono::Utc;
use rand::Rng;
use rand::seq::SliceRandom;
use sqlx::SqlitePool;
use tracing::{error, info};

use crate::dto::draft_dto::{
    CreateDraftResponse, Draft, DraftStatus, JoinDraftResponse, Match, RecordMatchRequest,
    StartDraftResponse, StartTournamentResponse,
};
use crate::error::DraftError;
use crate::services::store;
use crate::services::turn::TOTAL_ROUNDS;

const CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_LEN: usize = 8;
const CODE_ATTEMPTS: usize = 10;

/// Draft order slot taken by the pinned name, when configured.
const PINNED_ORDER: i64 = 2;

pub fn generate_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..CODE_LEN)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

/// A random permutation of `1..=names.len()`, one order per name.
///
/// If `pinned` names a participant and there are at least two, that
/// participant gets order 2 and everyone else shares the remaining orders.
pub fn shuffled_orders<R: Rng + ?Sized>(
    names: &[String],
    pinned: Option<&str>,
    rng: &mut R,
) -> Vec<i64> {
    let n = names.len() as i64;
    let pinned_at = pinned
        .filter(|_| n >= 2)
        .and_then(|p| names.iter().position(|name| name == p));

    let mut free: Vec<i64> = (1..=n)
        .filter(|&order| pinned_at.is_none() || order != PINNED_ORDER)
        .collect();
    free.shuffle(rng);

    let mut free = free.into_iter();
    (0..names.len())
        .map(|i| {
            if Some(i) == pinned_at {
                PINNED_ORDER
            } else {
                free.next().unwrap_or_default()
            }
        })
        .collect()
}

fn require(value: &str, message: &str) -> Result<(), DraftError> {
    if value.trim().is_empty() {
        return Err(DraftError::Validation(message.into()));
    }
    Ok(())
}

pub async fn create_draft(
    pool: &SqlitePool,
    name: &str,
    admin_name: &str,
) -> Result<CreateDraftResponse, DraftError> {
    require(name, "name is required")?;
    require(admin_name, "adminName is required")?;

    let mut code = None;
    for _ in 0..CODE_ATTEMPTS {
        let candidate = generate_code(&mut rand::rng());
        if !store::draft_code_exists(pool, &candidate).await? {
            code = Some(candidate);
            break;
        }
    }
    let code = code.ok_or_else(|| {
        error!("Could not generate a unique draft code");
        DraftError::Conflict("failed to generate unique code".into())
    })?;

    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let draft_id = sqlx::query(
        r#"
        INSERT INTO drafts (code, name, admin_name, total_rounds, participant_count, created_at)
        VALUES (?, ?, ?, ?, 1, ?)
        "#,
    )
    .bind(&code)
    .bind(name)
    .bind(admin_name)
    .bind(TOTAL_ROUNDS)
    .bind(now)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let participant_id = sqlx::query(
        r#"
        INSERT INTO draft_participants (draft_id, name, draft_order, is_admin, joined_at)
        VALUES (?, ?, 1, 1, ?)
        "#,
    )
    .bind(draft_id)
    .bind(admin_name)
    .bind(now)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let draft = store::find_draft_by_id(&mut *tx, draft_id).await?;
    let participant = store::find_participant_by_id(&mut *tx, participant_id).await?;
    tx.commit().await?;

    info!("Created draft: {} ({}) with admin {}", draft.name, draft.code, admin_name);
    Ok(CreateDraftResponse { draft, participant })
}

pub async fn get_draft(pool: &SqlitePool, code: &str) -> Result<Draft, DraftError> {
    store::find_draft(pool, code).await
}

/// Add `name` to a waiting draft at the next draft order.
pub async fn join_draft(
    pool: &SqlitePool,
    code: &str,
    name: &str,
) -> Result<JoinDraftResponse, DraftError> {
    require(name, "name is required")?;

    let mut tx = pool.begin().await?;
    let draft = store::lock_draft(&mut tx, code).await?;
    if draft.status != DraftStatus::Waiting {
        return Err(DraftError::InvalidState("draft has already started".into()));
    }
    if store::find_participant(&mut *tx, draft.id, name).await?.is_some() {
        return Err(DraftError::Conflict("name already taken in this draft".into()));
    }

    let next_order = draft.participant_count + 1;
    let participant_id = sqlx::query(
        r#"
        INSERT INTO draft_participants (draft_id, name, draft_order, is_admin, joined_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(draft.id)
    .bind(name)
    .bind(next_order)
    .bind(name == draft.admin_name)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    sqlx::query("UPDATE drafts SET participant_count = ? WHERE id = ?")
        .bind(next_order)
        .bind(draft.id)
        .execute(&mut *tx)
        .await?;

    let participant = store::find_participant_by_id(&mut *tx, participant_id).await?;
    let draft = store::find_draft_by_id(&mut *tx, draft.id).await?;
    tx.commit().await?;

    info!("Player {} joined draft {} (order: {})", name, code, next_order);
    Ok(JoinDraftResponse { draft, participant })
}

/// Shuffle draft order and move a waiting draft to active.
pub async fn start_draft(
    pool: &SqlitePool,
    code: &str,
    admin_name: &str,
    pinned: Option<&str>,
) -> Result<StartDraftResponse, DraftError> {
    require(admin_name, "adminName is required")?;

    let mut tx = pool.begin().await?;
    let draft = store::lock_draft(&mut tx, code).await?;
    if draft.admin_name != admin_name {
        return Err(DraftError::Forbidden("only the admin can start the draft".into()));
    }
    if draft.status != DraftStatus::Waiting {
        return Err(DraftError::InvalidState(
            "draft has already started or is completed".into(),
        ));
    }
    if draft.participant_count < 2 {
        return Err(DraftError::InvalidState(
            "need at least 2 participants to start draft".into(),
        ));
    }

    let participants = store::list_participants(&mut *tx, draft.id).await?;
    let names: Vec<String> = participants.iter().map(|p| p.name.clone()).collect();
    let orders = shuffled_orders(&names, pinned, &mut rand::rng());

    // Park everyone on a negative order first so UNIQUE(draft_id, draft_order) never trips.
    for (i, participant) in participants.iter().enumerate() {
        sqlx::query("UPDATE draft_participants SET draft_order = ? WHERE id = ?")
            .bind(-(i as i64 + 1))
            .bind(participant.id)
            .execute(&mut *tx)
            .await?;
    }
    for (participant, order) in participants.iter().zip(&orders) {
        sqlx::query("UPDATE draft_participants SET draft_order = ? WHERE id = ?")
            .bind(order)
            .bind(participant.id)
            .execute(&mut *tx)
            .await?;
    }

    sqlx::query("UPDATE drafts SET status = ?, started_at = ? WHERE id = ?")
        .bind(DraftStatus::Active)
        .bind(Utc::now())
        .bind(draft.id)
        .execute(&mut *tx)
        .await?;

    let draft = store::find_draft_by_id(&mut *tx, draft.id).await?;
    let participants = store::list_participants(&mut *tx, draft.id).await?;
    tx.commit().await?;

    info!("Started draft {} with {} participants", code, participants.len());
    Ok(StartDraftResponse {
        draft,
        participants,
    })
}

pub async fn start_tournament(
    pool: &SqlitePool,
    code: &str,
    admin_name: &str,
) -> Result<StartTournamentResponse, DraftError> {
    require(admin_name, "adminName is required")?;

    let mut tx = pool.begin().await?;
    let draft = store::lock_draft(&mut tx, code).await?;
    if draft.admin_name != admin_name {
        return Err(DraftError::Forbidden(
            "only the admin can start the tournament".into(),
        ));
    }
    if draft.status != DraftStatus::Completed {
        return Err(DraftError::InvalidState(
            "draft must be completed before starting tournament".into(),
        ));
    }

    sqlx::query("UPDATE drafts SET status = ? WHERE id = ?")
        .bind(DraftStatus::Tournament)
        .bind(draft.id)
        .execute(&mut *tx)
        .await?;
    let draft = store::find_draft_by_id(&mut *tx, draft.id).await?;
    tx.commit().await?;

    info!("Started tournament for draft {}", code);
    Ok(StartTournamentResponse { draft })
}

pub async fn record_match(
    pool: &SqlitePool,
    code: &str,
    req: &RecordMatchRequest,
) -> Result<Match, DraftError> {
    if req.home_team_name.is_empty() || req.away_team_name.is_empty() {
        return Err(DraftError::Validation("team names are required".into()));
    }
    if req.home_team_name == req.away_team_name {
        return Err(DraftError::Validation("teams cannot be the same".into()));
    }
    if req.home_score < 0 || req.away_score < 0 {
        return Err(DraftError::Validation("scores must be non-negative".into()));
    }
    require(&req.recorded_by, "recordedBy is required")?;

    let mut tx = pool.begin().await?;
    let draft = store::lock_draft(&mut tx, code).await?;
    if !matches!(draft.status, DraftStatus::Completed | DraftStatus::Tournament) {
        return Err(DraftError::InvalidState("draft is not completed yet".into()));
    }
    if draft.admin_name != req.recorded_by {
        return Err(DraftError::Forbidden("only the admin can record matches".into()));
    }

    let home = store::find_participant(&mut *tx, draft.id, &req.home_team_name)
        .await?
        .ok_or(DraftError::NotFound("home team"))?;
    let away = store::find_participant(&mut *tx, draft.id, &req.away_team_name)
        .await?
        .ok_or(DraftError::NotFound("away team"))?;

    let match_id = sqlx::query(
        r#"
        INSERT INTO matches (draft_id, home_team_id, away_team_id, home_team_name, away_team_name,
                             home_score, away_score, played_at, recorded_by)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(draft.id)
    .bind(home.id)
    .bind(away.id)
    .bind(&home.name)
    .bind(&away.name)
    .bind(req.home_score)
    .bind(req.away_score)
    .bind(Utc::now())
    .bind(&req.recorded_by)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let recorded = store::find_match(&mut *tx, match_id).await?;
    tx.commit().await?;

    info!(
        "Match recorded: {} {} - {} {} by {}",
        req.home_team_name, req.home_score, req.away_score, req.away_team_name, req.recorded_by
    );
    Ok(recorded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn is_permutation(orders: &[i64]) -> bool {
        let mut sorted = orders.to_vec();
        sorted.sort();
        sorted == (1..=orders.len() as i64).collect::<Vec<_>>()
    }

    #[test]
    fn codes_are_eight_uppercase_alphanumerics() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let code = generate_code(&mut rng);
            assert_eq!(code.len(), 8);
            assert!(code.bytes().all(|b| CODE_CHARS.contains(&b)));
        }
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(1);
        for n in 1..8 {
            let list: Vec<String> = (0..n).map(|i| format!("p{i}")).collect();
            assert!(is_permutation(&shuffled_orders(&list, None, &mut rng)));
        }
    }

    #[test]
    fn pinned_name_always_gets_second_pick() {
        let list = names(&["ana", "bo", "cy", "di"]);
        for seed in 0..25 {
            let mut rng = StdRng::seed_from_u64(seed);
            let orders = shuffled_orders(&list, Some("cy"), &mut rng);
            assert_eq!(orders[2], 2);
            assert!(is_permutation(&orders));
        }
    }

    #[test]
    fn pinned_name_ignored_when_absent_or_alone() {
        let mut rng = StdRng::seed_from_u64(3);
        let orders = shuffled_orders(&names(&["ana", "bo", "cy"]), Some("zed"), &mut rng);
        assert!(is_permutation(&orders));

        let orders = shuffled_orders(&names(&["zed"]), Some("zed"), &mut rng);
        assert_eq!(orders, vec![1]);
    }

    #[test]
    fn shuffle_reaches_more_than_one_order() {
        let list = names(&["ana", "bo", "cy", "di"]);
        let mut rng = StdRng::seed_from_u64(11);
        let first = shuffled_orders(&list, None, &mut rng);
        assert!((0..50).any(|_| shuffled_orders(&list, None, &mut rng) != first));
    }
}
