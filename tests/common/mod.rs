#![allow(dead_code)]

use draft_room_backend::db;
use draft_room_backend::dto::draft_dto::Participant;
use draft_room_backend::services::{draft_admin, snapshot, store};
use sqlx::SqlitePool;

pub const TOP: std::ops::RangeInclusive<i64> = 1..=4; // rated 86
pub const MID: std::ops::RangeInclusive<i64> = 101..=116; // rated 82
pub const LOW: std::ops::RangeInclusive<i64> = 201..=224; // rated 70..=79
pub const RESERVED: i64 = 900; // rated 91
pub const UNRATED: i64 = 901;

pub const NAMES: [&str; 4] = ["ana", "bo", "cy", "di"];

/// Top players carry two abilities, every fifth id one other.
pub fn abilities(id: i64) -> Option<&'static str> {
    if id < 100 {
        Some("Finesse Shot|Rapid")
    } else if id % 5 == 0 {
        Some("Power Header")
    } else {
        None
    }
}

pub async fn insert_player(pool: &SqlitePool, id: i64, rating: Option<i64>, name: &str) {
    sqlx::query(
        r#"
        INSERT INTO players (id, overall_rating, first_name, last_name, common_name,
                             position_short_label, alternate_positions, team_label,
                             league_name, nationality_label, preferred_foot,
                             player_abilities_labels)
        VALUES (?, ?, ?, ?, NULL, ?, ?, ?, ?, ?, 1, ?)
        "#,
    )
    .bind(id)
    .bind(rating)
    .bind(name)
    .bind(format!("Player{id}"))
    .bind(if id % 2 == 0 { "ST" } else { "CB" })
    .bind(if id % 3 == 0 { "LW|RW" } else { "" })
    .bind(if id < 100 { "Harbor FC" } else { "Dune United" })
    .bind(if id < 200 { "Premier" } else { "Liga" })
    .bind("Norway")
    .bind(abilities(id))
    .execute(pool)
    .await
    .unwrap();
}

/// Enough players for a full four-participant draft plus a few unpickable ones.
pub async fn seed_players(pool: &SqlitePool) {
    for id in TOP {
        insert_player(pool, id, Some(86), "Top").await;
    }
    for id in MID {
        insert_player(pool, id, Some(82), "Mid").await;
    }
    for id in LOW {
        insert_player(pool, id, Some(70 + (id - 201) % 10), "Low").await;
    }
    insert_player(pool, RESERVED, Some(91), "Icon").await;
    insert_player(pool, UNRATED, None, "Ghost").await;
}

pub async fn memory_pool() -> SqlitePool {
    let pool = db::connect_in_memory().await.unwrap();
    seed_players(&pool).await;
    pool
}

/// A waiting draft administered by "ana" with bo, cy and di joined.
pub async fn waiting_draft(pool: &SqlitePool) -> String {
    let created = draft_admin::create_draft(pool, "Friday Draft", NAMES[0])
        .await
        .unwrap();
    let code = created.draft.code;
    for name in &NAMES[1..] {
        draft_admin::join_draft(pool, &code, name).await.unwrap();
    }
    code
}

pub async fn started_draft(pool: &SqlitePool) -> String {
    let code = waiting_draft(pool).await;
    draft_admin::start_draft(pool, &code, NAMES[0], None)
        .await
        .unwrap();
    code
}

pub async fn participant(pool: &SqlitePool, code: &str, name: &str) -> Participant {
    let draft = store::find_draft(pool, code).await.unwrap();
    store::find_participant(pool, draft.id, name)
        .await
        .unwrap()
        .unwrap()
}

/// Name of the participant whose turn it is.
pub async fn on_clock(pool: &SqlitePool, code: &str) -> String {
    let snapshot = snapshot::draft_snapshot(pool, code).await.unwrap();
    let order = snapshot.current_picker.expect("draft is not active");
    snapshot
        .participants
        .into_iter()
        .find(|p| p.draft_order == order)
        .map(|p| p.name)
        .unwrap()
}

/// Hands out each seeded player once, choosing a tier the picker still has room in.
pub struct PlayerSupply {
    top: Vec<i64>,
    mid: Vec<i64>,
    low: Vec<i64>,
}

impl PlayerSupply {
    pub fn new() -> Self {
        Self {
            top: TOP.rev().collect(),
            mid: MID.rev().collect(),
            low: LOW.rev().collect(),
        }
    }

    pub fn low(&mut self) -> i64 {
        self.low.pop().unwrap()
    }

    pub fn next_for(&mut self, p: &Participant) -> i64 {
        if p.picks_85_89 < 1 {
            self.top.pop().unwrap()
        } else if p.picks_80_84 < 4 {
            self.mid.pop().unwrap()
        } else {
            self.low.pop().unwrap()
        }
    }
}
