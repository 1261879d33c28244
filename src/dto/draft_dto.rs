use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::dto::player_dto::PlayerSummary;

/// Lifecycle of a draft. Transitions only move forward:
/// waiting -> active -> completed -> tournament.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum DraftStatus {
    Waiting,
    Active,
    Completed,
    Tournament,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub admin_name: String,
    pub status: DraftStatus,
    pub current_round: i64,
    pub current_pick_in_round: i64,
    pub total_rounds: i64,
    pub participant_count: i64,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: i64,
    pub draft_id: i64,
    pub name: String,
    pub draft_order: i64,
    pub is_admin: bool,
    pub joined_at: DateTime<Utc>,
    #[serde(rename = "picks8589")]
    pub picks_85_89: i64,
    #[serde(rename = "picks8084")]
    pub picks_80_84: i64,
    #[serde(rename = "picks7579")]
    pub picks_75_79: i64,
    #[serde(rename = "picksUpTo74")]
    pub picks_up_to_74: i64,
}

/// A committed pick joined with the picker's name and the player's display fields.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PickView {
    pub id: i64,
    pub draft_id: i64,
    pub participant_id: i64,
    pub player_id: i64,
    pub round_number: i64,
    pub pick_in_round: i64,
    pub overall_pick_number: i64,
    pub player_rating_tier: String,
    pub picked_at: DateTime<Utc>,
    pub participant_name: String,
    #[sqlx(flatten)]
    pub player: PlayerSummary,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: i64,
    pub draft_id: i64,
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub home_team_name: String,
    pub away_team_name: String,
    pub home_score: i64,
    pub away_score: i64,
    pub played_at: DateTime<Utc>,
    pub recorded_by: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    pub team_name: String,
    pub team_id: i64,
    pub games_played: i64,
    pub wins: i64,
    pub draws: i64,
    pub losses: i64,
    pub points: i64,
    pub goals_for: i64,
    pub goals_against: i64,
    pub goal_difference: i64,
}

/// Full broadcastable state of a draft.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DraftSnapshot {
    pub draft: Draft,
    pub participants: Vec<Participant>,
    pub picks: Vec<PickView>,
    pub current_picker: Option<i64>,
}

/// Every pick of a finished draft, for offline squad analysis.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TransferSnapshot {
    pub draft: Draft,
    pub picks: Vec<PickView>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TournamentSnapshot {
    pub draft: Draft,
    pub participants: Vec<Participant>,
    pub matches: Vec<Match>,
    pub standings: Vec<Standing>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDraftRequest {
    pub name: String,
    pub admin_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDraftResponse {
    pub draft: Draft,
    pub participant: Participant,
}

#[derive(Debug, Deserialize)]
pub struct JoinDraftRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct JoinDraftResponse {
    pub draft: Draft,
    pub participant: Participant,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminRequest {
    pub admin_name: String,
}

#[derive(Debug, Serialize)]
pub struct StartDraftResponse {
    pub draft: Draft,
    pub participants: Vec<Participant>,
}

#[derive(Debug, Serialize)]
pub struct StartTournamentResponse {
    pub draft: Draft,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RecordMatchRequest {
    pub home_team_name: String,
    pub away_team_name: String,
    pub home_score: i64,
    pub away_score: i64,
    pub recorded_by: String,
}

#[derive(Debug, Serialize)]
pub struct RecordMatchResponse {
    #[serde(rename = "match")]
    pub recorded: Match,
}
