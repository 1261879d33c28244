use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::error;

use crate::dto::ws_dto::PickErrorData;
use crate::services::turn::RatingTier;

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    InvalidState(String),

    #[error("not your turn (it's player {on_clock}'s turn)")]
    NotYourTurn {
        on_clock: i64,
        on_clock_name: Option<String>,
    },

    #[error("player already picked in this draft")]
    AlreadyPicked { player_id: i64 },

    #[error("cannot pick players rated 90+")]
    Ineligible { rating: Option<i64> },

    #[error("quota exceeded: you have {current}/{limit} picks for {}", tier.describe())]
    QuotaExceeded {
        tier: RatingTier,
        current: i64,
        limit: i64,
    },

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("failed to complete operation")]
    CommitFailed(#[source] sqlx::Error),
}

impl From<sqlx::Error> for DraftError {
    fn from(e: sqlx::Error) -> Self {
        DraftError::CommitFailed(e)
    }
}

impl DraftError {
    pub fn code(&self) -> &'static str {
        match self {
            DraftError::NotFound(_) => "not_found",
            DraftError::InvalidState(_) => "invalid_state",
            DraftError::NotYourTurn { .. } => "not_your_turn",
            DraftError::AlreadyPicked { .. } => "already_picked",
            DraftError::Ineligible { .. } => "ineligible",
            DraftError::QuotaExceeded { .. } => "quota_exceeded",
            DraftError::Forbidden(_) => "forbidden",
            DraftError::Validation(_) => "validation",
            DraftError::Conflict(_) => "conflict",
            DraftError::CommitFailed(_) => "commit_failed",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            DraftError::NotFound(_) => StatusCode::NOT_FOUND,
            DraftError::InvalidState(_)
            | DraftError::NotYourTurn { .. }
            | DraftError::Ineligible { .. }
            | DraftError::QuotaExceeded { .. }
            | DraftError::Validation(_) => StatusCode::BAD_REQUEST,
            DraftError::AlreadyPicked { .. } | DraftError::Conflict(_) => StatusCode::CONFLICT,
            DraftError::Forbidden(_) => StatusCode::FORBIDDEN,
            DraftError::CommitFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Structured fields a client needs to render an actionable message.
    pub fn detail(&self) -> Option<Value> {
        match self {
            DraftError::NotYourTurn {
                on_clock,
                on_clock_name,
            } => Some(json!({ "onClock": on_clock, "onClockName": on_clock_name })),
            DraftError::AlreadyPicked { player_id } => Some(json!({ "playerId": player_id })),
            DraftError::Ineligible { rating } => Some(json!({ "rating": rating })),
            DraftError::QuotaExceeded {
                tier,
                current,
                limit,
            } => Some(json!({ "tier": tier.label(), "current": current, "limit": limit })),
            _ => None,
        }
    }

    pub fn to_pick_error(&self) -> PickErrorData {
        PickErrorData {
            error: self.to_string(),
            code: self.code().to_string(),
            detail: self.detail(),
        }
    }
}

impl IntoResponse for DraftError {
    fn into_response(self) -> Response {
        if let DraftError::CommitFailed(e) = &self {
            error!("Database error: {:?}", e);
        }

        let mut body = json!({
            "error": self.to_string(),
            "code": self.code(),
        });
        if let Some(detail) = self.detail() {
            body["detail"] = detail;
        }

        (self.status(), Json(body)).into_response()
    }
}
