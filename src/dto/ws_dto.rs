use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dto::draft_dto::{DraftSnapshot, TournamentSnapshot};

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JoinData {
    pub participant_name: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MakePickData {
    #[serde(default)]
    pub participant_name: Option<String>,
    pub player_id: i64,
}

/// Envelopes a viewer sends over its draft socket.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    Join(JoinData),
    MakePick(MakePickData),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JoinedData {
    pub participant_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PickErrorData {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

/// Envelopes the server pushes to viewers.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    Joined(JoinedData),
    DraftState(DraftSnapshot),
    TournamentState(TournamentSnapshot),
    PickError(PickErrorData),
}

impl ServerMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Joined(_) => "joined",
            ServerMessage::DraftState(_) => "draftState",
            ServerMessage::TournamentState(_) => "tournamentState",
            ServerMessage::PickError(_) => "pickError",
        }
    }
}
