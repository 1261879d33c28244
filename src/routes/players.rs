use axum::{
    extract::{Extension, Query},
    response::IntoResponse,
    Json,
};
use sqlx::SqlitePool;
use tracing::info;

use crate::dto::player_dto::{PlayerQuery, SearchQuery};
use crate::error::DraftError;
use crate::services::catalog;
use crate::services::room::RoomRegistry;

/**
 * GET a filtered, sorted page of the player catalog.
 */
pub async fn get_players(
    Extension(pool): Extension<SqlitePool>,
    Query(query): Query<PlayerQuery>,
) -> Result<impl IntoResponse, DraftError> {
    let page = catalog::list_players(&pool, &query).await?;
    Ok(Json(page))
}

pub async fn search_players(
    Extension(pool): Extension<SqlitePool>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, DraftError> {
    info!("Searching players for {:?}.", query.q);
    let page = catalog::search_players(&pool, &query).await?;
    Ok(Json(page))
}

pub async fn get_player_enums(
    Extension(pool): Extension<SqlitePool>,
) -> Result<impl IntoResponse, DraftError> {
    let enums = catalog::player_enums(&pool).await?;
    Ok(Json(enums))
}

pub async fn health() -> &'static str {
    "healthy"
}

/// Live room, session and dropped-session counts.
pub async fn room_health(Extension(rooms): Extension<RoomRegistry>) -> impl IntoResponse {
    Json(rooms.overview().await)
}
