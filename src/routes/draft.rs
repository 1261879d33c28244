use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;
use tracing::info;

use crate::config::Config;
use crate::dto::draft_dto::{
    AdminRequest, CreateDraftRequest, JoinDraftRequest, RecordMatchRequest, RecordMatchResponse,
};
use crate::error::DraftError;
use crate::services::draft_admin;
use crate::services::room::RoomRegistry;
use crate::services::snapshot::{self, SnapshotKind};

pub async fn create_draft(
    Extension(pool): Extension<SqlitePool>,
    Json(req): Json<CreateDraftRequest>,
) -> Result<impl IntoResponse, DraftError> {
    info!("Creating draft {}.", req.name);
    let created = draft_admin::create_draft(&pool, &req.name, &req.admin_name).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_draft(
    Extension(pool): Extension<SqlitePool>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, DraftError> {
    let draft = draft_admin::get_draft(&pool, &code).await?;
    Ok(Json(draft))
}

pub async fn join_draft(
    Extension(pool): Extension<SqlitePool>,
    Extension(rooms): Extension<RoomRegistry>,
    Path(code): Path<String>,
    Json(req): Json<JoinDraftRequest>,
) -> Result<impl IntoResponse, DraftError> {
    let joined = draft_admin::join_draft(&pool, &code, &req.name).await?;
    rooms.refresh(&code, SnapshotKind::Draft).await;
    Ok(Json(joined))
}

pub async fn start_draft(
    Extension(pool): Extension<SqlitePool>,
    Extension(rooms): Extension<RoomRegistry>,
    Extension(config): Extension<Config>,
    Path(code): Path<String>,
    Json(req): Json<AdminRequest>,
) -> Result<impl IntoResponse, DraftError> {
    info!("Starting draft {}.", code);
    let started = draft_admin::start_draft(
        &pool,
        &code,
        &req.admin_name,
        config.pinned_second_pick.as_deref(),
    )
    .await?;
    rooms.refresh(&code, SnapshotKind::Draft).await;
    Ok(Json(started))
}

/// Same payload a viewer receives in `draftState`.
pub async fn get_draft_state(
    Extension(pool): Extension<SqlitePool>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, DraftError> {
    let state = snapshot::draft_snapshot(&pool, &code).await?;
    Ok(Json(state))
}

pub async fn get_optimal_transfer(
    Extension(pool): Extension<SqlitePool>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, DraftError> {
    let data = snapshot::transfer_snapshot(&pool, &code).await?;
    Ok(Json(data))
}

pub async fn get_tournament(
    Extension(pool): Extension<SqlitePool>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, DraftError> {
    let data = snapshot::tournament_snapshot(&pool, &code).await?;
    Ok(Json(data))
}

pub async fn start_tournament(
    Extension(pool): Extension<SqlitePool>,
    Extension(rooms): Extension<RoomRegistry>,
    Path(code): Path<String>,
    Json(req): Json<AdminRequest>,
) -> Result<impl IntoResponse, DraftError> {
    info!("Starting tournament for draft {}.", code);
    let started = draft_admin::start_tournament(&pool, &code, &req.admin_name).await?;
    rooms.refresh(&code, SnapshotKind::Tournament).await;
    Ok(Json(started))
}

pub async fn record_match(
    Extension(pool): Extension<SqlitePool>,
    Extension(rooms): Extension<RoomRegistry>,
    Path(code): Path<String>,
    Json(req): Json<RecordMatchRequest>,
) -> Result<impl IntoResponse, DraftError> {
    let recorded = draft_admin::record_match(&pool, &code, &req).await?;
    rooms.refresh(&code, SnapshotKind::Tournament).await;
    Ok((StatusCode::CREATED, Json(RecordMatchResponse { recorded })))
}
