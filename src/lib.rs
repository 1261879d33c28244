use axum::{
    extract::Extension,
    http::{HeaderValue, Method, header},
    routing::{get, post},
    Router,
};
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tracing::warn;

pub mod config;
pub mod db;
pub mod error;

pub mod dto {
    pub mod draft_dto;
    pub mod player_dto;
    pub mod ws_dto;
}

pub mod routes {
    pub mod draft;
    pub mod players;
}

pub mod services {
    pub mod catalog;
    pub mod draft_admin;
    pub mod pick_engine;
    pub mod room;
    pub mod snapshot;
    pub mod standings;
    pub mod store;
    pub mod turn;
    pub mod websocket;
}

use config::Config;
use routes::{draft, players};
use services::room::RoomRegistry;
use services::websocket::websocket_handler;

fn cors(allowed_origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);
    match allowed_origin.parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => {
            warn!("ALLOWED_ORIGIN '{}' is not a valid header value; CORS disabled", allowed_origin);
            layer
        }
    }
}

/// The full HTTP + WebSocket surface.
pub fn app(pool: SqlitePool, rooms: RoomRegistry, config: Config) -> Router {
    let api = Router::new()
        .route("/players", get(players::get_players))
        .route("/players/search", get(players::search_players))
        .route("/players/enums", get(players::get_player_enums))
        .route("/drafts", post(draft::create_draft))
        .route(
            "/drafts/{code}",
            get(draft::get_draft)
                .post(draft::join_draft)
                .put(draft::start_draft),
        )
        .route("/drafts/{code}/state", get(draft::get_draft_state))
        .route(
            "/drafts/{code}/optimal-transfer",
            get(draft::get_optimal_transfer),
        )
        .route(
            "/drafts/{code}/tournament",
            get(draft::get_tournament).post(draft::start_tournament),
        )
        .route("/drafts/{code}/matches", post(draft::record_match))
        .layer(cors(&config.allowed_origin));

    Router::new()
        .route("/health", get(players::health))
        .route("/health/rooms", get(players::room_health))
        .route("/ws/drafts/{code}", get(websocket_handler))
        .nest("/api", api)
        .layer(Extension(pool))
        .layer(Extension(rooms))
        .layer(Extension(config))
}
