use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the geography quiz backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sessions::list_modes,
        crate::routes::sessions::list_sessions,
        crate::routes::sessions::get_session,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::session::ModeSummary,
            crate::dto::session::SessionSummary,
            crate::dto::common::PlayerSummary,
            crate::dto::common::FinalScore,
            crate::dto::phase::VisibleSessionPhase,
            crate::dto::ws::ServerMessage,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sessions", description = "Game modes and live sessions"),
        (name = "players", description = "WebSocket operations for players"),
    )
)]
pub struct ApiDoc;
