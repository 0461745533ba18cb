/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Read-only views over modes and live sessions.
pub mod session_service;
/// WebSocket connection and message handling service.
pub mod websocket_service;
