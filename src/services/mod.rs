/// Moderator operations over REST.
pub mod admin_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Public service for read-only show information.
pub mod public_service;
/// Server-Sent Events streaming service.
pub mod sse_service;
/// WebSocket connection and message handling service.
pub mod websocket_service;
