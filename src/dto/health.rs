use serde::Serialize;
use utoipa::ToSchema;

/// Health probe response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Overall status string: `ok` or `degraded`.
    pub status: String,
    /// Whether the backend currently runs without its storage backend.
    pub degraded: bool,
}
