pub mod auth;
pub mod dto;
pub mod errors;
pub mod middleware;
pub mod notifications;
pub mod rest;
pub mod router;
pub mod state;
pub mod token;
pub mod upload;

// Re-export what the binary needs to stand the server up.
pub use middleware::require_auth;
pub use router::build_router;
pub use state::AppState;
