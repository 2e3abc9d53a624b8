//! Game Session API
//!
//! HTTP boundary for the slot machine: wallet authentication, request
//! validation, rate limiting and the response envelope.

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod security;
pub mod server;

pub use handlers::AppState;
pub use server::{build_app, init_tracing, ApiServer};
