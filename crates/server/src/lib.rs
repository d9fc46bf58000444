//! HTTP API server for tabula site tables.
//!
//! This crate provides the HTTP surface over the catalog:
//! - Site and table provisioning
//! - Schema diff-and-apply with per-table serialization
//! - Record CRUD and record images
//! - Realtime change notifications over WebSocket

pub mod error;
pub mod handlers;
pub mod locks;
pub mod metrics;
pub mod notifier;
pub mod routes;
pub mod state;
pub mod tables;

pub use error::ApiError;
pub use notifier::{ChangeEvent, ChangeNotifier};
pub use routes::create_router;
pub use state::AppState;
