//! services/api/src/web/mod.rs
//!
//! The web layer: HTTP state, request/response payloads, REST handlers, and
//! the content processing orchestration they drive.

pub mod content_task;
pub mod dto;
pub mod rest;
pub mod state;

pub use rest::ApiDoc;
pub use state::AppState;
