//! HTTP API module.
//!
//! This module provides the HTTP server, the API types and the log
//! broadcaster shared with the pipeline.

pub mod logs;
pub mod server;
pub mod types;

pub use logs::*;
pub use server::{router, start_server, ServerConfig, MAX_UPLOAD_BYTES};
pub use types::*;
