//! WEM Platform API
//!
//! The remote collaborator boundary:
//!
//! - [`PlatformApi`]: the trait the engine consumes
//! - [`HttpPlatformApi`]: `reqwest`-backed implementation
//! - [`WorkspaceConfig`] / [`WorkspaceCredentials`]: per-workspace settings
//! - [`generate_access_token`]: short-lived signed admin tokens

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod api;
mod auth;
mod config;
mod client;
mod error;

pub use api::{ListFilter, PlatformApi};
pub use auth::{generate_access_token, WorkspaceCredentials, TOKEN_NAME, TOKEN_TTL_SECS};
pub use client::{HttpPlatformApi, DEFAULT_API_URI};
pub use config::{ConfigSide, WorkspaceConfig};
pub use error::ApiError;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
