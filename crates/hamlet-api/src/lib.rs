//! Hamlet API - HTTP routers for every node role
//!
//! One router constructor per role; the `hamletd` binary picks the one
//! matching its `--role` flag and serves it. All handlers funnel domain
//! failures through [`error::ApiError`], which renders the shared
//! [`hamlet_types::ErrorBody`] shape.

pub mod coordinator;
pub mod error;
pub mod registry;
pub mod villager;

pub use coordinator::coordinator_routes;
pub use error::{ApiError, ApiResult};
pub use registry::registry_routes;
pub use villager::villager_routes;
