//! Test utilities and helpers
//!
//! Shared by unit tests, the integration suite and the CLI's offline
//! simulation: an in-memory gateway, snapshot fixtures and async helpers.

pub mod async_helpers;
pub mod fixtures;
pub mod mock_gateway;

pub use async_helpers::*;
pub use fixtures::*;
pub use mock_gateway::MockGateway;
