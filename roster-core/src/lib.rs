//! Contact and group state for an IM client
//!
//! Models the contacts of a logged-in account: individuals, groups and the
//! memberships linking them. Groups bootstrap from a single server fetch and
//! are kept current by push events delivered on the session's event bus.
//! Moderation actions check the group's permission hierarchy before any
//! command is sent.

pub mod config;
pub mod core_contact;
pub mod core_events;
pub mod core_gateway;
pub mod logging;
pub mod metrics;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::Config;
pub use core_contact::{
    construct_group, construct_individual, Contact, ContactError, ContactId, ContactResult,
    Group, GroupId, Individual, Membership, PermissionLevel,
};
pub use core_events::{ContactEvent, EventBus};
pub use core_gateway::{RpcError, RpcGateway, Session, SessionKey};
pub use logging::{init_logging, LogLevel};
