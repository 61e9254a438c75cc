//! Contacts: individuals, groups and memberships
//!
//! Every entity carries the [`Session`](crate::core_gateway::Session) it was
//! constructed with. Groups fetch their snapshot once at construction and then
//! keep it current from push events; individuals need no fetch.

pub mod contact;
pub mod errors;
pub mod group;
pub mod individual;
pub mod member;
pub mod permission;
mod sync;
pub mod types;

pub use contact::Contact;
pub use errors::{BootstrapError, ContactError, ContactResult};
pub use group::{construct_group, EventOutcome, Group, GroupInfo, GroupRef};
pub use individual::{construct_individual, Individual};
pub use member::Membership;
pub use permission::{evaluate_mute, validate_mute_duration, DenyReason, MuteDecision};
pub use types::{AccountId, ContactId, GroupId, InternalGroupId, PermissionLevel};
