//! Push notifications from the server
//!
//! Events are delivered on a single ordered bus. Each entity subscribes for
//! its whole lifetime and picks out the events scoped to it.

pub mod broadcaster;
pub mod events;

pub use broadcaster::EventBus;
pub use events::ContactEvent;
