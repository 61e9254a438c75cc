//! Gateway to the remote server
//!
//! Every remote command an entity issues goes through a [`Session`], which
//! wraps an [`RpcGateway`] with typed helpers and timeouts.

pub mod correlating;
pub mod errors;
pub mod gateway;
pub mod session;
pub mod types;

pub use correlating::CorrelatingGateway;
pub use errors::{RpcError, RpcResult};
pub use gateway::RpcGateway;
pub use session::Session;
pub use types::{GatewayRequest, GatewayResponse, Message, RawGroupInfo, RawMember, SessionKey};
