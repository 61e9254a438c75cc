//! Gateway trait
//!
//! The session layer below this crate owns packet encoding, the handshake and
//! the socket. Everything above it talks through [`RpcGateway`].

use super::errors::RpcResult;
use super::types::{GatewayRequest, GatewayResponse};
use async_trait::async_trait;

/// Opaque request/response channel bound to a logged-in session
///
/// Implementations must correlate each response with its request so that
/// unrelated calls never wait on one another. Timeouts are applied by the
/// caller ([`Session`](super::session::Session)).
#[async_trait]
pub trait RpcGateway: Send + Sync {
    /// Send one request and wait for its correlated response
    async fn call(&self, request: GatewayRequest) -> RpcResult<GatewayResponse>;
}
