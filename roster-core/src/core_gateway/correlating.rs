/*
    CorrelatingGateway - request/response correlation over a frame channel

    Workflow:

    1. `call(request)`:
        - tags the request with a fresh uuid
        - frames it as JSON and pushes it onto the outbound channel
        - waits on a oneshot stored in the pending map under that id,
          bounded by the per-call timeout

    2. `handle_frame(bytes)` (driven by the transport reader):
        - rejects oversized frames before parsing
        - resolves the pending call with the matching id
        - ignores ids with no pending call (already timed out)

    A call's pending entry is removed on every exit path, including the
    caller dropping the future before a response arrives.

    Frame layout:
    ```json
    {
        "type": "request",
        "id": "2f1c…",
        "request": { "kind": "QueryGroupInfo", "account": 1000, ... }
    }
    ```
*/

use super::errors::{RpcError, RpcResult};
use super::gateway::RpcGateway;
use super::types::{GatewayRequest, GatewayResponse};
use crate::config::Config;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use uuid::Uuid;

/// Maximum accepted inbound frame size (64 KiB)
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// Error code used when a local error is put on the wire
pub const ERR_INTERNAL_ERROR: i32 = -32603;

/// Default per-call timeout
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Error as carried in a response frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireError {
    pub code: i32,
    pub message: String,
}

impl From<WireError> for RpcError {
    fn from(err: WireError) -> Self {
        RpcError::Protocol {
            code: err.code,
            message: err.message,
        }
    }
}

impl From<&RpcError> for WireError {
    fn from(err: &RpcError) -> Self {
        match err {
            RpcError::Protocol { code, message } => WireError {
                code: *code,
                message: message.clone(),
            },
            other => WireError {
                code: ERR_INTERNAL_ERROR,
                message: other.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
enum WireMessage {
    #[serde(rename = "request")]
    Request { id: String, request: GatewayRequest },
    #[serde(rename = "response")]
    Response {
        id: String,
        result: Result<GatewayResponse, WireError>,
    },
}

/// Decode an outbound request frame (the server side of the exchange)
pub fn decode_request(frame: &[u8]) -> RpcResult<(String, GatewayRequest)> {
    match serde_json::from_slice(frame)? {
        WireMessage::Request { id, request } => Ok((id, request)),
        WireMessage::Response { id, .. } => Err(RpcError::Malformed(format!(
            "expected request frame, got response {}",
            id
        ))),
    }
}

/// Encode a response frame answering request `id`
pub fn encode_response(id: &str, result: &RpcResult<GatewayResponse>) -> RpcResult<Vec<u8>> {
    let message = WireMessage::Response {
        id: id.to_string(),
        result: result.as_ref().map(Clone::clone).map_err(WireError::from),
    };
    Ok(serde_json::to_vec(&message)?)
}

type PendingMap = HashMap<String, oneshot::Sender<RpcResult<GatewayResponse>>>;

fn lock_pending(pending: &Mutex<PendingMap>) -> MutexGuard<'_, PendingMap> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Removes a call's pending entry when the call ends, however it ends
struct PendingGuard<'a> {
    pending: &'a Mutex<PendingMap>,
    id: &'a str,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        lock_pending(self.pending).remove(self.id);
    }
}

/// [`RpcGateway`] that multiplexes calls over a single outbound frame channel
pub struct CorrelatingGateway {
    outbound: mpsc::Sender<Vec<u8>>,
    /// Pending calls awaiting a response, keyed by request id
    pending: Arc<Mutex<PendingMap>>,
    call_timeout: Duration,
    max_frame_size: usize,
}

impl CorrelatingGateway {
    pub fn new(outbound: mpsc::Sender<Vec<u8>>) -> Self {
        Self {
            outbound,
            pending: Arc::new(Mutex::new(HashMap::new())),
            call_timeout: DEFAULT_CALL_TIMEOUT,
            max_frame_size: MAX_FRAME_SIZE,
        }
    }

    pub fn from_config(config: &Config, outbound: mpsc::Sender<Vec<u8>>) -> Self {
        Self::new(outbound)
            .with_timeout(config.rpc.timeout)
            .with_max_frame_size(config.rpc.max_frame_size)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    /// Handle an inbound frame from the transport
    pub async fn handle_frame(&self, bytes: &[u8]) -> RpcResult<()> {
        if bytes.len() > self.max_frame_size {
            return Err(RpcError::Malformed(format!(
                "Frame too large: {} bytes (max {})",
                bytes.len(),
                self.max_frame_size
            )));
        }

        let (id, result) = match serde_json::from_slice(bytes)? {
            WireMessage::Response { id, result } => (id, result),
            WireMessage::Request { id, .. } => {
                return Err(RpcError::Malformed(format!(
                    "unexpected inbound request {}",
                    id
                )))
            }
        };

        let response_tx = lock_pending(&self.pending).remove(&id);
        match response_tx {
            Some(response_tx) => {
                let _ = response_tx.send(result.map_err(RpcError::from));
            }
            None => debug!(id = %id, "Dropping response for unknown or expired request"),
        }
        Ok(())
    }

    /// Number of calls still awaiting a response
    pub fn pending_count(&self) -> usize {
        lock_pending(&self.pending).len()
    }

    /// Fail every pending call with [`RpcError::Closed`]
    pub fn close(&self) {
        let drained: Vec<_> = lock_pending(&self.pending).drain().collect();
        for (_, response_tx) in drained {
            let _ = response_tx.send(Err(RpcError::Closed));
        }
    }
}

#[async_trait]
impl RpcGateway for CorrelatingGateway {
    async fn call(&self, request: GatewayRequest) -> RpcResult<GatewayResponse> {
        let id = Uuid::new_v4().to_string();
        let kind = request.kind();
        let bytes = serde_json::to_vec(&WireMessage::Request {
            id: id.clone(),
            request,
        })?;

        let (response_tx, response_rx) = oneshot::channel();
        lock_pending(&self.pending).insert(id.clone(), response_tx);
        let _guard = PendingGuard {
            pending: &self.pending,
            id: &id,
        };

        if let Err(e) = self.outbound.send(bytes).await {
            return Err(RpcError::Transport(format!("Failed to send request: {}", e)));
        }

        match tokio::time::timeout(self.call_timeout, response_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(RpcError::Closed),
            Err(_) => {
                warn!(id = %id, request = kind, "Gateway call timed out");
                Err(RpcError::Timeout {
                    request: kind.to_string(),
                    after: self.call_timeout,
                })
            }
        }
    }
}
