//! In-memory gateway
//!
//! Answers every request locally and records it, so tests can assert on the
//! exact remote commands an operation produced.

use crate::core_contact::types::{ContactId, InternalGroupId};
use crate::core_gateway::errors::{RpcError, RpcResult};
use crate::core_gateway::gateway::RpcGateway;
use crate::core_gateway::types::{
    FriendRemark, GatewayRequest, GatewayResponse, MuteResponse, PreviousNameList, Profile,
    QuitResponse, RawGroupInfo,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Error code returned for a group the mock knows nothing about
pub const UNKNOWN_GROUP_CODE: i32 = 404;

#[derive(Default)]
struct MockState {
    group_infos: HashMap<InternalGroupId, RawGroupInfo>,
    responses: HashMap<&'static str, GatewayResponse>,
    failures: HashMap<&'static str, RpcError>,
    calls: Vec<GatewayRequest>,
    delay: Option<Duration>,
}

/// Scriptable [`RpcGateway`] backed by in-memory state
#[derive(Default)]
pub struct MockGateway {
    state: Mutex<MockState>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot returned by `QueryGroupInfo` for `internal_id`
    pub fn set_group_info(&self, internal_id: InternalGroupId, info: RawGroupInfo) {
        self.lock().group_infos.insert(internal_id, info);
    }

    /// Override the response for every request of `kind`
    pub fn respond_with(&self, kind: &'static str, response: GatewayResponse) {
        self.lock().responses.insert(kind, response);
    }

    /// Fail every request of `kind` with `error`
    pub fn fail_with(&self, kind: &'static str, error: RpcError) {
        self.lock().failures.insert(kind, error);
    }

    /// Stop failing requests of `kind`
    pub fn clear_failure(&self, kind: &'static str) {
        self.lock().failures.remove(kind);
    }

    /// Delay every answer by `delay`
    pub fn set_delay(&self, delay: Duration) {
        self.lock().delay = Some(delay);
    }

    /// Every request received so far, in order
    pub fn calls(&self) -> Vec<GatewayRequest> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, kind: &str) -> usize {
        self.lock().calls.iter().filter(|c| c.kind() == kind).count()
    }

    /// `(group, target, duration)` of every mute command received
    pub fn mute_calls(&self) -> Vec<(InternalGroupId, ContactId, u32)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                GatewayRequest::Mute {
                    internal_id,
                    target,
                    duration_seconds,
                    ..
                } => Some((*internal_id, *target, *duration_seconds)),
                _ => None,
            })
            .collect()
    }

    fn answer(state: &MockState, request: &GatewayRequest) -> RpcResult<GatewayResponse> {
        let kind = request.kind();
        if let Some(error) = state.failures.get(kind) {
            return Err(error.clone());
        }
        if let Some(response) = state.responses.get(kind) {
            return Ok(response.clone());
        }

        let response = match request {
            GatewayRequest::QueryGroupInfo { internal_id, .. } => {
                let info = state.group_infos.get(internal_id).cloned().ok_or_else(|| {
                    RpcError::Protocol {
                        code: UNKNOWN_GROUP_CODE,
                        message: format!("unknown group {}", internal_id),
                    }
                })?;
                GatewayResponse::GroupInfo(info)
            }
            GatewayRequest::QuitGroup { .. } => GatewayResponse::Quit(QuitResponse::Quit),
            GatewayRequest::SendGroupMessage { .. } | GatewayRequest::SendDirectMessage { .. } => {
                GatewayResponse::Ack
            }
            GatewayRequest::Mute { .. } => GatewayResponse::Mute(MuteResponse),
            GatewayRequest::QueryProfile { target, .. } => GatewayResponse::Profile(Profile {
                nickname: format!("user-{}", target),
                gender: None,
                age: None,
                signature: None,
            }),
            GatewayRequest::QueryPreviousNames { .. } => {
                GatewayResponse::PreviousNames(PreviousNameList(Vec::new()))
            }
            GatewayRequest::QueryRemark { .. } => GatewayResponse::Remark(FriendRemark(String::new())),
        };
        Ok(response)
    }
}

#[async_trait]
impl RpcGateway for MockGateway {
    async fn call(&self, request: GatewayRequest) -> RpcResult<GatewayResponse> {
        let (delay, result) = {
            let mut state = self.lock();
            state.calls.push(request.clone());
            (state.delay, Self::answer(&state, &request))
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }
}
