//! Session context
//!
//! A [`Session`] is the explicit handle every entity carries: who we are
//! logged in as, the credential for this login, the gateway to talk through and
//! the bus that delivers push notifications. Nothing is looked up ambiently.

use super::errors::{RpcError, RpcResult};
use super::gateway::RpcGateway;
use super::types::{
    FriendRemark, GatewayRequest, GatewayResponse, Message, MuteResponse, PreviousNameList,
    Profile, QuitResponse, RawGroupInfo, SessionKey,
};
use crate::config::Config;
use crate::core_contact::types::{AccountId, ContactId, InternalGroupId};
use crate::core_events::EventBus;
use crate::metrics::{self, Timer};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default time to wait for a correlated response
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(15);

/// Logged-in session shared by all contacts of one account
#[derive(Clone)]
pub struct Session {
    account: AccountId,
    session_key: SessionKey,
    gateway: Arc<dyn RpcGateway>,
    events: EventBus,
    rpc_timeout: Duration,
}

impl Session {
    /// Create a session with the default timeout
    pub fn new(
        account: AccountId,
        session_key: SessionKey,
        gateway: Arc<dyn RpcGateway>,
        events: EventBus,
    ) -> Self {
        Self {
            account,
            session_key,
            gateway,
            events,
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
        }
    }

    /// Create a session whose bus and timeout come from configuration
    pub fn from_config(
        config: &Config,
        account: AccountId,
        session_key: SessionKey,
        gateway: Arc<dyn RpcGateway>,
    ) -> Self {
        Self::new(
            account,
            session_key,
            gateway,
            EventBus::new(config.events.bus_capacity),
        )
        .with_rpc_timeout(config.rpc.timeout)
    }

    /// Set the per-call timeout
    pub fn with_rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = timeout;
        self
    }

    pub fn account(&self) -> AccountId {
        self.account
    }

    pub fn session_key(&self) -> &SessionKey {
        &self.session_key
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn rpc_timeout(&self) -> Duration {
        self.rpc_timeout
    }

    /// Send a request and extract the expected response variant.
    ///
    /// The call is abandoned after `rpc_timeout`; a response of another kind
    /// is a protocol error.
    async fn send_and_expect<T>(
        &self,
        request: GatewayRequest,
        expected: &'static str,
        extract: impl FnOnce(GatewayResponse) -> Result<T, GatewayResponse>,
    ) -> RpcResult<T> {
        let kind = request.kind();
        debug!(request = kind, account = %self.account, "Sending gateway request");
        metrics::record_counter(metrics::RPC_CALLS_TOTAL, 1);
        let timer = Timer::new(metrics::RPC_CALL_DURATION_MS);

        let outcome = tokio::time::timeout(self.rpc_timeout, self.gateway.call(request)).await;
        timer.stop();

        let result = match outcome {
            Err(_) => Err(RpcError::Timeout {
                request: kind.to_string(),
                after: self.rpc_timeout,
            }),
            Ok(Err(e)) => Err(e),
            Ok(Ok(response)) => extract(response).map_err(|other| RpcError::UnexpectedResponse {
                expected,
                actual: other.kind().to_string(),
            }),
        };

        if let Err(e) = &result {
            metrics::record_counter(metrics::RPC_CALLS_FAILED, 1);
            warn!(request = kind, error = %e, "Gateway request failed");
        }
        result
    }

    pub async fn query_group_info(&self, internal_id: InternalGroupId) -> RpcResult<RawGroupInfo> {
        let request = GatewayRequest::QueryGroupInfo {
            account: self.account,
            internal_id,
            session_key: self.session_key.clone(),
        };
        self.send_and_expect(request, "group_info", |response| match response {
            GatewayResponse::GroupInfo(info) => Ok(info),
            other => Err(other),
        })
        .await
    }

    pub async fn quit_group(&self, internal_id: InternalGroupId) -> RpcResult<QuitResponse> {
        let request = GatewayRequest::QuitGroup {
            account: self.account,
            session_key: self.session_key.clone(),
            internal_id,
        };
        self.send_and_expect(request, "quit", |response| match response {
            GatewayResponse::Quit(quit) => Ok(quit),
            other => Err(other),
        })
        .await
    }

    pub async fn send_group_message(
        &self,
        internal_id: InternalGroupId,
        message: Message,
    ) -> RpcResult<()> {
        let request = GatewayRequest::SendGroupMessage {
            account: self.account,
            internal_id,
            session_key: self.session_key.clone(),
            message,
        };
        self.send_and_expect(request, "ack", expect_ack).await
    }

    pub async fn send_direct_message(&self, target: ContactId, message: Message) -> RpcResult<()> {
        let request = GatewayRequest::SendDirectMessage {
            account: self.account,
            target,
            session_key: self.session_key.clone(),
            message,
        };
        self.send_and_expect(request, "ack", expect_ack).await
    }

    /// Mute `target` for `duration_seconds`; zero lifts an existing mute
    pub async fn mute(
        &self,
        internal_id: InternalGroupId,
        target: ContactId,
        duration_seconds: u32,
    ) -> RpcResult<MuteResponse> {
        let request = GatewayRequest::Mute {
            account: self.account,
            internal_id,
            session_key: self.session_key.clone(),
            target,
            duration_seconds,
        };
        self.send_and_expect(request, "mute", |response| match response {
            GatewayResponse::Mute(mute) => Ok(mute),
            other => Err(other),
        })
        .await
    }

    pub async fn query_profile(&self, target: ContactId) -> RpcResult<Profile> {
        let request = GatewayRequest::QueryProfile {
            account: self.account,
            session_key: self.session_key.clone(),
            target,
        };
        self.send_and_expect(request, "profile", |response| match response {
            GatewayResponse::Profile(profile) => Ok(profile),
            other => Err(other),
        })
        .await
    }

    pub async fn query_previous_names(&self, target: ContactId) -> RpcResult<PreviousNameList> {
        let request = GatewayRequest::QueryPreviousNames {
            account: self.account,
            session_key: self.session_key.clone(),
            target,
        };
        self.send_and_expect(request, "previous_names", |response| match response {
            GatewayResponse::PreviousNames(names) => Ok(names),
            other => Err(other),
        })
        .await
    }

    pub async fn query_remark(&self, target: ContactId) -> RpcResult<FriendRemark> {
        let request = GatewayRequest::QueryRemark {
            account: self.account,
            session_key: self.session_key.clone(),
            target,
        };
        self.send_and_expect(request, "remark", |response| match response {
            GatewayResponse::Remark(remark) => Ok(remark),
            other => Err(other),
        })
        .await
    }
}

fn expect_ack(response: GatewayResponse) -> Result<(), GatewayResponse> {
    match response {
        GatewayResponse::Ack => Ok(()),
        other => Err(other),
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("account", &self.account)
            .field("session_key", &self.session_key)
            .field("rpc_timeout", &self.rpc_timeout)
            .finish_non_exhaustive()
    }
}
