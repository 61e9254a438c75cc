//! Request and response payloads exchanged with the session gateway

use crate::core_contact::types::{AccountId, ContactId, InternalGroupId, PermissionLevel};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Credential issued by the session layer after login.
///
/// The bytes are wiped when the key is dropped and never printed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey(Vec<u8>);

impl SessionKey {
    pub fn new(bytes: Vec<u8>) -> Self {
        SessionKey(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Short fingerprint safe to put in logs
    pub fn fingerprint(&self) -> String {
        hex::encode(&self.0[..self.0.len().min(4)])
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionKey({}..)", self.fingerprint())
    }
}

/// Outgoing message content. Formatting is owned by the message layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message(pub String);

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Message(text.to_string())
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Message(text)
    }
}

/// One member entry as reported by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMember {
    pub id: ContactId,
    pub permission: PermissionLevel,
}

impl RawMember {
    pub fn new(id: impl Into<ContactId>, permission: PermissionLevel) -> Self {
        Self {
            id: id.into(),
            permission,
        }
    }
}

/// Unparsed group snapshot returned by `QueryGroupInfo`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawGroupInfo {
    pub owner: ContactId,
    pub name: String,
    pub announcement: String,
    pub members: Vec<RawMember>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuitResponse {
    Quit,
    /// Owners must transfer the group before leaving
    OwnerCannotQuit,
    NotMember,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MuteResponse;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub nickname: String,
    pub gender: Option<String>,
    pub age: Option<u16>,
    pub signature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviousNameList(pub Vec<String>);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendRemark(pub String);

/// Typed request understood by the session gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum GatewayRequest {
    QueryGroupInfo {
        account: AccountId,
        internal_id: InternalGroupId,
        session_key: SessionKey,
    },
    QuitGroup {
        account: AccountId,
        session_key: SessionKey,
        internal_id: InternalGroupId,
    },
    SendGroupMessage {
        account: AccountId,
        internal_id: InternalGroupId,
        session_key: SessionKey,
        message: Message,
    },
    SendDirectMessage {
        account: AccountId,
        target: ContactId,
        session_key: SessionKey,
        message: Message,
    },
    Mute {
        account: AccountId,
        internal_id: InternalGroupId,
        session_key: SessionKey,
        target: ContactId,
        duration_seconds: u32,
    },
    QueryProfile {
        account: AccountId,
        session_key: SessionKey,
        target: ContactId,
    },
    QueryPreviousNames {
        account: AccountId,
        session_key: SessionKey,
        target: ContactId,
    },
    QueryRemark {
        account: AccountId,
        session_key: SessionKey,
        target: ContactId,
    },
}

impl GatewayRequest {
    /// Stable name of the request, used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayRequest::QueryGroupInfo { .. } => "query_group_info",
            GatewayRequest::QuitGroup { .. } => "quit_group",
            GatewayRequest::SendGroupMessage { .. } => "send_group_message",
            GatewayRequest::SendDirectMessage { .. } => "send_direct_message",
            GatewayRequest::Mute { .. } => "mute",
            GatewayRequest::QueryProfile { .. } => "query_profile",
            GatewayRequest::QueryPreviousNames { .. } => "query_previous_names",
            GatewayRequest::QueryRemark { .. } => "query_remark",
        }
    }
}

/// Typed response produced by the session gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "body")]
pub enum GatewayResponse {
    GroupInfo(RawGroupInfo),
    Quit(QuitResponse),
    Ack,
    Mute(MuteResponse),
    Profile(Profile),
    PreviousNames(PreviousNameList),
    Remark(FriendRemark),
}

impl GatewayResponse {
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayResponse::GroupInfo(_) => "group_info",
            GatewayResponse::Quit(_) => "quit",
            GatewayResponse::Ack => "ack",
            GatewayResponse::Mute(_) => "mute",
            GatewayResponse::Profile(_) => "profile",
            GatewayResponse::PreviousNames(_) => "previous_names",
            GatewayResponse::Remark(_) => "remark",
        }
    }
}
