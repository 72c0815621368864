use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::ScopeKey;

/// Messages sent to the console over the presence socket
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SendMessage {
    Connect {
        project_id: String,
        workflow_id: String,
        version: u32,
    },
}

impl From<&ScopeKey> for SendMessage {
    fn from(scope: &ScopeKey) -> Self {
        SendMessage::Connect {
            project_id: scope.project_id().to_string(),
            workflow_id: scope.workflow_id().to_string(),
            version: scope.version(),
        }
    }
}

/// Messages pushed by the console to every viewer of a scope
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReceivedMessage {
    MemberJoined {
        member_id: String,
        name: String,
        avatar: String,
    },
    MemberLeft {
        member_id: String,
    },
    #[serde(other)]
    Unknown,
}

impl ReceivedMessage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MemberJoined { .. } => "member_joined",
            Self::MemberLeft { .. } => "member_left",
            Self::Unknown => "unknown",
        }
    }
}

/// Decode an inbound text frame. Malformed payloads are logged and dropped.
pub fn decode_event(text: &str) -> Option<ReceivedMessage> {
    match serde_json::from_str::<ReceivedMessage>(text) {
        Ok(msg) => Some(msg),
        Err(e) => {
            warn!("Dropping malformed presence message: {}", e);
            None
        }
    }
}
