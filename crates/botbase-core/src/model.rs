//! Chat messages and conversations as seen by the server.
//!
//! These types are produced by a transport and passed through to handlers
//! unmodified. Only the fields the server itself routes on are modelled.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a conversation on the chat backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConvId(String);

impl ConvId {
    /// Creates an ID from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConvId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ConvId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ConvId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ConvId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Membership kind of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MembersType {
    /// A team channel.
    Team,
    /// A direct (private) conversation between users.
    #[default]
    Direct,
}

/// Channel metadata attached to messages and conversations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Channel {
    /// Display name: the team name, or the comma-joined member list.
    pub name: String,
    /// Membership kind.
    #[serde(default)]
    pub members_type: MembersType,
    /// Topic name inside a team, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_name: Option<String>,
}

impl Channel {
    /// Creates a direct channel.
    pub fn direct(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members_type: MembersType::Direct,
            topic_name: None,
        }
    }

    /// Creates a team channel.
    pub fn team(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members_type: MembersType::Team,
            topic_name: None,
        }
    }

    /// Returns true if this is a team channel.
    pub fn is_team(&self) -> bool {
        self.members_type == MembersType::Team
    }
}

/// Who sent a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Sender {
    /// Account name of the sender.
    pub username: String,
    /// Name of the device the message was sent from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
}

/// A message received on a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Conversation the message was posted in.
    pub conv_id: ConvId,
    /// Sender identity.
    pub sender: Sender,
    /// Channel metadata.
    pub channel: Channel,
    /// Text body. `None` for non-text content (attachments, reactions, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Message {
    /// Creates a text message.
    pub fn text(
        conv_id: impl Into<ConvId>,
        sender: impl Into<String>,
        channel: Channel,
        body: impl Into<String>,
    ) -> Self {
        Self {
            conv_id: conv_id.into(),
            sender: Sender {
                username: sender.into(),
                device_name: None,
            },
            channel,
            text: Some(body.into()),
        }
    }

    /// Returns the sender's account name.
    pub fn sender_name(&self) -> &str {
        &self.sender.username
    }
}

/// A conversation the bot was newly added to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvSummary {
    /// Conversation identifier.
    pub id: ConvId,
    /// Channel metadata.
    pub channel: Channel,
    /// Backend-specific fields passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ConvSummary {
    /// Creates a summary with no extra fields.
    pub fn new(id: impl Into<ConvId>, channel: Channel) -> Self {
        Self {
            id: id.into(),
            channel,
            extra: serde_json::Map::new(),
        }
    }
}
