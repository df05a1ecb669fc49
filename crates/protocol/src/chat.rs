//! Chat-side data as returned by the chat poll endpoint.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A user as listed by the chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatUser {
    /// Forum user ID.
    pub uid: u64,
    /// Chat role of the user (numeric, as sent by the server).
    pub group: String,
    /// Display name.
    pub name: String,
}

/// A chat message.
///
/// Not to be confused with a forum post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessageData {
    /// Message ID. IDs increase monotonically.
    pub mid: u64,
    /// Poster of the message.
    pub user: ChatUser,
    /// Channel the message was posted in.
    pub cid: u64,
    /// Message text.
    pub content: String,
    /// When the message was posted.
    pub date: DateTime<FixedOffset>,
}

/// Everything one poll of the chat returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatPoll {
    /// Session information, only sent when joining a channel.
    pub infos: BTreeMap<String, String>,
    /// Users currently online in the channel.
    pub users: Vec<ChatUser>,
    /// Messages newer than the last seen ID.
    pub messages: Vec<ChatMessageData>,
}
