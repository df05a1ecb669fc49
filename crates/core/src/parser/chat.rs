//! The XML reply of the chat poll endpoint.

use std::collections::BTreeMap;

use chrono::DateTime;
use serde::Deserialize;
use tbg_protocol::{ChatMessageData, ChatPoll, ChatUser};

use crate::error::{Error, Result};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Root {
    infos: Infos,
    users: Users,
    messages: Messages,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Infos {
    info: Vec<Info>,
}

#[derive(Debug, Deserialize)]
struct Info {
    #[serde(rename = "@type")]
    kind: String,
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Users {
    user: Vec<UserNode>,
}

#[derive(Debug, Deserialize)]
struct UserNode {
    #[serde(rename = "@userID")]
    uid: u64,
    #[serde(rename = "@userRole", default)]
    role: String,
    #[serde(rename = "$text", default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Messages {
    message: Vec<MessageNode>,
}

#[derive(Debug, Deserialize)]
struct MessageNode {
    #[serde(rename = "@id")]
    id: u64,
    #[serde(rename = "@dateTime")]
    date_time: String,
    #[serde(rename = "@userID")]
    uid: u64,
    #[serde(rename = "@userRole", default)]
    role: String,
    #[serde(rename = "@channelID", default)]
    channel: u64,
    #[serde(default)]
    username: String,
    #[serde(default)]
    text: String,
}

/// Parses one poll of the chat.
///
/// Message dates are RFC 2822 timestamps.
pub fn parse_chat_response(document: &str) -> Result<ChatPoll> {
    let root: Root = quick_xml::de::from_str(document).map_err(|err| Error::parse("chat response", err.to_string()))?;

    let infos: BTreeMap<String, String> = root.infos.info.into_iter().map(|info| (info.kind, info.value)).collect();
    let users = root
        .users
        .user
        .into_iter()
        .map(|user| ChatUser {
            uid: user.uid,
            group: user.role,
            name: user.name,
        })
        .collect();
    let messages = root
        .messages
        .message
        .into_iter()
        .map(|message| {
            let date = DateTime::parse_from_rfc2822(&message.date_time)
                .map_err(|err| Error::parse("chat message date", format!("{:?}: {err}", message.date_time)))?;
            Ok(ChatMessageData {
                mid: message.id,
                user: ChatUser {
                    uid: message.uid,
                    group: message.role,
                    name: message.username,
                },
                cid: message.channel,
                content: message.text,
                date,
            })
        })
        .collect::<Result<_>>()?;

    Ok(ChatPoll { infos, users, messages })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_reply_is_parsed() {
        let document = r#"<?xml version="1.0" encoding="UTF-8"?>
<root>
  <infos>
    <info type="userID">7</info>
    <info type="userName"><![CDATA[Gilbert]]></info>
  </infos>
  <users>
    <user userID="7" userRole="1" channelID="0" sessionID="x"><![CDATA[Gilbert]]></user>
    <user userID="9" userRole="2" channelID="0" sessionID="y"><![CDATA[Nine]]></user>
  </users>
  <messages>
    <message id="55" dateTime="Tue, 02 Jan 2024 21:41:07 +0100" userID="9" userRole="2" channelID="0">
      <username><![CDATA[Nine]]></username>
      <text><![CDATA[hello <world>]]></text>
    </message>
  </messages>
</root>"#;
        let poll = parse_chat_response(document).unwrap();
        assert_eq!(poll.infos["userID"], "7");
        assert_eq!(poll.infos["userName"], "Gilbert");
        assert_eq!(poll.users.len(), 2);
        assert_eq!(poll.users[1].name, "Nine");
        assert_eq!(poll.users[1].group, "2");

        let message = &poll.messages[0];
        assert_eq!(message.mid, 55);
        assert_eq!(message.user.name, "Nine");
        assert_eq!(message.content, "hello <world>");
        assert_eq!(message.date.to_rfc3339(), "2024-01-02T21:41:07+01:00");
    }

    #[test]
    fn empty_poll_has_no_messages() {
        let poll = parse_chat_response("<root><infos/><users/><messages/></root>").unwrap();
        assert_eq!(poll, ChatPoll::default());
    }

    #[test]
    fn bad_dates_are_parse_errors() {
        let document = r#"<root><messages><message id="1" dateTime="yesterday" userID="1" userRole="0" channelID="0"><username>a</username><text>b</text></message></messages></root>"#;
        assert!(matches!(
            parse_chat_response(document),
            Err(Error::Parse { what: "chat message date", .. })
        ));
    }
}
