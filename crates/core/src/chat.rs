//! The forum chat.
//!
//! The chat is polled: each [`ChatConnection::poll`] asks for messages newer
//! than the last one seen and buffers them until read with
//! [`ChatConnection::messages`]. Driving the poll loop is up to the caller.

use std::collections::BTreeMap;

use tracing::debug;
use url::Url;

pub use tbg_protocol::{ChatMessageData as ChatMessage, ChatPoll, ChatUser};

use crate::api;
use crate::error::{Error, Result};
use crate::parser;
use crate::session::Session;
use crate::transport::{HttpRequest, HttpResponse};

/// A connection to the chat, bound to a logged-in session.
#[derive(Debug)]
pub struct ChatConnection {
    session: Session,
    last_mid: Option<u64>,
    buffer: BTreeMap<u64, ChatMessage>,
    users: Vec<ChatUser>,
}

impl ChatConnection {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            last_mid: None,
            buffer: BTreeMap::new(),
            users: Vec::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// ID of the newest message seen so far.
    pub fn last_mid(&self) -> Option<u64> {
        self.last_mid
    }

    /// Users online in the channel as of the last poll.
    pub fn users(&self) -> &[ChatUser] {
        &self.users
    }

    /// Fetches new messages into the buffer.
    ///
    /// Returns the connection infos; these are only sent on the first poll.
    pub fn poll(&mut self) -> Result<BTreeMap<String, String>> {
        let mut url = Url::parse(&self.session.config().chat_url)
            .map_err(|err| Error::Config(format!("invalid chat URL: {err}")))?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(last_mid) = self.last_mid {
                query.append_pair("lastID", &last_mid.to_string());
            }
            query.append_pair("ajax", "true");
        }

        let response = api::request(&self.session, HttpRequest::get(url.as_str()))?;
        let poll = parser::parse_chat_response(&response.body)?;
        debug!(target: "tbg.chat", messages = poll.messages.len(), users = poll.users.len(), "polled");

        for message in poll.messages {
            self.last_mid = Some(self.last_mid.map_or(message.mid, |last| last.max(message.mid)));
            self.buffer.insert(message.mid, message);
        }
        self.users = poll.users;
        Ok(poll.infos)
    }

    /// Drains buffered messages, oldest first.
    pub fn messages(&mut self) -> impl Iterator<Item = ChatMessage> + use<> {
        std::mem::take(&mut self.buffer).into_values()
    }

    /// Posts `text` to the chat. Commands such as `/quit` are sent the same way.
    pub fn send(&self, text: &str) -> Result<HttpResponse> {
        debug!(target: "tbg.chat", len = text.len(), "sending");
        let request = HttpRequest::post(self.session.config().chat_url.as_str()).with_form([("ajax", text)]);
        api::request(&self.session, request)
    }
}
