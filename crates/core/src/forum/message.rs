//! Forum posts.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tbg_protocol::PostIcon;

use super::indexed::{HandlerArgs, Indexed, merge_fields, methods};
use super::user::User;
use crate::api::{self, PostForm};
use crate::error::{Error, Result, require};
use crate::parser;
use crate::session::{SessionResolver, UsesSession};

/// Subject used for replies that do not set one.
pub const DEFAULT_SUBJECT: &str = "Reply";

methods! {
    /// Ways to refresh a [`Message`].
    pub enum MessageUpdate {
        /// Find the post on its topic page. Content is rendered HTML.
        Get => "get",
        /// Fetch the raw BBC through the quote endpoint.
        QuoteFast => "quotefast",
    }
}

methods! {
    /// Ways to push a [`Message`].
    pub enum MessageSubmit {
        /// Reply to `tid`.
        Post => "post",
        /// Edit `mid` in `tid`. Takes an optional `reason` argument.
        Edit => "edit",
    }
}

/// A forum post.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Message {
    /// Topic the message is posted in.
    pub tid: Option<u64>,
    pub mid: Option<u64>,
    pub subject: Option<String>,
    /// When the message was posted, in forum time.
    pub date: Option<NaiveDateTime>,
    /// Last edit note, if the message was edited.
    pub edited: Option<String>,
    /// Body; HTML when read with `get`, BBC with `quotefast` or when posting.
    pub content: Option<String>,
    /// The poster.
    pub user: Option<User>,
    pub icon: Option<PostIcon>,
}

impl Message {
    /// A message to be looked up by ID.
    pub fn with_mid(mid: u64) -> Self {
        Self {
            mid: Some(mid),
            ..Self::default()
        }
    }

    /// A new reply to topic `tid`.
    pub fn reply(tid: u64, content: impl Into<String>) -> Self {
        Self {
            tid: Some(tid),
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Takes every field `other` knows.
    pub fn merge(&mut self, other: Message) {
        merge_fields!(self, other; tid, mid, subject, date, edited, content, user, icon);
    }

    fn fetch(&self, resolver: &dyn SessionResolver) -> Result<Self> {
        let (mid,) = require!(self; mid)?;
        let session = resolver.current()?;
        let response = api::get_message_page(&session, mid)?;
        parser::check_errors(&response)?;

        let page = parser::parse_page(&response.body, parser::parse_topic_content)?;
        let Some(found) = page.contents.into_iter().find(|message| message.mid == Some(mid)) else {
            return Err(Error::request(format!("message {mid} is not on the page it redirected to"), response));
        };
        let mut message = self.clone();
        message.merge(found);
        Ok(message)
    }

    fn fetch_source(&self, resolver: &dyn SessionResolver) -> Result<Self> {
        let (mid,) = require!(self; mid)?;
        let session = resolver.current()?;
        let response = api::quote_fast(&session, mid)?;
        if response.body.contains("<html") {
            // An error page instead of XML.
            parser::check_errors(&response)?;
        }
        let parsed = parser::parse_quotefast(&response.body)?;
        let mut message = self.clone();
        message.merge(parsed);
        Ok(message)
    }

    fn form(&self) -> PostForm {
        PostForm {
            message: self.content.clone().unwrap_or_default(),
            subject: self.subject.clone().unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
            icon: self.icon.clone().unwrap_or_default(),
        }
    }

    fn post(&self, resolver: &dyn SessionResolver) -> Result<Self> {
        let (tid,) = require!(self; tid)?;
        let session = resolver.current()?;
        let response = api::post_message(&session, tid, &self.form())?;
        parser::check_errors(&response)?;
        Ok(self.clone())
    }

    fn edit(&self, resolver: &dyn SessionResolver, reason: &str) -> Result<Self> {
        let (mid, tid) = require!(self; mid, tid)?;
        let session = resolver.current()?;
        let response = api::edit_message(&session, mid, tid, &self.form(), reason)?;
        parser::check_errors(&response)?;
        Ok(self.clone())
    }
}

impl UsesSession for Message {}

impl Indexed for Message {
    const ENTITY: &'static str = "Message";
    const FIELDS: &'static [&'static str] = &["tid", "mid", "subject", "date", "edited", "content", "user", "icon"];

    type UpdateMethod = MessageUpdate;
    type SubmitMethod = MessageSubmit;

    fn dispatch_update(&self, method: MessageUpdate, resolver: &dyn SessionResolver, args: HandlerArgs) -> Result<Self> {
        args.finish()?;
        match method {
            MessageUpdate::Get => self.fetch(resolver),
            MessageUpdate::QuoteFast => self.fetch_source(resolver),
        }
    }

    fn dispatch_submit(&self, method: MessageSubmit, resolver: &dyn SessionResolver, mut args: HandlerArgs) -> Result<Self> {
        match method {
            MessageSubmit::Post => {
                args.finish()?;
                self.post(resolver)
            }
            MessageSubmit::Edit => {
                let reason = args.take::<String>("reason")?.unwrap_or_default();
                args.finish()?;
                self.edit(resolver, &reason)
            }
        }
    }
}
