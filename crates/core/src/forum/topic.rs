//! Topics.

use serde::{Deserialize, Serialize};

use super::indexed::{HandlerArgs, Indexed, NoMethod, methods};
use super::message::Message;
use super::paged::{Page, Paged, check_page, page_offset};
use crate::api;
use crate::error::{Error, Result, require};
use crate::parser;
use crate::session::{SessionResolver, UsesSession};

methods! {
    /// Ways to refresh a [`Topic`].
    pub enum TopicUpdate {
        /// Read the first page for the name and page count.
        Get => "get",
    }
}

/// A topic: a paginated list of messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Topic {
    pub tid: Option<u64>,
    pub topic_name: Option<String>,
    /// Number of pages, known after the first fetch.
    pub pages: Option<u32>,
}

impl Topic {
    pub fn new(tid: u64) -> Self {
        Self {
            tid: Some(tid),
            ..Self::default()
        }
    }

    fn fetch(&self, resolver: &dyn SessionResolver) -> Result<Self> {
        let mut topic = self.clone();
        let page = topic.get_page_in(resolver, 1)?;
        let name = page
            .title()
            .ok_or_else(|| Error::parse("topic", "page has no navigation breadcrumbs"))?;
        topic.topic_name = Some(name.to_string());
        topic.pages = Some(page.total_pages);
        Ok(topic)
    }
}

impl UsesSession for Topic {}

impl Indexed for Topic {
    const ENTITY: &'static str = "Topic";
    const FIELDS: &'static [&'static str] = &["tid", "topic_name", "pages"];

    type UpdateMethod = TopicUpdate;
    type SubmitMethod = NoMethod;

    fn dispatch_update(&self, method: TopicUpdate, resolver: &dyn SessionResolver, args: HandlerArgs) -> Result<Self> {
        args.finish()?;
        match method {
            TopicUpdate::Get => self.fetch(resolver),
        }
    }

    fn dispatch_submit(&self, method: NoMethod, _: &dyn SessionResolver, _: HandlerArgs) -> Result<Self> {
        match method {}
    }
}

impl Paged for Topic {
    type Item = Message;

    fn get_page_in(&mut self, resolver: &dyn SessionResolver, page: u32) -> Result<Page<Message>> {
        let (tid,) = require!(self; tid)?;
        let session = resolver.current()?;
        let start = page_offset(page, session.config().topic_per_page);
        let response = api::get_topic_page(&session, tid, start)?;
        parser::check_errors(&response)?;

        let mut data = parser::parse_page(&response.body, parser::parse_topic_content)?;
        check_page(Self::ENTITY, page, &data);
        for message in &mut data.contents {
            message.tid.get_or_insert(tid);
        }
        self.pages = Some(data.total_pages);
        Ok(data.into())
    }

    fn get_size(&self) -> Option<u32> {
        self.pages
    }
}
