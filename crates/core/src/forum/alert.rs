//! Profile alerts.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::indexed::{HandlerArgs, Indexed, NoMethod};
use super::message::Message;
use super::paged::{Page, Paged, check_page, page_offset};
use super::topic::Topic;
use super::user::User;
use crate::api;
use crate::error::Result;
use crate::parser;
use crate::session::{SessionResolver, UsesSession};

/// Alerts listed per page.
pub const ALERTS_PER_PAGE: u32 = 25;

/// One alert of the logged-in user.
///
/// Every case carries the alert ID and the time it was raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Alert {
    /// Someone quoted one of the user's messages.
    Quoted {
        aid: u64,
        date: Option<NaiveDateTime>,
        user: User,
        msg: Message,
    },
    /// Someone mentioned the user.
    Mentioned {
        aid: u64,
        date: Option<NaiveDateTime>,
        user: User,
        msg: Message,
    },
    /// Someone started a topic in a watched board.
    NewTopic {
        aid: u64,
        date: Option<NaiveDateTime>,
        user: User,
        topic: Topic,
    },
    /// An alert of a kind this client does not know; `data` is its text.
    Unknown {
        aid: u64,
        date: Option<NaiveDateTime>,
        data: String,
    },
}

impl Alert {
    pub fn aid(&self) -> u64 {
        match self {
            Self::Quoted { aid, .. } | Self::Mentioned { aid, .. } | Self::NewTopic { aid, .. } | Self::Unknown { aid, .. } => *aid,
        }
    }

    pub fn date(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Quoted { date, .. } | Self::Mentioned { date, .. } | Self::NewTopic { date, .. } | Self::Unknown { date, .. } => *date,
        }
    }

    /// The member that raised the alert, if known.
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Quoted { user, .. } | Self::Mentioned { user, .. } | Self::NewTopic { user, .. } => Some(user),
            Self::Unknown { .. } => None,
        }
    }
}

impl UsesSession for Alert {}

impl Indexed for Alert {
    const ENTITY: &'static str = "Alert";
    const FIELDS: &'static [&'static str] = &["aid", "date"];

    type UpdateMethod = NoMethod;
    type SubmitMethod = NoMethod;

    fn dispatch_update(&self, method: NoMethod, _: &dyn SessionResolver, _: HandlerArgs) -> Result<Self> {
        match method {}
    }

    fn dispatch_submit(&self, method: NoMethod, _: &dyn SessionResolver, _: HandlerArgs) -> Result<Self> {
        match method {}
    }
}

/// The alert list of the logged-in user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Alerts {
    pages: Option<u32>,
}

impl Alerts {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UsesSession for Alerts {}

impl Paged for Alerts {
    type Item = Alert;

    fn get_page_in(&mut self, resolver: &dyn SessionResolver, page: u32) -> Result<Page<Alert>> {
        let session = resolver.current()?;
        let response = api::alerts(&session, page_offset(page, ALERTS_PER_PAGE))?;
        parser::check_errors(&response)?;

        let data = parser::parse_page(&response.body, parser::parse_alerts_content)?;
        check_page("Alerts", page, &data);
        self.pages = Some(data.total_pages);
        Ok(data.into())
    }

    fn get_size(&self) -> Option<u32> {
        self.pages
    }
}
