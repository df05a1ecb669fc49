//! Message searches.
//!
//! Searching is slow on the forum side; each page is a full query.

use std::io::Write;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use serde::{Deserialize, Serialize};
use tbg_protocol::{SearchType, SortBy, SortOrder};

use super::indexed::{HandlerArgs, Indexed, NoMethod, methods};
use super::message::Message;
use super::paged::{Page, Paged, check_page, page_offset};
use crate::api;
use crate::error::Result;
use crate::parser;
use crate::session::{SessionResolver, UsesSession};

/// Boards searched by default.
pub const DEFAULT_FORUMS: [u32; 4] = [2, 3, 5, 6];

methods! {
    /// Ways to refresh a [`Search`].
    pub enum SearchUpdate {
        /// Run the first page to learn the page count.
        Get => "get",
    }
}

/// A search query over forum posts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Search {
    /// Text to search for.
    pub query: String,
    /// Match all of the words or any of them.
    #[serde(rename = "match")]
    pub match_type: SearchType,
    /// Comma-separated member names; `*` means everyone.
    pub user: String,
    pub sort: SortBy,
    pub order: SortOrder,
    /// Show results as complete messages.
    pub complete: bool,
    pub subject_only: bool,
    /// Minimum post age, in days.
    pub min_age: u32,
    /// Maximum post age, in days.
    pub max_age: u32,
    /// Board IDs to search.
    pub forums: Vec<u32>,
    /// Number of result pages, known after the first fetch.
    pub pages: Option<u32>,
}

impl Default for Search {
    fn default() -> Self {
        Self {
            query: String::new(),
            match_type: SearchType::default(),
            user: "*".to_string(),
            sort: SortBy::default(),
            order: SortOrder::default(),
            complete: false,
            subject_only: false,
            min_age: 0,
            max_age: 9999,
            forums: DEFAULT_FORUMS.to_vec(),
            pages: None,
        }
    }
}

impl Search {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Search fields in the order the forum serializes them.
    fn fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("advanced", "1".to_string()),
            ("brd", self.forums.iter().map(u32::to_string).collect::<Vec<_>>().join(",")),
            ("sort", self.sort.as_param().to_string()),
            ("sort_dir", self.order.as_param().to_string()),
            ("search", self.query.clone()),
            ("minage", self.min_age.to_string()),
            ("maxage", self.max_age.to_string()),
            ("searchtype", self.match_type.as_param().to_string()),
            ("userspec", self.user.clone()),
        ];
        if self.complete {
            fields.push(("show_complete", String::new()));
        }
        if self.subject_only {
            fields.push(("subject_only", String::new()));
        }
        fields
    }

    /// The `params` value of the search action: zlib-compressed fields in
    /// URL-safe base64.
    pub fn encoded_params(&self) -> Result<String> {
        let joined = self
            .fields()
            .into_iter()
            .map(|(key, value)| format!("{key}|'|{value}"))
            .collect::<Vec<_>>()
            .join("|\"|");

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(joined.as_bytes())?;
        let compressed = encoder.finish()?;

        Ok(STANDARD
            .encode(compressed)
            .chars()
            .map(|c| match c {
                '+' => '-',
                '/' => '_',
                '=' => '.',
                other => other,
            })
            .collect())
    }
}

impl UsesSession for Search {}

impl Indexed for Search {
    const ENTITY: &'static str = "Search";
    const FIELDS: &'static [&'static str] = &[
        "query", "match", "user", "sort", "order", "complete", "subject_only", "min_age", "max_age", "forums",
    ];

    type UpdateMethod = SearchUpdate;
    type SubmitMethod = NoMethod;

    fn dispatch_update(&self, method: SearchUpdate, resolver: &dyn SessionResolver, args: HandlerArgs) -> Result<Self> {
        args.finish()?;
        match method {
            SearchUpdate::Get => {
                let mut search = self.clone();
                search.get_page_in(resolver, 1)?;
                Ok(search)
            }
        }
    }

    fn dispatch_submit(&self, method: NoMethod, _: &dyn SessionResolver, _: HandlerArgs) -> Result<Self> {
        match method {}
    }
}

impl Paged for Search {
    type Item = Message;

    fn get_page_in(&mut self, resolver: &dyn SessionResolver, page: u32) -> Result<Page<Message>> {
        let params = self.encoded_params()?;
        let session = resolver.current()?;
        let start = page_offset(page, session.config().search_per_page);
        let response = api::search(&session, &params, start)?;
        parser::check_errors(&response)?;

        let data = parser::parse_page(&response.body, parser::parse_search_content)?;
        check_page(Self::ENTITY, page, &data);
        self.pages = Some(data.total_pages);
        Ok(data.into())
    }

    fn get_size(&self) -> Option<u32> {
        self.pages
    }
}
