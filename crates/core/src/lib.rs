//! tbgclient: a client for the TBG forums.
//!
//! The forum runs SMF and has no API, so everything here works by submitting
//! the same forms a browser would and scraping the pages that come back.
//!
//! Entities ([`User`], [`Topic`], [`Message`], [`Search`], [`Alert`]) find the
//! [`Session`] to talk through on their own: the innermost scope entered on
//! the current thread or task, else the process-wide default. A session can
//! also be attached to a value with [`UsesSession::using`].
//!
//! ```no_run
//! use tbgclient::{Indexed, Message, Session};
//!
//! # fn main() -> tbgclient::Result<()> {
//! let session = Session::new()?;
//! session.login("user", "hunter2")?;
//! let _scope = session.enter();
//!
//! let mut message = Message::with_mid(12345);
//! message.update(None, Default::default())?;
//! println!("{:?}", message.content);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod forum;
pub mod parser;
pub mod session;
pub mod transport;

pub use chat::{ChatConnection, ChatMessage, ChatUser};
pub use config::ForumConfig;
pub use error::{Error, Result};
pub use forum::{
    ALERTS_PER_PAGE, Alert, Alerts, DEFAULT_FORUMS, DEFAULT_SUBJECT, HandlerArgs, Indexed, Kwargs, Message, MessageSubmit,
    MessageUpdate, Method, NoMethod, Page, Paged, Pages, Search, SearchUpdate, Topic, TopicUpdate, User, UserSubmit,
    UserUpdate, kwargs, page_for_index,
};
pub use session::{
    ExecutionContext, SESSION_COOKIE, Session, SessionContext, SessionRegistry, SessionResolver, SessionScope, SessionUser,
    UsesSession, registry,
};
pub use tbg_protocol::{Crumb, PageData, PostIcon, SearchType, SortBy, SortOrder, UserGroup};
pub use transport::{FakeTransport, FakeTransportBuilder, FakeTransportController, HttpRequest, HttpResponse, ReqwestTransport, Transport};
