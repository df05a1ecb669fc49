//! Forum entities and the protocols they share.
//!
//! Every entity is a record of optional fields plus the [`Indexed`]
//! update/submit protocol; [`Topic`], [`Search`] and [`Alerts`] are also
//! [`Paged`]. None of them holds a session: each network call resolves one
//! through the ambient registry, or through the resolver passed to the
//! `*_in` variants.

mod alert;
mod indexed;
mod message;
mod paged;
mod search;
mod topic;
mod user;

pub use alert::{ALERTS_PER_PAGE, Alert, Alerts};
pub use indexed::{HandlerArgs, Indexed, Kwargs, Method, NoMethod, kwargs};
pub use message::{DEFAULT_SUBJECT, Message, MessageSubmit, MessageUpdate};
pub use paged::{Page, Paged, Pages, page_for_index};
pub use search::{DEFAULT_FORUMS, Search, SearchUpdate};
pub use topic::{Topic, TopicUpdate};
pub use user::{User, UserSubmit, UserUpdate};
