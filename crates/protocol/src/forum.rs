//! Forum-side data: page snapshots, post icons, user groups and search options.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One breadcrumb of the navigation bar: `(label, link)`.
pub type Crumb = (String, String);

/// Raw data of one page of a paginated listing, as scraped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageData<T> {
    /// Breadcrumbs from the board index down to this page.
    pub hierarchy: Vec<Crumb>,
    /// Page number the server says it rendered (1-indexed).
    pub current_page: u32,
    /// Total number of pages in the listing.
    pub total_pages: u32,
    /// Records found on the page.
    pub contents: Vec<T>,
}

impl<T> PageData<T> {
    /// Converts the records of this page, keeping the page metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageData<U> {
        PageData {
            hierarchy: self.hierarchy,
            current_page: self.current_page,
            total_pages: self.total_pages,
            contents: self.contents.into_iter().map(f).collect(),
        }
    }
}

/// Declares a string-backed enum that keeps unknown values in an `Other` arm.
macro_rules! open_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $value:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
            /// A value the forum sent that has no named variant.
            Other(String),
        }

        impl $name {
            /// The value as it appears in forum markup and form fields.
            pub fn as_str(&self) -> &str {
                match self {
                    $( Self::$variant => $value, )+
                    Self::Other(value) => value,
                }
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                match value {
                    $( $value => Self::$variant, )+
                    other => Self::Other(other.to_string()),
                }
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::from(value.as_str())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

open_enum! {
    /// Message icons offered by the post form.
    pub enum PostIcon {
        Standard => "xx",
        ThumbUp => "thumbup",
        ThumbDown => "thumbdown",
        Exclamation => "exclamation",
        Question => "question",
        Lamp => "lamp",
        Smiley => "smiley",
        Angry => "angry",
        Cheesy => "cheesy",
        Grin => "grin",
        Sad => "sad",
        Wink => "wink",
        Poll => "poll",
        Moved => "moved",
        Recycled => "recycled",
        Clip => "clip",
    }
}

impl Default for PostIcon {
    fn default() -> Self {
        Self::Standard
    }
}

open_enum! {
    /// Membergroups shown under a poster's name.
    pub enum UserGroup {
        Tbger => "TBGer",
        TbgTeam => "TBG Team",
        TbgAdmin => "TBG Administrator",
        TbgWiki => "TBG Wiki Bureaucrats",
        TbgWikiAdmin => "TBG Wiki Administrators",
        TbgMod => "TBG Moderators",
        RetiredTbgMod => "Retired TBG Moderators",
    }
}

/// Whether a search matches all of the words or any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    #[default]
    AllWords,
    AnyWords,
}

impl SearchType {
    /// Value of the `searchtype` search parameter.
    pub fn as_param(self) -> &'static str {
        match self {
            Self::AllWords => "1",
            Self::AnyWords => "2",
        }
    }
}

/// Sort key of search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Relevance,
    NumReplies,
    IdMsg,
}

impl SortBy {
    /// Value of the `sort` search parameter.
    pub fn as_param(self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::NumReplies => "num_replies",
            Self::IdMsg => "id_msg",
        }
    }
}

/// Direction of the search result sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Desc,
    Asc,
}

impl SortOrder {
    /// Value of the `sort_dir` search parameter.
    pub fn as_param(self) -> &'static str {
        match self {
            Self::Desc => "desc",
            Self::Asc => "asc",
        }
    }
}
