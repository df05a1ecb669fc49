//! Paginated listings.

use serde::{Deserialize, Serialize};
use tbg_protocol::{Crumb, PageData};
use tracing::warn;

use crate::error::{Error, Result};
use crate::session::{SessionResolver, registry};

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Breadcrumbs from the board index down to this page.
    pub hierarchy: Vec<Crumb>,
    /// Page number as rendered by the server (1-indexed).
    pub current_page: u32,
    pub total_pages: u32,
    pub contents: Vec<T>,
}

impl<T> Page<T> {
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.contents.iter()
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Returns `true` if no page follows this one.
    pub fn is_last(&self) -> bool {
        self.current_page >= self.total_pages
    }

    /// Label of the innermost breadcrumb.
    pub fn title(&self) -> Option<&str> {
        self.hierarchy.last().map(|(label, _)| label.as_str())
    }
}

impl<T> From<PageData<T>> for Page<T> {
    fn from(data: PageData<T>) -> Self {
        Self {
            hierarchy: data.hierarchy,
            current_page: data.current_page,
            total_pages: data.total_pages,
            contents: data.contents,
        }
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.contents.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Page<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.contents.iter()
    }
}

/// A listing fetched one page per call.
///
/// Every [`get_page`](Self::get_page) is exactly one request; nothing is
/// cached. The page count may be unknown until the first fetch.
pub trait Paged {
    type Item;

    /// Fetches page `page` (1-indexed) with an explicit session resolver.
    fn get_page_in(&mut self, resolver: &dyn SessionResolver, page: u32) -> Result<Page<Self::Item>>;

    /// Total number of pages, if known.
    fn get_size(&self) -> Option<u32>;

    /// Fetches page `page` (1-indexed) using the ambient session.
    ///
    /// A server that renders another page than requested is not an error:
    /// the returned page is what the server sent, and a warning is logged.
    fn get_page(&mut self, page: u32) -> Result<Page<Self::Item>> {
        self.get_page_in(registry(), page)
    }

    /// Fetches a page by 0-based index. Negative indices count from the end
    /// and need a known size.
    fn get(&mut self, index: isize) -> Result<Page<Self::Item>> {
        let page = page_for_index(index, self.get_size())?;
        self.get_page(page)
    }

    /// Iterates pages from the first to the last, one request per step.
    fn pages(&mut self) -> Pages<'_, Self>
    where
        Self: Sized,
    {
        self.pages_in(registry())
    }

    /// [`pages`](Self::pages) with an explicit session resolver.
    fn pages_in<'a>(&'a mut self, resolver: &'a dyn SessionResolver) -> Pages<'a, Self>
    where
        Self: Sized,
    {
        Pages {
            paged: self,
            resolver,
            next: Some(1),
        }
    }
}

/// Iterator over the pages of a [`Paged`] listing.
///
/// Stops after the page the server reports as last, or after the first error.
pub struct Pages<'a, P> {
    paged: &'a mut P,
    resolver: &'a dyn SessionResolver,
    next: Option<u32>,
}

impl<P: Paged> Iterator for Pages<'_, P> {
    type Item = Result<Page<P::Item>>;

    fn next(&mut self) -> Option<Self::Item> {
        let requested = self.next.take()?;
        match self.paged.get_page_in(self.resolver, requested) {
            Ok(page) => {
                if !page.is_last() && requested < page.total_pages {
                    self.next = Some(requested + 1);
                }
                Some(Ok(page))
            }
            Err(err) => Some(Err(err)),
        }
    }
}

/// Maps a 0-based, possibly negative index to a 1-based page number.
pub fn page_for_index(index: isize, size: Option<u32>) -> Result<u32> {
    match size {
        Some(size) => {
            let resolved = if index < 0 { index + size as isize } else { index };
            if resolved < 0 || resolved >= size as isize {
                return Err(Error::IndexOutOfRange { index, size });
            }
            Ok(resolved as u32 + 1)
        }
        None if index < 0 => Err(Error::UnknownSize { index }),
        None => index
            .checked_add(1)
            .and_then(|page| u32::try_from(page).ok())
            .ok_or(Error::UnknownSize { index }),
    }
}

/// Offset of the first item on 1-based `page`, as the forum's `start` parameter.
pub(crate) fn page_offset(page: u32, per_page: u32) -> u64 {
    u64::from(page.saturating_sub(1)) * u64::from(per_page)
}

/// Logs a warning when the server rendered another page than requested.
pub(crate) fn check_page<T>(entity: &'static str, requested: u32, page: &PageData<T>) {
    if page.current_page != requested {
        warn!(
            target: "tbg.paged",
            entity,
            requested,
            received = page.current_page,
            "server returned a different page than requested"
        );
    }
}
