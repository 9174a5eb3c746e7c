//! Visibility-aware pagination.
//!
//! Pages are cut from the *visible* sequence, never from the raw candidate
//! stream: the privacy predicate runs item by item before any offset is
//! taken. Cutting the raw stream first and filtering afterwards would give
//! pages of unpredictable size and shift items across page boundaries.
//!
//! [`Filtered`] is the generic building block: a lazy filtered sequence
//! with a full-walk [`Filtered::total`] and an early-exit
//! [`Filtered::window`]. [`Paginator`] applies it to a feed.

use std::num::NonZeroU64;
use std::ops::Range;

use super::error::{FeedError, Result};
use super::privacy::is_visible;
use super::stream::{CandidateQuery, CandidateSource};
use crate::social::types::{Message, Viewer};

/// A 1-indexed page number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PageNumber(NonZeroU64);

impl PageNumber {
    /// The first page.
    pub const FIRST: Self = Self(NonZeroU64::MIN);

    /// Validates a caller-supplied page number.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::InvalidPage`] for zero or negative page numbers.
    /// Any positive page is accepted; pages past the end are simply empty.
    pub fn new(page: i64) -> Result<Self> {
        u64::try_from(page)
            .ok()
            .and_then(NonZeroU64::new)
            .map(Self)
            .ok_or(FeedError::InvalidPage(page))
    }

    /// Returns the page number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0.get()
    }

    /// Returns the half-open range of visible-item indices on this page.
    #[must_use]
    pub fn window(self, page_size: usize) -> Range<usize> {
        let index = usize::try_from(self.get() - 1).unwrap_or(usize::MAX);
        let start = index.saturating_mul(page_size);
        start..start.saturating_add(page_size)
    }
}

/// A lazy sequence of the items that pass a fallible predicate.
///
/// Errors from the underlying items or from the predicate are yielded, never
/// skipped, so a walk over a `Filtered` sees every failure.
pub struct Filtered<I, P> {
    items: I,
    predicate: P,
}

impl<I, P> Filtered<I, P> {
    /// Wraps `items`, keeping those for which `predicate` returns `Ok(true)`.
    pub const fn new(items: I, predicate: P) -> Self {
        Self { items, predicate }
    }
}

impl<T, E, I, P> Iterator for Filtered<I, P>
where
    I: Iterator<Item = std::result::Result<T, E>>,
    P: FnMut(&T) -> std::result::Result<bool, E>,
{
    type Item = std::result::Result<T, E>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let item = match self.items.next()? {
                Ok(item) => item,
                Err(e) => return Some(Err(e)),
            };
            match (self.predicate)(&item) {
                Ok(true) => return Some(Ok(item)),
                Ok(false) => {}
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

impl<T, E, I, P> Filtered<I, P>
where
    I: Iterator<Item = std::result::Result<T, E>>,
    P: FnMut(&T) -> std::result::Result<bool, E>,
{
    /// Counts the visible items.
    ///
    /// This walks the whole underlying sequence: O(number of items).
    ///
    /// # Errors
    ///
    /// Returns the first error met during the walk.
    pub fn total(self) -> std::result::Result<usize, E> {
        let mut total = 0;
        for item in self {
            item?;
            total += 1;
        }
        Ok(total)
    }

    /// Collects the visible items whose index falls in `window`.
    ///
    /// Stops pulling from the underlying sequence as soon as the window is
    /// full; an empty window pulls nothing.
    ///
    /// # Errors
    ///
    /// Returns the first error met during the walk. No partial window is
    /// returned in that case.
    pub fn window(self, window: Range<usize>) -> std::result::Result<Vec<T>, E> {
        let wanted = window.len();
        let mut page = Vec::with_capacity(wanted.min(64));
        if wanted == 0 {
            return Ok(page);
        }
        for (index, item) in self.enumerate() {
            let item = item?;
            if index < window.start {
                continue;
            }
            page.push(item);
            if page.len() == wanted {
                break;
            }
        }
        Ok(page)
    }
}

/// Pages through one feed for one viewer.
///
/// Every call performs an independent walk from the start of the candidate
/// stream; nothing is cached between calls.
pub struct Paginator<'a, S: ?Sized> {
    source: &'a S,
    query: CandidateQuery,
    viewer: Viewer,
    page_size: usize,
}

impl<'a, S> Paginator<'a, S>
where
    S: CandidateSource + ?Sized,
{
    /// Creates a paginator over `query` as seen by `viewer`.
    pub const fn new(
        source: &'a S,
        query: CandidateQuery,
        viewer: Viewer,
        page_size: usize,
    ) -> Self {
        Self {
            source,
            query,
            viewer,
            page_size,
        }
    }

    /// Counts the messages `viewer` may see in this feed.
    ///
    /// Walks the entire candidate stream: O(number of candidates).
    ///
    /// # Errors
    ///
    /// Returns an error if the stream or the follow graph cannot be read.
    pub fn count(&self) -> Result<usize> {
        let (viewer, global, graph) = (self.viewer, self.query.is_global_feed(), self.source);
        let total = self.source.scan(self.query, |candidates| {
            Filtered::new(candidates, |m: &Message| is_visible(m, viewer, global, graph)).total()
        })?;
        tracing::debug!(query = ?self.query, total, "counted visible messages");
        Ok(total)
    }

    /// Returns the visible messages on `page`, newest first.
    ///
    /// A page past the end is empty. The walk stops once the page is full.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream or the follow graph cannot be read.
    pub fn page(&self, page: PageNumber) -> Result<Vec<Message>> {
        let (viewer, global, graph) = (self.viewer, self.query.is_global_feed(), self.source);
        let window = page.window(self.page_size);
        let messages = self.source.scan(self.query, |candidates| {
            Filtered::new(candidates, |m: &Message| is_visible(m, viewer, global, graph))
                .window(window)
        })?;
        tracing::debug!(
            query = ?self.query,
            page = page.get(),
            returned = messages.len(),
            "walked feed page"
        );
        Ok(messages)
    }

    /// Returns whether any visible message lies past `page`.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream or the follow graph cannot be read.
    pub fn has_more(&self, page: PageNumber) -> Result<bool> {
        Ok(self.count()? > page.window(self.page_size).end)
    }
}
