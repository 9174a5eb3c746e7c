//! The feed entry point used by the outer layers.

use serde::Serialize;

use super::error::Result;
use super::paginate::{PageNumber, Paginator};
use super::settings::FeedSettings;
use super::stream::{CandidateQuery, CandidateSource, FeedKind};
use crate::social::types::{Message, Viewer};

/// A request for one page of a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedRequest {
    /// Which feed to build.
    pub kind: FeedKind,
    /// Who is looking.
    pub viewer: Viewer,
    /// 1-indexed page number, as supplied by the caller.
    pub page: i64,
}

impl FeedRequest {
    /// Requests the first page of `kind` for `viewer`.
    #[must_use]
    pub const fn new(kind: FeedKind, viewer: Viewer) -> Self {
        Self {
            kind,
            viewer,
            page: 1,
        }
    }

    /// Sets the page number.
    #[must_use]
    pub const fn with_page(mut self, page: i64) -> Self {
        self.page = page;
        self
    }
}

/// One page of a feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedPage {
    /// Visible messages on this page, newest first.
    pub messages: Vec<Message>,
    /// The page number.
    pub page: u64,
    /// Number of pages; at least 1, even for an empty feed.
    pub total_pages: usize,
    /// Number of visible messages in the whole feed.
    pub total_visible: usize,
    /// Whether a later page has messages.
    pub has_more: bool,
}

/// Builds one page of a feed.
///
/// The page number, settings and feed target are validated before any
/// message is read. The page itself and the total count are then produced
/// by two independent walks of the candidate stream.
///
/// # Errors
///
/// - [`FeedError::InvalidPage`](super::FeedError::InvalidPage) for a page below 1
/// - [`FeedError::InvalidSettings`](super::FeedError::InvalidSettings) for a zero page size
/// - [`FeedError::AnonymousViewer`](super::FeedError::AnonymousViewer) for an anonymous home feed
/// - [`FeedError::NotFound`](super::FeedError::NotFound) for a missing profile
/// - [`FeedError::StoreUnavailable`](super::FeedError::StoreUnavailable) if a read fails mid-walk
pub fn feed_page<S>(source: &S, settings: &FeedSettings, request: &FeedRequest) -> Result<FeedPage>
where
    S: CandidateSource + ?Sized,
{
    let page = PageNumber::new(request.page)?;
    settings.validate()?;
    let query = CandidateQuery::resolve(request.kind, request.viewer, source)?;

    let paginator = Paginator::new(source, query, request.viewer, settings.page_size);
    let messages = paginator.page(page)?;
    let total_visible = paginator.count()?;

    Ok(FeedPage {
        messages,
        page: page.get(),
        total_pages: total_visible.div_ceil(settings.page_size).max(1),
        total_visible,
        has_more: total_visible > page.window(settings.page_size).end,
    })
}
