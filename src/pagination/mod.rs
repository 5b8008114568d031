//! Cursor pagination manager.
//!
//! openFDA only hands out a "next" cursor with each page. This module
//! remembers, per search session, the page fetched for every page number
//! together with the cursor that leads to the page after it. Going back is
//! then a cache lookup, and going forward consumes the cursor stored on the
//! previous page.
//!
//! Every operation takes the session explicitly; nothing here holds state
//! of its own. The session is only mutated after a fetch has completed, so
//! a failed fetch leaves the cache and the current page exactly as they
//! were.

pub mod cursor;
pub mod source;

pub use cursor::{cursor_from_next_page_url, CURSOR_PARAM};
pub use source::{FetchedPage, PageSource};

use crate::error::FetchError;
use crate::models::{ReactionCount, ResponseMeta};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Page size used when none is configured.
pub const DEFAULT_PAGE_SIZE: u32 = 5;

/// One fetched page, as stored in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEntry {
    pub reactions: Vec<ReactionCount>,
    /// Cursor that was (or will be) consumed to fetch the following page.
    pub next_cursor: Option<String>,
}

/// Fetched pages keyed by 1-based page number.
#[derive(Debug, Clone, Default)]
pub struct PageCache {
    pages: HashMap<u32, PageEntry>,
}

impl PageCache {
    pub fn get(&self, page: u32) -> Option<&PageEntry> {
        self.pages.get(&page)
    }

    pub fn has(&self, page: u32) -> bool {
        self.pages.contains_key(&page)
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Cached page numbers in ascending order.
    pub fn pages(&self) -> Vec<u32> {
        let mut pages: Vec<u32> = self.pages.keys().copied().collect();
        pages.sort_unstable();
        pages
    }

    fn insert(&mut self, page: u32, entry: PageEntry) {
        self.pages.insert(page, entry);
    }
}

/// Where a session is in its fetch lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Fetching,
    Ready,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Fetching => write!(f, "fetching"),
            SessionState::Ready => write!(f, "ready"),
            SessionState::Failed => write!(f, "failed"),
        }
    }
}

/// State of one search: the query, where the user is, and what has been
/// fetched so far.
#[derive(Debug, Clone)]
pub struct SearchSession {
    pub query: String,
    /// Page size sent with every request.
    pub limit: u32,
    /// 1-based page the user is looking at.
    pub current_page: u32,
    /// Total number of matching reports, as of the last successful fetch.
    pub total_results: u64,
    pub cache: PageCache,
    pub state: SessionState,
    /// Message of the last failed fetch, shown until dismissed or a fetch
    /// succeeds.
    pub last_error: Option<String>,
    /// Disclaimer and last-updated date from the last successful fetch.
    pub meta: Option<ResponseMeta>,
}

impl SearchSession {
    pub fn new(query: impl Into<String>, limit: u32) -> Self {
        Self {
            query: query.into(),
            limit: limit.max(1),
            current_page: 1,
            total_results: 0,
            cache: PageCache::default(),
            state: SessionState::Idle,
            last_error: None,
            meta: None,
        }
    }

    /// Entry for the page the user is on, if it has been fetched.
    pub fn current_entry(&self) -> Option<&PageEntry> {
        self.cache.get(self.current_page)
    }

    /// Whether moving forward is possible: the current page is loaded and
    /// carries a next cursor.
    pub fn has_next_page(&self) -> bool {
        self.current_entry()
            .is_some_and(|entry| entry.next_cursor.is_some())
    }

    pub fn has_previous_page(&self) -> bool {
        self.current_page > 1
    }

    /// Number of pages implied by the reported total.
    pub fn overall_pages(&self) -> u64 {
        self.total_results.div_ceil(u64::from(self.limit))
    }

    /// Clear the error banner without touching anything else.
    pub fn dismiss_error(&mut self) {
        self.last_error = None;
        if self.state == SessionState::Failed {
            self.state = if self.cache.is_empty() {
                SessionState::Idle
            } else {
                SessionState::Ready
            };
        }
    }
}

/// Navigation failures.
#[derive(Error, Debug)]
pub enum PaginationError {
    /// The previous page has no next cursor.
    #[error("No more pages after page {page}")]
    NoMorePages { page: u32 },

    /// The cursor for this page is not known: its predecessor has not been
    /// fetched in this session.
    #[error("Page {page} cannot be reached before page {} is loaded", .page - 1)]
    UnresolvableCursor { page: i64 },

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Start a new search. Nothing is fetched until the first `go_to_page`.
pub fn new_search(query: impl Into<String>, limit: u32) -> SearchSession {
    let session = SearchSession::new(query, limit);
    info!("New search for '{}' ({} per page)", session.query, session.limit);
    session
}

/// Navigate `session` to `target`.
///
/// Returns `Ok(None)` when `target` is below 1 (nothing happens), and the
/// page entry otherwise. A page that is already cached is returned without
/// contacting `source`. A page that is not cached is fetched with the
/// cursor stored on the page before it, which therefore must be cached;
/// page 1 needs no cursor.
pub async fn go_to_page<S>(
    session: &mut SearchSession,
    target: i64,
    source: &S,
) -> Result<Option<PageEntry>, PaginationError>
where
    S: PageSource + ?Sized,
{
    if target < 1 {
        debug!("Ignoring navigation to page {}", target);
        return Ok(None);
    }

    let page = u32::try_from(target)
        .map_err(|_| PaginationError::UnresolvableCursor { page: target })?;

    if let Some(entry) = session.cache.get(page) {
        debug!("Page {} served from cache", page);
        let entry = entry.clone();
        session.current_page = page;
        session.state = SessionState::Ready;
        session.last_error = None;
        return Ok(Some(entry));
    }

    let cursor = resolve_cursor(session, page)?;

    session.state = SessionState::Fetching;
    debug!(
        "Fetching page {} of '{}' (cursor: {:?})",
        page, session.query, cursor
    );

    let result = source
        .fetch_page(&session.query, session.limit, cursor.as_deref())
        .await;

    match result {
        Ok(fetched) => {
            let entry = PageEntry {
                reactions: fetched.reactions,
                next_cursor: fetched.next_cursor,
            };

            session.cache.insert(page, entry.clone());
            session.current_page = page;
            session.total_results = fetched.meta.total;
            session.meta = Some(fetched.meta);
            session.state = SessionState::Ready;
            session.last_error = None;

            info!(
                "Loaded page {} of '{}': {} reactions",
                page,
                session.query,
                entry.reactions.len()
            );
            Ok(Some(entry))
        }
        Err(e) => {
            warn!("Failed to fetch page {} of '{}': {}", page, session.query, e);
            session.state = SessionState::Failed;
            session.last_error = Some(e.to_string());
            Err(PaginationError::Fetch(e))
        }
    }
}

/// Cursor needed to fetch `page`, read from the page before it.
fn resolve_cursor(session: &SearchSession, page: u32) -> Result<Option<String>, PaginationError> {
    if page == 1 {
        return Ok(None);
    }

    let previous = page - 1;
    match session.cache.get(previous) {
        Some(PageEntry {
            next_cursor: Some(cursor),
            ..
        }) => Ok(Some(cursor.clone())),
        Some(_) => Err(PaginationError::NoMorePages { page: previous }),
        None => Err(PaginationError::UnresolvableCursor {
            page: i64::from(page),
        }),
    }
}
