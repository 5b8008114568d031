//! Page sources the pagination manager can pull from.

use crate::error::FetchError;
use crate::models::{ReactionCount, ResponseMeta};
use async_trait::async_trait;

/// One page as delivered by a source, already aggregated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub reactions: Vec<ReactionCount>,
    /// Cursor for the page after this one; `None` when this is the last page.
    pub next_cursor: Option<String>,
    pub meta: ResponseMeta,
}

/// Something that can produce "the page after cursor C" for a query.
///
/// Sources only move forward: there is no way to ask for the page before
/// a cursor, or for an arbitrary page number.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch one page. `cursor` is `None` for the first page.
    async fn fetch_page(
        &self,
        query: &str,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<FetchedPage, FetchError>;
}
