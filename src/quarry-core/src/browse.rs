//! Lazy browsing over paginated endpoints
//!
//! [`Browser`] flattens the pages returned by a [`PageSource`] into a single
//! sequence of items. A page is fetched only when the consumer asks for an
//! item and the buffered page is used up, so at most one page is held in
//! memory. Objects, rules and synonyms share this algorithm; each resource
//! only supplies its own `PageSource`.

use async_trait::async_trait;
use futures::Stream;
use std::collections::VecDeque;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Error, Result};
use crate::options::RequestOptions;

/// One page of items plus the cursor to the next page, if any
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T, C> {
    pub items: Vec<T>,
    pub next: Option<C>,
}

/// Fetches pages of a paginated resource
#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Send;
    type Cursor: Send + Sync;

    /// Fetch the page at `cursor`, or the first page when `cursor` is `None`
    async fn fetch_page(
        &self,
        cursor: Option<&Self::Cursor>,
        options: &RequestOptions,
    ) -> Result<Page<Self::Item, Self::Cursor>>;
}

enum Position<C> {
    Start,
    At(C),
    Done,
}

/// Flattened, lazily fetched view over a paginated resource.
///
/// A browser is single use: once it has returned `Ok(None)` or an error it
/// stays exhausted. Build a new one to browse again.
pub struct Browser<S: PageSource> {
    source: S,
    options: RequestOptions,
    buffer: VecDeque<S::Item>,
    position: Position<S::Cursor>,
    pages_fetched: usize,
    cancel: Option<CancellationToken>,
}

impl<S: PageSource> Browser<S> {
    pub fn new(source: S, options: RequestOptions) -> Self {
        Self {
            source,
            options,
            buffer: VecDeque::new(),
            position: Position::Start,
            pages_fetched: 0,
            cancel: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Start from `cursor` instead of the first page
    pub fn resume_from(mut self, cursor: S::Cursor) -> Self {
        if matches!(self.position, Position::Start) {
            self.position = Position::At(cursor);
        }
        self
    }

    /// Number of pages requested so far
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Whether the browser has no further items to yield
    pub fn is_exhausted(&self) -> bool {
        self.buffer.is_empty() && matches!(self.position, Position::Done)
    }

    /// Next item, fetching the following page only when the buffer is empty
    pub async fn try_next(&mut self) -> Result<Option<S::Item>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Ok(Some(item));
            }

            let cursor = match std::mem::replace(&mut self.position, Position::Done) {
                Position::Done => return Ok(None),
                Position::Start => None,
                Position::At(cursor) => Some(cursor),
            };

            if self.cancel.as_ref().is_some_and(|token| token.is_cancelled()) {
                return Err(Error::Cancelled);
            }

            let page = self
                .source
                .fetch_page(cursor.as_ref(), &self.options)
                .await?;
            self.pages_fetched += 1;

            debug!(
                page = self.pages_fetched,
                items = page.items.len(),
                has_next = page.next.is_some(),
                "Fetched browse page"
            );

            self.buffer.extend(page.items);
            if let Some(next) = page.next {
                self.position = Position::At(next);
            }
        }
    }

    /// Drain every remaining item into memory
    pub async fn collect_all(mut self) -> Result<Vec<S::Item>> {
        let mut items = Vec::new();
        while let Some(item) = self.try_next().await? {
            items.push(item);
        }
        Ok(items)
    }

    /// Convert into a `Stream`; the stream ends after the first error
    pub fn into_stream(self) -> impl Stream<Item = Result<S::Item>> + Send
    where
        S: 'static,
        S::Cursor: 'static,
        S::Item: 'static,
    {
        futures::stream::unfold(Some(self), |state| async move {
            let mut browser = state?;
            match browser.try_next().await {
                Ok(Some(item)) => Some((Ok(item), Some(browser))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}
