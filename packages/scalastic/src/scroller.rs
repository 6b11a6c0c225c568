//! Scroll cursor over a paged search
//!
//! A [`Scroller`] holds a base query; every traversal ([`Scroller::cursor`],
//! [`Scroller::pages`], [`Scroller::hits`]) starts a fresh scan search and
//! follows scroll ids until the engine returns an empty page.

use futures::stream::{self, Stream, TryStreamExt};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::domain::{SearchEngine, SearchRequest, SearchType};
use crate::error::{PartitionError, Result};

/// Default scroll window
pub const DEFAULT_SCROLL: &str = "1m";

/// Paged search bound to one base query
#[derive(Clone)]
pub struct Scroller {
    engine: Arc<dyn SearchEngine>,
    request: SearchRequest,
    scroll: String,
}

impl std::fmt::Debug for Scroller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scroller")
            .field("request", &self.request)
            .field("scroll", &self.scroll)
            .finish()
    }
}

impl Scroller {
    pub fn new(engine: Arc<dyn SearchEngine>, request: SearchRequest) -> Self {
        Self {
            engine,
            request,
            scroll: DEFAULT_SCROLL.to_string(),
        }
    }

    /// Scroll window kept alive between pages
    pub fn scroll(&self) -> &str {
        &self.scroll
    }

    pub fn set_scroll(&mut self, scroll: impl Into<String>) -> Result<()> {
        let scroll = scroll.into();
        if scroll.is_empty() {
            return Err(PartitionError::invalid_argument("scroll cannot be empty!"));
        }
        self.scroll = scroll;
        Ok(())
    }

    pub fn request(&self) -> &SearchRequest {
        &self.request
    }

    /// Start an independent traversal
    ///
    /// The scroll window is captured here; later `set_scroll` calls do not
    /// affect a running cursor.
    pub fn cursor(&self) -> ScrollCursor {
        ScrollCursor {
            engine: Arc::clone(&self.engine),
            request: self.request.clone(),
            scroll: self.scroll.clone(),
            state: CursorState::Start,
        }
    }

    /// Non-empty pages of hits
    pub fn pages(&self) -> impl Stream<Item = Result<Vec<Value>>> + Send + 'static {
        stream::try_unfold(Some(self.cursor()), |cursor| async move {
            let Some(mut cursor) = cursor else {
                return Ok::<_, PartitionError>(None);
            };
            let (page, done) = cursor.next_page().await?;
            if page.is_empty() {
                return Ok(None);
            }
            Ok(Some((page, if done { None } else { Some(cursor) })))
        })
    }

    /// Hits in page order
    pub fn hits(&self) -> impl Stream<Item = Result<Value>> + Send + 'static {
        self.pages()
            .map_ok(|page| stream::iter(page.into_iter().map(Ok::<Value, PartitionError>)))
            .try_flatten()
    }

    /// Drain a whole traversal
    pub async fn collect_hits(&self) -> Result<Vec<Value>> {
        self.hits().try_collect().await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CursorState {
    Start,
    Scrolling(String),
    Done,
}

/// One traversal of a [`Scroller`]
pub struct ScrollCursor {
    engine: Arc<dyn SearchEngine>,
    request: SearchRequest,
    scroll: String,
    state: CursorState,
}

#[derive(Debug, Default, Deserialize)]
struct ScrollPage {
    #[serde(rename = "_scroll_id", default)]
    scroll_id: Option<String>,
    #[serde(default)]
    hits: PageHits,
}

#[derive(Debug, Default, Deserialize)]
struct PageHits {
    #[serde(default)]
    hits: Vec<Value>,
}

impl ScrollCursor {
    pub fn is_done(&self) -> bool {
        self.state == CursorState::Done
    }

    /// Fetch the next page
    ///
    /// Returns `(hits, done)`. Pages returned with `done == false` are never
    /// empty; once `done` is true every later call returns `(vec![], true)`.
    pub async fn next_page(&mut self) -> Result<(Vec<Value>, bool)> {
        loop {
            let (response, initial) = match &self.state {
                CursorState::Done => return Ok((Vec::new(), true)),
                CursorState::Start => {
                    let request = self
                        .request
                        .clone()
                        .search_type(SearchType::Scan)
                        .scroll(self.scroll.clone());
                    debug!(index = ?request.index, scroll = %self.scroll, "Starting scan");
                    (self.engine.search(request).await?, true)
                }
                CursorState::Scrolling(scroll_id) => {
                    (self.engine.scroll(scroll_id, &self.scroll).await?, false)
                }
            };

            let page: ScrollPage = serde_json::from_value(response)?;
            let previous = std::mem::replace(&mut self.state, CursorState::Done);
            let next_id = page.scroll_id.or(match previous {
                CursorState::Scrolling(id) => Some(id),
                _ => None,
            });

            if page.hits.hits.is_empty() {
                // A scan search answers with a cursor only
                if let (true, Some(id)) = (initial, next_id) {
                    self.state = CursorState::Scrolling(id);
                    continue;
                }
                return Ok((Vec::new(), true));
            }

            return match next_id {
                Some(id) => {
                    self.state = CursorState::Scrolling(id);
                    Ok((page.hits.hits, false))
                }
                None => Ok((page.hits.hits, true)),
            };
        }
    }
}
