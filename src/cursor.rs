//! Paged cursors over server-paginated listings
//!
//! Listings (experiments, runs, a run's logs) are served a page at a time.
//! Each page carries an opaque next-page token encoding the last item's id
//! and its order-by value; the next page resumes strictly after that
//! position, so pages stay stable while the underlying data is unchanged.
//!
//! [`PagedCursor`] walks those pages lazily, caches what it has seen, and
//! can be restarted from the first item without re-querying.
//!
//! # Example
//!
//! ```rust
//! use trueno_registry::ExperimentStore;
//!
//! let store = ExperimentStore::new();
//! for name in ["a", "b", "c"] {
//!     store.start_experiment_run(name)?.finish();
//! }
//!
//! let mut experiments = store.get_experiments();
//! let first = experiments.next_item()?.map(|e| e.name().to_string());
//! assert_eq!(first.as_deref(), Some("a"));
//!
//! experiments.restart();
//! assert_eq!(experiments.by_ref().count(), 3);
//! assert!(experiments.next_item()?.is_none());
//! # Ok::<(), trueno_registry::Error>(())
//! ```

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// Default number of items per page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Field a listing is ordered by. Ties are always broken by id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderBy {
    /// Registry-assigned id
    #[default]
    Id,
    /// Creation time
    CreateTime,
    /// Last update time
    LastUpdateTime,
}

/// Direction of a listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    /// Ascending
    #[default]
    Asc,
    /// Descending
    Desc,
}

/// Paging and ordering options for a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOptions {
    /// Items per page (0 means everything in one page)
    pub page_size: usize,
    /// Ordering field
    pub order_by: OrderBy,
    /// Ordering direction
    pub sort_order: SortOrder,
    /// Token from the previous page, `None` for the first page
    pub next_page_token: Option<String>,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            order_by: OrderBy::default(),
            sort_order: SortOrder::default(),
            next_page_token: None,
        }
    }
}

impl ListOptions {
    /// Set the page size.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the ordering field.
    #[must_use]
    pub const fn with_order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = order_by;
        self
    }

    /// Set the ordering direction.
    #[must_use]
    pub const fn with_sort_order(mut self, sort_order: SortOrder) -> Self {
        self.sort_order = sort_order;
        self
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Token for the next page, `None` on the last page
    pub next_page_token: Option<String>,
    /// Page size that was requested
    pub page_size: usize,
    /// Number of items on this page
    pub size: usize,
}

impl<T> Page<T> {
    /// Transform the items, keeping the paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_page_token: self.next_page_token,
            page_size: self.page_size,
            size: self.size,
        }
    }
}

/// Position of an item in an ordered listing: the order-by value, then id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PageKey {
    /// Order-by value (id, or a timestamp in milliseconds)
    pub value: i64,
    /// Id, the tie breaker
    pub id: u64,
}

impl PageKey {
    /// Encode as a next-page token.
    #[must_use]
    pub fn to_token(self) -> String {
        format!("{}:{}", self.id, self.value)
    }

    /// Decode a next-page token.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPageToken` if the token is malformed.
    pub fn from_token(token: &str) -> Result<Self> {
        let invalid = || Error::InvalidPageToken(token.to_string());
        let (id, value) = token.split_once(':').ok_or_else(invalid)?;
        Ok(Self {
            id: id.parse().map_err(|_| invalid())?,
            value: value.parse().map_err(|_| invalid())?,
        })
    }
}

/// Serve one page out of a full listing.
///
/// Items are ordered by `key` (stable, ascending or descending per
/// `options.sort_order`). Reads `page_size + 1` items past the token to
/// decide whether another page exists.
///
/// # Errors
///
/// Returns `Error::InvalidPageToken` if `options.next_page_token` is malformed.
pub fn paginate<T>(
    mut items: Vec<T>,
    options: &ListOptions,
    key: impl Fn(&T) -> PageKey,
) -> Result<Page<T>> {
    let desc = options.sort_order == SortOrder::Desc;
    items.sort_by(|a, b| {
        let ord = key(a).cmp(&key(b));
        if desc {
            ord.reverse()
        } else {
            ord
        }
    });

    let start = match options.next_page_token.as_deref() {
        Some(token) => {
            let after = PageKey::from_token(token)?;
            let past = if desc { Ordering::Less } else { Ordering::Greater };
            items
                .iter()
                .position(|item| key(item).cmp(&after) == past)
                .unwrap_or(items.len())
        }
        None => 0,
    };

    let mut items: Vec<T> = items.into_iter().skip(start).collect();
    let next_page_token = if options.page_size > 0 && items.len() > options.page_size {
        items.truncate(options.page_size);
        items.last().map(|last| key(last).to_token())
    } else {
        None
    };

    Ok(Page {
        size: items.len(),
        page_size: options.page_size,
        next_page_token,
        items,
    })
}

/// Backing listing that serves pages on demand.
pub trait PageSource<T>: Send + Sync {
    /// Fetch the page described by `options`.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing cannot be read or the token is invalid.
    fn fetch_page(&self, options: &ListOptions) -> Result<Page<T>>;
}

impl<T, F> PageSource<T> for F
where
    F: Fn(&ListOptions) -> Result<Page<T>> + Send + Sync,
{
    fn fetch_page(&self, options: &ListOptions) -> Result<Page<T>> {
        self(options)
    }
}

/// Restartable, lazily fetched cursor over a paginated listing.
///
/// `next_item` returns `Ok(Some(item))` for data, `Ok(None)` once the
/// listing is exhausted (and on every call after that), and `Err` only for
/// fetch failures. A failed fetch leaves the cursor where it was.
pub struct PagedCursor<T> {
    source: Arc<dyn PageSource<T>>,
    options: ListOptions,
    buffer: Vec<T>,
    position: usize,
    next_token: Option<String>,
    exhausted: bool,
    pages_fetched: usize,
}

impl<T: Clone> PagedCursor<T> {
    /// Create a cursor; nothing is fetched until the first `next_item`.
    #[must_use]
    pub fn new(source: Arc<dyn PageSource<T>>, options: ListOptions) -> Self {
        Self {
            source,
            options: ListOptions {
                next_page_token: None,
                ..options
            },
            buffer: Vec::new(),
            position: 0,
            next_token: None,
            exhausted: false,
            pages_fetched: 0,
        }
    }

    /// Next item in the listing, or `None` when exhausted.
    ///
    /// # Errors
    ///
    /// Returns the page source's error if a page fetch fails.
    pub fn next_item(&mut self) -> Result<Option<T>> {
        loop {
            if let Some(item) = self.buffer.get(self.position) {
                self.position += 1;
                return Ok(Some(item.clone()));
            }
            if self.exhausted {
                return Ok(None);
            }
            self.fetch_next_page()?;
        }
    }

    /// Rewind to the first item. Pages already fetched are replayed from
    /// the cache; the rest are fetched on demand as before.
    pub fn restart(&mut self) {
        self.position = 0;
    }

    /// Number of page fetches issued so far.
    #[must_use]
    pub const fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Options this cursor was opened with.
    #[must_use]
    pub const fn options(&self) -> &ListOptions {
        &self.options
    }

    fn fetch_next_page(&mut self) -> Result<()> {
        let options = ListOptions {
            next_page_token: self.next_token.clone(),
            ..self.options.clone()
        };
        let page = self.source.fetch_page(&options)?;
        self.pages_fetched += 1;
        debug!(
            page = self.pages_fetched,
            size = page.size,
            has_more = page.next_page_token.is_some(),
            "fetched listing page"
        );

        // An empty page with a token would never make progress.
        self.exhausted = page.next_page_token.is_none() || page.items.is_empty();
        self.next_token = page.next_page_token;
        self.buffer.extend(page.items);
        Ok(())
    }
}

impl<T: Clone> Iterator for PagedCursor<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_item().transpose()
    }
}

impl<T> std::fmt::Debug for PagedCursor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PagedCursor")
            .field("options", &self.options)
            .field("position", &self.position)
            .field("buffered", &self.buffer.len())
            .field("exhausted", &self.exhausted)
            .field("pages_fetched", &self.pages_fetched)
            .finish_non_exhaustive()
    }
}
