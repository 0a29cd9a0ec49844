//! Offset-based auto-pagination.
//!
//! `Paginator` turns a page-fetching closure into a lazy iterator over the
//! whole collection. The server's `total` is authoritative: the cursor
//! advances by the page size after every page and iteration stops once it
//! reaches `total`, whatever the length of the last batch.

use std::collections::VecDeque;

use crate::error::BridgeError;

pub const DEFAULT_PAGE_SIZE: usize = 100;

/// One batch returned by a paged endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
}

/// Lazy, non-restartable sequence over an offset-paged collection.
///
/// The first request is issued on the first call to `next`. A failed request
/// is yielded once as `Err` and ends the sequence.
pub struct Paginator<T, F> {
    fetch: F,
    page_size: usize,
    offset: usize,
    buffered: VecDeque<T>,
    exhausted: bool,
}

impl<T, F> Paginator<T, F>
where
    F: FnMut(usize, usize) -> Result<Page<T>, BridgeError>,
{
    /// `fetch` receives `(offset, page_size)`.
    pub fn new(page_size: usize, fetch: F) -> Self {
        Self {
            fetch,
            page_size: page_size.max(1),
            offset: 0,
            buffered: VecDeque::new(),
            exhausted: false,
        }
    }
}

impl<T, F> Iterator for Paginator<T, F>
where
    F: FnMut(usize, usize) -> Result<Page<T>, BridgeError>,
{
    type Item = Result<T, BridgeError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffered.pop_front() {
                return Some(Ok(item));
            }
            if self.exhausted {
                return None;
            }
            match (self.fetch)(self.offset, self.page_size) {
                Ok(page) => {
                    self.offset += self.page_size;
                    self.exhausted = self.offset >= page.total;
                    self.buffered.extend(page.items);
                }
                Err(err) => {
                    self.exhausted = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
