//! Paginated collection streaming
//!
//! [`stream_collection`] turns a [`CollectionQuery`] into a lazy stream of
//! records spanning every page the server hands out. Two paging conventions
//! are handled:
//!
//! - **Continuation reference**: the page carries `@odata.nextLink` (or one of
//!   its legacy spellings). The link is followed as-is and the stream ends when
//!   a page arrives without one.
//! - **Positional offset**: no link is ever supplied. `$skip` advances by the
//!   number of records just received and the stream ends on the first empty
//!   page.
//!
//! A link always wins over the offset. Pages are fetched only once the
//! previous page has been fully consumed, and dropping the stream part-way
//! leaves nothing running.

use crate::error::{Error, Result};
use crate::executor::RequestExecutor;
use crate::query::CollectionQuery;
use crate::record::{Page, Record};
use futures::StreamExt;
use futures::stream::{self, BoxStream};

/// A stream of records; the first error ends it
pub type RecordStream = BoxStream<'static, Result<Record>>;

/// Where the next page comes from
#[derive(Clone, Debug, PartialEq, Eq)]
enum Cursor {
    /// Rebuild the query with this `$skip`
    Offset(u64),
    /// Follow a server-supplied continuation reference
    Link(String),
    /// Nothing left to fetch
    Done,
}

struct StreamState {
    executor: RequestExecutor,
    query: CollectionQuery,
    cursor: Cursor,
    buffer: std::vec::IntoIter<Record>,
    pages: u64,
    records: u64,
}

impl StreamState {
    /// Fetch the page under the cursor into the buffer and advance the cursor.
    /// Returns false once the collection is exhausted.
    async fn fetch_next(&mut self) -> Result<bool> {
        let page = match &self.cursor {
            Cursor::Done => return Ok(false),
            Cursor::Offset(skip) => {
                let params = self.query.params(self.executor.page_size(), *skip);
                self.executor
                    .execute_get(&self.query.collection, &params)
                    .await?
            }
            Cursor::Link(link) => self.executor.execute_get(link, &[]).await?,
        };

        self.pages += 1;
        self.records += page.len() as u64;
        tracing::debug!(
            collection = %self.query.collection,
            page = self.pages,
            records = page.len(),
            has_next_link = page.next_link.is_some(),
            "page received"
        );

        let Page { records, next_link } = page;
        self.cursor = advance(&self.cursor, records.len(), next_link)?;
        self.buffer = records.into_iter();

        if self.cursor == Cursor::Done {
            tracing::debug!(
                collection = %self.query.collection,
                pages = self.pages,
                records = self.records,
                "collection exhausted"
            );
        }
        Ok(true)
    }
}

/// Next cursor after a page of `received` records
fn advance(current: &Cursor, received: usize, next_link: Option<String>) -> Result<Cursor> {
    match (current, next_link) {
        // Same link handed back with nothing in between would never end
        (Cursor::Link(previous), Some(link)) if received == 0 && *previous == link => {
            Err(Error::Other(format!(
                "server repeated continuation reference {link} with an empty page"
            )))
        }
        (_, Some(link)) => Ok(Cursor::Link(link)),
        (Cursor::Offset(_), None) if received == 0 => Ok(Cursor::Done),
        (Cursor::Offset(skip), None) => Ok(Cursor::Offset(skip + received as u64)),
        (Cursor::Link(_), None) | (Cursor::Done, None) => Ok(Cursor::Done),
    }
}

/// Stream every record of `query`, page by page
///
/// Each call starts from the beginning of the collection. The stream holds its
/// own handle to the executor, so it may outlive the borrow.
///
/// # Example
///
/// ```no_run
/// use futures::TryStreamExt;
/// use sl_export::{CollectionQuery, RequestExecutor, stream_collection};
///
/// # async fn example(executor: &RequestExecutor) -> sl_export::Result<()> {
/// let query = CollectionQuery::new("Items")
///     .select("ItemCode,ItemName")
///     .order_by("ItemCode");
/// let mut items = stream_collection(executor, query);
/// while let Some(item) = items.try_next().await? {
///     println!("{}", item["ItemCode"]);
/// }
/// # Ok(())
/// # }
/// ```
pub fn stream_collection(executor: &RequestExecutor, query: CollectionQuery) -> RecordStream {
    let state = StreamState {
        executor: executor.clone(),
        query,
        cursor: Cursor::Offset(0),
        buffer: Vec::new().into_iter(),
        pages: 0,
        records: 0,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(record) = state.buffer.next() {
                return Some((Ok(record), state));
            }
            match state.fetch_next().await {
                Ok(true) => continue,
                Ok(false) => return None,
                Err(e) => {
                    tracing::warn!(
                        collection = %state.query.collection,
                        error = %e,
                        "stream aborted"
                    );
                    state.cursor = Cursor::Done;
                    return Some((Err(e), state));
                }
            }
        }
    })
    .boxed()
}
