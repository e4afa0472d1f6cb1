//! Advisory record counts via `<collection>/$count`
//!
//! The count only feeds progress logging. Any failure degrades to `None` and
//! never stops an export.

use crate::executor::RequestExecutor;

/// Number of records the server reports for `collection`, if it can say
pub async fn count(executor: &RequestExecutor, collection: &str) -> Option<u64> {
    let target = format!("{}/$count", collection.trim_end_matches('/'));

    match executor.execute_get_text(&target, &[]).await {
        Ok(body) => match parse_count(&body) {
            Some(total) => Some(total),
            None => {
                tracing::debug!(collection, body = %body.trim(), "count body is not an integer");
                None
            }
        },
        Err(e) => {
            tracing::warn!(collection, error = %e, "count unavailable");
            None
        }
    }
}

/// Parse a plain-text count, tolerating surrounding whitespace and a UTF-8 BOM
fn parse_count(body: &str) -> Option<u64> {
    body.trim_start_matches('\u{feff}').trim().parse().ok()
}
