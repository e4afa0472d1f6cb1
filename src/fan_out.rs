//! Bounded concurrent lookups
//!
//! Runs independent lookups with at most `workers` in flight and hands each
//! success to a sink as soon as it completes. Completion order is not
//! preserved. A failed lookup is logged and skipped; it never cancels the
//! rest of the batch.

use crate::error::Result;
use futures::StreamExt;
use futures::stream;
use std::future::Future;

/// Outcome counts of one fan-out run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FanOutSummary {
    /// Lookups that produced a value
    pub succeeded: usize,
    /// Lookups that failed and were skipped
    pub failed: usize,
}

/// Run `lookup` over `inputs` with bounded concurrency, feeding successes to `sink`
///
/// Only a sink error aborts the run; lookup errors are counted in
/// [`FanOutSummary::failed`].
pub async fn fan_out<I, T, F, Fut, S>(
    inputs: I,
    workers: usize,
    lookup: F,
    mut sink: S,
) -> Result<FanOutSummary>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<T>>,
    S: FnMut(T) -> Result<()>,
{
    let mut summary = FanOutSummary::default();
    let mut completed = stream::iter(inputs)
        .map(lookup)
        .buffer_unordered(workers.max(1));

    while let Some(result) = completed.next().await {
        match result {
            Ok(value) => {
                summary.succeeded += 1;
                sink(value)?;
            }
            Err(e) => {
                summary.failed += 1;
                tracing::warn!(error = %e, "lookup failed, skipping");
            }
        }
    }

    if summary.failed > 0 {
        tracing::warn!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "fan-out finished with skipped lookups"
        );
    }
    Ok(summary)
}

/// [`fan_out`] into a vector, in completion order
pub async fn fan_out_collect<I, T, F, Fut>(inputs: I, workers: usize, lookup: F) -> Vec<T>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut results = Vec::new();
    let outcome = fan_out(inputs, workers, lookup, |value| {
        results.push(value);
        Ok(())
    })
    .await;

    match outcome {
        Ok(summary) => {
            tracing::debug!(
                succeeded = summary.succeeded,
                failed = summary.failed,
                "lookups collected"
            );
        }
        // Unreachable while the sink above cannot fail
        Err(e) => tracing::warn!(error = %e, "collecting lookups stopped early"),
    }
    results
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn one_failure_does_not_lose_the_others() {
        let mut results = fan_out_collect(0..10u32, 4, |i| async move {
            if i == 3 {
                Err(Error::http(500, format!("Items('{i}')"), "boom"))
            } else {
                Ok(i * 10)
            }
        })
        .await;

        results.sort_unstable();
        assert_eq!(results, vec![0, 10, 20, 40, 50, 60, 70, 80, 90]);
    }

    #[tokio::test]
    async fn collect_keeps_every_success_when_all_lookups_fail_but_one() {
        let results = fan_out_collect(["a", "b", "c", "d"], 3, |code| async move {
            if code == "c" {
                Ok(code.to_string())
            } else {
                Err(Error::http(400, format!("Items('{code}')"), "bad request"))
            }
        })
        .await;

        assert_eq!(results, vec!["c".to_string()]);
    }

    #[tokio::test]
    async fn summary_counts_successes_and_failures() {
        let mut seen = Vec::new();
        let summary = fan_out(
            ["a", "b", "c"],
            2,
            |code| async move {
                if code == "b" {
                    Err(Error::Other("no price".into()))
                } else {
                    Ok(code.to_uppercase())
                }
            },
            |value| {
                seen.push(value);
                Ok(())
            },
        )
        .await
        .unwrap();

        assert_eq!(
            summary,
            FanOutSummary {
                succeeded: 2,
                failed: 1
            }
        );
        seen.sort();
        assert_eq!(seen, vec!["A", "C"]);
    }

    #[tokio::test]
    async fn concurrency_never_exceeds_worker_count() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let results = fan_out_collect(0..32, 5, |i| {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, Error>(i)
            }
        })
        .await;

        assert_eq!(results.len(), 32);
        assert!(peak.load(Ordering::SeqCst) <= 5);
        assert!(peak.load(Ordering::SeqCst) > 1, "lookups should overlap");
    }

    #[tokio::test]
    async fn sink_error_aborts_the_run() {
        let result = fan_out(
            0..5,
            2,
            |i| async move { Ok::<_, Error>(i) },
            |_| {
                Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "disk full",
                )))
            },
        )
        .await;

        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn empty_input_is_an_empty_summary() {
        let summary = fan_out(
            Vec::<u32>::new(),
            16,
            |i| async move { Ok::<_, Error>(i) },
            |_| Ok(()),
        )
        .await
        .unwrap();
        assert_eq!(summary, FanOutSummary::default());
    }
}
