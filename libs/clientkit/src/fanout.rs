//! Bounded-concurrency parallel map.

use futures::stream::{self, StreamExt};
use std::future::Future;

/// Run `f` over `items` with at most `limit` futures in flight.
///
/// Results come back in input order. Each item gets its own `Result` (or
/// whatever `f` returns), so one failing item never cancels the others.
pub async fn bounded_map<I, T, F, Fut, R>(items: I, limit: usize, f: F) -> Vec<R>
where
    I: IntoIterator<Item = T>,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = R>,
{
    stream::iter(items)
        .map(f)
        .buffered(limit.max(1))
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn preserves_input_order() {
        let out = bounded_map(vec![30u64, 5, 20, 1], 4, |ms| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            ms
        })
        .await;
        assert_eq!(out, vec![30, 5, 20, 1]);
    }

    #[tokio::test]
    async fn never_exceeds_limit() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let out = bounded_map(0..12, 3, |i| {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                i * 2
            }
        })
        .await;

        assert_eq!(out.len(), 12);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn failures_stay_per_item() {
        let out: Vec<Result<u32, String>> = bounded_map(1..=4u32, 2, |i| async move {
            if i == 2 {
                Err(format!("item {} failed", i))
            } else {
                Ok(i)
            }
        })
        .await;

        assert_eq!(out[0], Ok(1));
        assert!(out[1].is_err());
        assert_eq!(out[3], Ok(4));
    }

    #[tokio::test]
    async fn zero_limit_is_treated_as_one() {
        let out = bounded_map(vec![1, 2], 0, |i| async move { i }).await;
        assert_eq!(out, vec![1, 2]);
    }
}
