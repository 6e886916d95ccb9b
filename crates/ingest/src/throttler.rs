//! Rate-aware memoization of an expensive "get current head" call.

use std::{future::Future, time::Duration};
use tokio::{
    sync::Mutex,
    time::{Instant, sleep},
};

#[derive(Debug, Clone)]
struct Cached<T> {
    value: T,
    at: Instant,
}

/// Memoizes the result of a zero-argument async producer for a minimum refresh
/// interval, with a forced-refresh escape hatch.
///
/// Single-flight: concurrent callers queue on an internal mutex while a
/// recompute is in flight and observe its result instead of issuing duplicate
/// producer calls. Producer failures propagate to the caller and leave the
/// cache untouched.
#[derive(Debug)]
pub struct Throttler<T, F> {
    producer: F,
    interval: Duration,
    slot: Mutex<Option<Cached<T>>>,
}

impl<T, F, Fut, E> Throttler<T, F>
where
    T: Clone,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    /// Creates a new [`Throttler`] around the given producer.
    pub fn new(interval: Duration, producer: F) -> Self {
        Self { producer, interval, slot: Mutex::new(None) }
    }

    /// Returns the cached value if it is still fresh, otherwise recomputes.
    pub async fn get(&self) -> Result<T, E> {
        let mut slot = self.slot.lock().await;
        if let Some(cached) = slot.as_ref() {
            if cached.at.elapsed() < self.interval {
                return Ok(cached.value.clone());
            }
        }
        self.recompute(&mut slot).await
    }

    /// Recomputes the value, waiting out the remainder of the refresh interval
    /// first so that forced refreshes still respect the producer's rate.
    ///
    /// A caller that queued behind an in-flight recompute receives that
    /// recompute's result instead of triggering another one.
    pub async fn refresh(&self) -> Result<T, E> {
        let entered = Instant::now();
        let mut slot = self.slot.lock().await;
        if let Some(cached) = slot.as_ref() {
            if cached.at >= entered {
                return Ok(cached.value.clone());
            }
            let age = cached.at.elapsed();
            if age < self.interval {
                sleep(self.interval - age).await;
            }
        }
        self.recompute(&mut slot).await
    }

    async fn recompute(&self, slot: &mut Option<Cached<T>>) -> Result<T, E> {
        let value = (self.producer)().await?;
        *slot = Some(Cached { value: value.clone(), at: Instant::now() });
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    };

    fn counting_producer(
        calls: Arc<AtomicU64>,
        delay: Duration,
    ) -> impl Fn() -> std::pin::Pin<Box<dyn Future<Output = Result<u64, &'static str>> + Send>>
    {
        move || {
            let calls = calls.clone();
            Box::pin(async move {
                sleep(delay).await;
                Ok(calls.fetch_add(1, Ordering::SeqCst))
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn memoizes_within_the_interval() {
        let calls = Arc::new(AtomicU64::new(0));
        let throttler =
            Throttler::new(Duration::from_secs(5), counting_producer(calls.clone(), Duration::ZERO));

        assert_eq!(throttler.get().await.unwrap(), 0);
        assert_eq!(throttler.get().await.unwrap(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(throttler.get().await.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_waits_out_the_interval() {
        let calls = Arc::new(AtomicU64::new(0));
        let throttler =
            Throttler::new(Duration::from_secs(5), counting_producer(calls.clone(), Duration::ZERO));

        throttler.get().await.unwrap();
        let before = Instant::now();
        assert_eq!(throttler.refresh().await.unwrap(), 1);
        // The forced refresh backs off by the full interval.
        assert!(before.elapsed() >= Duration::from_secs(5));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_recompute() {
        let calls = Arc::new(AtomicU64::new(0));
        let throttler = Arc::new(Throttler::new(
            Duration::from_secs(5),
            counting_producer(calls.clone(), Duration::from_millis(100)),
        ));

        let (a, b) = tokio::join!(throttler.get(), throttler.get());
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn queued_refresh_adopts_the_in_flight_result() {
        let calls = Arc::new(AtomicU64::new(0));
        let throttler = Arc::new(Throttler::new(
            Duration::from_secs(5),
            counting_producer(calls.clone(), Duration::from_millis(100)),
        ));

        let (a, b) = tokio::join!(throttler.refresh(), throttler.refresh());
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn producer_errors_propagate_and_cache_nothing() {
        let attempts = Arc::new(AtomicU64::new(0));
        let inner = attempts.clone();
        let throttler = Throttler::new(Duration::from_secs(5), move || {
            let attempts = inner.clone();
            async move {
                if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err("head lookup failed")
                } else {
                    Ok(7u64)
                }
            }
        });

        assert!(throttler.get().await.is_err());
        // The failure was not cached; the next call retries immediately.
        assert_eq!(throttler.get().await.unwrap(), 7);
    }
}
