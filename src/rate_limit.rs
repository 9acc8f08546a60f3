use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, instrument};

/// Call throttle using a token bucket
///
/// The Web of Science web services reject sessions that exceed their
/// calls-per-window budget (two calls per second for most subscriptions).
/// The limiter only delays callers; it never reorders or queues calls.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    bucket: Arc<Mutex<TokenBucket>>,
}

#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    capacity: f64,
    refill_rate: f64, // tokens per second
    last_refill: Instant,
}

impl RateLimiter {
    /// Create a limiter allowing `calls` per `window`
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use wos_client::rate_limit::RateLimiter;
    ///
    /// // Two calls per second
    /// let limiter = RateLimiter::new(2, Duration::from_secs(1));
    /// ```
    pub fn new(calls: u32, window: Duration) -> Self {
        let calls = f64::from(calls.max(1));
        let window = window.as_secs_f64();
        let refill_rate = if window > 0.0 { calls / window } else { calls };

        Self {
            bucket: Arc::new(Mutex::new(TokenBucket {
                tokens: calls,
                capacity: calls,
                refill_rate,
                last_refill: Instant::now(),
            })),
        }
    }

    /// Acquire a token, waiting if the budget for the current window is spent
    ///
    /// The token is reserved before sleeping, so concurrent callers queue up
    /// behind each other in lock order and every one of them eventually
    /// proceeds.
    #[instrument(skip(self))]
    pub async fn acquire(&self) {
        let wait_time = {
            let mut bucket = self.bucket.lock().await;
            bucket.refill();
            bucket.tokens -= 1.0;

            if bucket.tokens >= 0.0 {
                debug!(remaining_tokens = %bucket.tokens, "Token acquired immediately");
                None
            } else {
                let wait_duration = Duration::from_secs_f64(-bucket.tokens / bucket.refill_rate);
                debug!(
                    wait_duration_ms = wait_duration.as_millis(),
                    "Throttling call"
                );
                Some(wait_duration)
            }
        };

        if let Some(duration) = wait_time {
            sleep(duration).await;
        }
    }

    /// Check if a call could proceed right now without consuming a token
    pub async fn check_available(&self) -> bool {
        let mut bucket = self.bucket.lock().await;
        bucket.refill();
        bucket.tokens >= 1.0
    }

    /// Current token count; negative while calls are waiting on reserved tokens
    pub async fn token_count(&self) -> f64 {
        let mut bucket = self.bucket.lock().await;
        bucket.refill();
        bucket.tokens
    }

    /// Configured rate in calls per second
    pub async fn rate(&self) -> f64 {
        let bucket = self.bucket.lock().await;
        bucket.refill_rate
    }
}

impl TokenBucket {
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill);
        let new_tokens = elapsed.as_secs_f64() * self.refill_rate;

        self.tokens = (self.tokens + new_tokens).min(self.capacity);
        self.last_refill = now;
    }
}
