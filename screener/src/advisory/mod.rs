//! Advisory gateway.
//!
//! Turns a candidate (symbol, fundamentals, distance to support) into a short
//! analyst-style opinion from an external text model. The gateway owns the
//! retry and pacing policy; the model client only reports what happened.
//!
//! Failure policy:
//! - rate limited: back off and retry, bounded by `RetryPolicy::max_attempts`
//! - anything else: no retry, an error-tagged text is returned instead
//!
//! The gateway never returns an error, so one instrument cannot stall or
//! abort a batch.

pub mod client;
pub mod errors;

pub use client::GeminiClient;
pub use errors::AdvisoryError;

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use market::Fundamentals;
use serde::{Deserialize, Serialize};
use tracing::{error, instrument, warn};

/// Text returned when every attempt was rate limited.
pub const RATE_LIMITED_TEXT: &str = "AI advisory unavailable (rate limited)";

/// Abstraction over the text model.
///
/// Implementations must map quota / throughput rejections to
/// `AdvisoryError::RateLimited`; that is the only variant the gateway retries.
#[async_trait]
pub trait AdvisoryModel: Send + Sync + 'static {
    async fn generate(&self, prompt: &str) -> Result<String, AdvisoryError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per advisory, first call included.
    pub max_attempts: u32,

    /// Wait after the first rate-limited attempt; doubles on each retry.
    pub rate_limit_backoff: Duration,

    /// Pause after every advisory, whatever the outcome.
    pub throttle: Duration,
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.rate_limit_backoff.saturating_mul(factor)
    }

    /// No waits at all. Useful for tests and offline runs.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            rate_limit_backoff: Duration::ZERO,
            throttle: Duration::ZERO,
        }
    }
}

/// Coarse label derived from the advisory text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    StrongBuy,
    Steady,
    Watch,
}

impl Rating {
    /// Keyword match on the advisory text; anything unrecognised is `Watch`.
    pub fn from_advice(text: &str) -> Self {
        let upper = text.to_uppercase();

        if upper.contains("STRONG BUY") {
            Rating::StrongBuy
        } else if upper.contains("STEADY") {
            Rating::Steady
        } else {
            Rating::Watch
        }
    }
}

#[derive(Clone)]
pub struct AdvisoryGateway {
    model: Arc<dyn AdvisoryModel>,
    policy: RetryPolicy,
}

impl AdvisoryGateway {
    pub fn new(model: Arc<dyn AdvisoryModel>, policy: RetryPolicy) -> Self {
        Self { model, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Produces the advisory text for one candidate, then waits out the
    /// throttle interval.
    #[instrument(skip(self, fundamentals))]
    pub async fn advise(&self, symbol: &str, fundamentals: &Fundamentals, distance: f64) -> String {
        let prompt = build_prompt(symbol, fundamentals, distance);
        let text = self.request_with_retry(symbol, &prompt).await;

        tokio::time::sleep(self.policy.throttle).await;

        text
    }

    async fn request_with_retry(&self, symbol: &str, prompt: &str) -> String {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.model.generate(prompt).await {
                Ok(text) => return text.trim().to_string(),

                Err(e) if e.is_rate_limited() && attempt < max_attempts => {
                    let wait = self.policy.backoff_for(attempt);
                    warn!(
                        %symbol,
                        attempt,
                        max_attempts,
                        wait_ms = wait.as_millis() as u64,
                        "advisory rate limited; backing off"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }

                Err(e) if e.is_rate_limited() => {
                    warn!(%symbol, attempt, "advisory rate limited; attempts exhausted");
                    return RATE_LIMITED_TEXT.to_string();
                }

                Err(e) => {
                    error!(%symbol, error = %e, "advisory request failed");
                    return format!("AI error: {e}");
                }
            }
        }
    }
}

/// Fixed-shape prompt: symbol, distance to support and up to five ratios.
pub fn build_prompt(symbol: &str, f: &Fundamentals, distance: f64) -> String {
    let mut summary = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(summary, "Symbol: {symbol}");
    let _ = writeln!(summary, "Distance to support A: {:+.1}%", distance * 100.0);
    let _ = writeln!(summary, "Revenue growth: {}", percent(f.revenue_growth));
    let _ = writeln!(summary, "Gross margin: {}", percent(f.gross_margins));
    let _ = writeln!(summary, "Return on equity: {}", percent(f.return_on_equity));
    let _ = writeln!(summary, "Trailing P/E: {}", ratio(f.trailing_pe));
    let _ = writeln!(summary, "Debt to equity: {}", ratio(f.debt_to_equity));

    format!(
        "You are a professional analyst covering Taiwan equities. \
         Give a recommendation of at most 50 words for the instrument below. \
         Start the answer with exactly one rating: STRONG BUY, STEADY or WATCH.\n{summary}"
    )
}

fn percent(v: Option<f64>) -> String {
    v.filter(|x| x.is_finite())
        .map(|x| format!("{:.1}%", x * 100.0))
        .unwrap_or_else(|| "N/A".to_string())
}

fn ratio(v: Option<f64>) -> String {
    v.filter(|x| x.is_finite())
        .map(|x| format!("{x:.2}"))
        .unwrap_or_else(|| "N/A".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;
    use tracing_test::traced_test;

    /// Replays a fixed script of outcomes; repeats the last one when exhausted.
    struct ScriptedModel {
        script: Mutex<VecDeque<Result<String, AdvisoryError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedModel {
        fn new(script: Vec<Result<String, AdvisoryError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AdvisoryModel for ScriptedModel {
        async fn generate(&self, _prompt: &str) -> Result<String, AdvisoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock();
            match script.pop_front() {
                Some(next) if !script.is_empty() => next,
                Some(Ok(text)) => {
                    script.push_back(Ok(text.clone()));
                    Ok(text)
                }
                Some(Err(e)) => {
                    let again = match &e {
                        AdvisoryError::RateLimited(m) => AdvisoryError::RateLimited(m.clone()),
                        _ => AdvisoryError::EmptyResponse,
                    };
                    script.push_back(Err(again));
                    Err(e)
                }
                None => Err(AdvisoryError::EmptyResponse),
            }
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            rate_limit_backoff: Duration::from_secs(20),
            throttle: Duration::from_secs(1),
        }
    }

    fn limited() -> Result<String, AdvisoryError> {
        Err(AdvisoryError::RateLimited("quota".into()))
    }

    #[tokio::test(start_paused = true)]
    async fn success_returns_trimmed_text_and_throttles() {
        let model = ScriptedModel::new(vec![Ok("  STEADY: fine.  ".into())]);
        let gw = AdvisoryGateway::new(model.clone(), policy());

        let start = Instant::now();
        let text = gw.advise("2330.TW", &Fundamentals::default(), 0.004).await;

        assert_eq!(text, "STEADY: fine.");
        assert_eq!(model.calls(), 1);
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_retries_with_exponential_backoff() {
        let model = ScriptedModel::new(vec![limited(), limited(), Ok("WATCH".into())]);
        let gw = AdvisoryGateway::new(model.clone(), policy());

        let start = Instant::now();
        let text = gw.advise("2330.TW", &Fundamentals::default(), 0.0).await;

        assert_eq!(text, "WATCH");
        assert_eq!(model.calls(), 3);
        // 20s + 40s backoff, then 1s throttle
        assert_eq!(start.elapsed(), Duration::from_secs(61));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_gives_up_after_max_attempts() {
        let model = ScriptedModel::new(vec![limited()]);
        let gw = AdvisoryGateway::new(model.clone(), policy());

        let text = gw.advise("2330.TW", &Fundamentals::default(), 0.0).await;

        assert_eq!(text, RATE_LIMITED_TEXT);
        assert_eq!(model.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn exhausted_retries_are_logged() {
        let model = ScriptedModel::new(vec![limited()]);
        let gw = AdvisoryGateway::new(model, RetryPolicy::immediate(2));

        gw.advise("6117.TW", &Fundamentals::default(), 0.0).await;

        assert!(logs_contain("backing off"));
        assert!(logs_contain("attempts exhausted"));
    }

    #[tokio::test(start_paused = true)]
    async fn other_failures_are_not_retried() {
        let model = ScriptedModel::new(vec![Err(AdvisoryError::Api {
            status: 500,
            body: "boom".into(),
        })]);
        let gw = AdvisoryGateway::new(model.clone(), policy());

        let start = Instant::now();
        let text = gw.advise("2330.TW", &Fundamentals::default(), 0.0).await;

        assert!(text.starts_with("AI error:"), "{text}");
        assert!(text.contains("boom"));
        assert_eq!(model.calls(), 1);
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let p = policy();
        assert_eq!(p.backoff_for(1), Duration::from_secs(20));
        assert_eq!(p.backoff_for(2), Duration::from_secs(40));
        assert_eq!(p.backoff_for(3), Duration::from_secs(80));
    }

    #[test]
    fn prompt_marks_unknown_ratios() {
        let f = Fundamentals {
            revenue_growth: Some(0.125),
            trailing_pe: Some(18.4),
            ..Fundamentals::default()
        };
        let prompt = build_prompt("2330.TW", &f, 0.008);

        assert!(prompt.contains("Symbol: 2330.TW"));
        assert!(prompt.contains("Distance to support A: +0.8%"));
        assert!(prompt.contains("Revenue growth: 12.5%"));
        assert!(prompt.contains("Gross margin: N/A"));
        assert!(prompt.contains("Trailing P/E: 18.40"));
        assert!(prompt.contains("STRONG BUY, STEADY or WATCH"));
    }

    #[test]
    fn rating_is_derived_from_keywords() {
        assert_eq!(Rating::from_advice("Strong Buy: clean retest"), Rating::StrongBuy);
        assert_eq!(Rating::from_advice("STEADY - hold"), Rating::Steady);
        assert_eq!(Rating::from_advice("WATCH for confirmation"), Rating::Watch);
        assert_eq!(Rating::from_advice(RATE_LIMITED_TEXT), Rating::Watch);
    }
}
