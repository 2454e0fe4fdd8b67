//! Circuit breaker for dependency protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls go straight to the fallback
//! - Half-Open: a limited number of trial calls test for recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure rate >= threshold over at least `minimum_number_of_calls`
//! Open → Half-Open: first call after `wait_duration_in_open_state`
//! Half-Open → Closed: all permitted trial calls succeed
//! Half-Open → Open: any trial call fails (cooldown restarts)
//! ```
//!
//! # Design Decisions
//! - Count-based sliding window over the last `sliding_window_size` outcomes
//! - Every transition starts a new generation and clears the window; outcomes
//!   of calls admitted under an older generation only update counters
//! - One mutex per breaker, never held across an `.await`
//! - Time comes from `tokio::time::Instant` so a paused test clock drives cooldowns

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::config::BreakerConfig;
use crate::observability::metrics;

/// Breaker mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }

    /// Value exported on the state gauge.
    pub fn gauge_value(&self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::Open => 1.0,
            CircuitState::HalfOpen => 2.0,
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a fallback was invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackCause<E> {
    /// The breaker did not admit the call; the primary never ran.
    Rejected,
    /// The primary ran and failed.
    Failed(E),
}

impl<E> FallbackCause<E> {
    pub fn is_rejected(&self) -> bool {
        matches!(self, FallbackCause::Rejected)
    }

    pub fn into_error(self) -> Option<E> {
        match self {
            FallbackCause::Rejected => None,
            FallbackCause::Failed(e) => Some(e),
        }
    }
}

impl<E: fmt::Display> fmt::Display for FallbackCause<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackCause::Rejected => f.write_str("call not permitted by open circuit"),
            FallbackCause::Failed(e) => write!(f, "{}", e),
        }
    }
}

/// Runtime settings of a single breaker.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakerSettings {
    /// Failure percentage (0-100] at which the breaker opens.
    pub failure_rate_threshold: f64,
    /// Number of most recent outcomes kept in the window.
    pub sliding_window_size: usize,
    /// Outcomes required before the failure rate is evaluated.
    pub minimum_number_of_calls: usize,
    /// Cooldown before an open breaker admits trial calls.
    pub wait_duration_in_open_state: Duration,
    /// Trial calls admitted while half-open.
    pub permitted_calls_in_half_open: u32,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self::from(&BreakerConfig::default())
    }
}

impl From<&BreakerConfig> for BreakerSettings {
    fn from(config: &BreakerConfig) -> Self {
        Self {
            failure_rate_threshold: config.failure_rate_threshold,
            sliding_window_size: config.sliding_window_size,
            minimum_number_of_calls: config.minimum_number_of_calls,
            wait_duration_in_open_state: Duration::from_millis(config.wait_duration_in_open_state_ms),
            permitted_calls_in_half_open: config.permitted_calls_in_half_open,
        }
    }
}

/// Fixed-size window of call outcomes (`true` = failure).
#[derive(Debug)]
struct SlidingWindow {
    outcomes: VecDeque<bool>,
    capacity: usize,
    failures: usize,
}

impl SlidingWindow {
    fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            outcomes: VecDeque::with_capacity(capacity),
            capacity,
            failures: 0,
        }
    }

    fn record(&mut self, failed: bool) {
        if self.outcomes.len() == self.capacity {
            if let Some(true) = self.outcomes.pop_front() {
                self.failures -= 1;
            }
        }
        self.outcomes.push_back(failed);
        if failed {
            self.failures += 1;
        }
    }

    fn len(&self) -> usize {
        self.outcomes.len()
    }

    fn failure_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        self.failures as f64 * 100.0 / self.outcomes.len() as f64
    }

    fn clear(&mut self) {
        self.outcomes.clear();
        self.failures = 0;
    }
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    generation: u64,
    last_transition: Instant,
    window: SlidingWindow,
    half_open_admitted: u32,
    half_open_successes: u32,
    successful_calls: u64,
    failed_calls: u64,
    not_permitted_calls: u64,
}

/// Point-in-time view of a breaker, served by the admin API.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    /// Failure percentage, `None` until the window holds enough calls.
    pub failure_rate: Option<f64>,
    pub buffered_calls: usize,
    pub failed_buffered_calls: usize,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub not_permitted_calls: u64,
    pub since_last_transition_secs: f64,
}

/// A named circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    settings: BreakerSettings,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, settings: BreakerSettings) -> Self {
        let name = name.into();
        metrics::record_breaker_state(&name, CircuitState::Closed);
        let window = SlidingWindow::new(settings.sliding_window_size);
        Self {
            name,
            settings,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                generation: 0,
                last_transition: Instant::now(),
                window,
                half_open_admitted: 0,
                half_open_successes: 0,
                successful_calls: 0,
                failed_calls: 0,
                not_permitted_calls: 0,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &BreakerSettings {
        &self.settings
    }

    /// Current mode. An open breaker whose cooldown elapsed still reports
    /// `Open` until the next call moves it to half-open.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Run `primary`, falling back on rejection or on any error.
    ///
    /// The fallback's result is returned as-is.
    pub async fn execute<I, T, E, P, Fut, F>(&self, input: I, primary: P, fallback: F) -> Result<T, E>
    where
        I: Clone,
        P: FnOnce(I) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        F: FnOnce(I, FallbackCause<E>) -> Result<T, E>,
    {
        self.execute_classified(input, primary, fallback, |_| true).await
    }

    /// Like [`execute`](Self::execute), but errors rejected by `is_failure`
    /// are handed back to the caller untouched and recorded as successes.
    pub async fn execute_classified<I, T, E, P, Fut, F, C>(
        &self,
        input: I,
        primary: P,
        fallback: F,
        is_failure: C,
    ) -> Result<T, E>
    where
        I: Clone,
        P: FnOnce(I) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        F: FnOnce(I, FallbackCause<E>) -> Result<T, E>,
        C: Fn(&E) -> bool,
    {
        let Some(permit) = self.try_acquire() else {
            tracing::debug!(breaker = %self.name, "Call short-circuited");
            metrics::record_breaker_call(&self.name, "not_permitted");
            return fallback(input, FallbackCause::Rejected);
        };

        match primary(input.clone()).await {
            Ok(value) => {
                permit.settle(true);
                Ok(value)
            }
            Err(e) if !is_failure(&e) => {
                permit.settle(true);
                Err(e)
            }
            Err(e) => {
                permit.settle(false);
                fallback(input, FallbackCause::Failed(e))
            }
        }
    }

    /// Force the breaker closed and empty its window.
    pub fn reset(&self) {
        let mut inner = self.lock();
        self.transition(&mut inner, CircuitState::Closed, Instant::now());
        inner.window.clear();
    }

    /// Force the breaker open, starting a fresh cooldown.
    pub fn trip(&self) {
        let mut inner = self.lock();
        let now = Instant::now();
        if inner.state == CircuitState::Open {
            inner.last_transition = now;
        } else {
            self.transition(&mut inner, CircuitState::Open, now);
        }
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();
        let buffered_calls = inner.window.len();
        BreakerSnapshot {
            name: self.name.clone(),
            state: inner.state,
            failure_rate: (buffered_calls >= self.settings.minimum_number_of_calls)
                .then(|| inner.window.failure_rate()),
            buffered_calls,
            failed_buffered_calls: inner.window.failures,
            successful_calls: inner.successful_calls,
            failed_calls: inner.failed_calls,
            not_permitted_calls: inner.not_permitted_calls,
            since_last_transition_secs: inner.last_transition.elapsed().as_secs_f64(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_acquire(&self) -> Option<CallPermit<'_>> {
        let mut inner = self.lock();
        let now = Instant::now();

        if inner.state == CircuitState::Open
            && now.duration_since(inner.last_transition) >= self.settings.wait_duration_in_open_state
        {
            self.transition(&mut inner, CircuitState::HalfOpen, now);
        }

        let admitted = match inner.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen if inner.half_open_admitted < self.settings.permitted_calls_in_half_open => {
                inner.half_open_admitted += 1;
                true
            }
            _ => false,
        };

        if !admitted {
            inner.not_permitted_calls += 1;
            return None;
        }

        Some(CallPermit {
            breaker: self,
            generation: inner.generation,
            settled: false,
        })
    }

    fn on_success(&self, generation: u64) {
        metrics::record_breaker_call(&self.name, "success");
        let mut inner = self.lock();
        inner.successful_calls += 1;
        if inner.generation != generation {
            return;
        }

        match inner.state {
            CircuitState::Closed => {
                inner.window.record(false);
                self.evaluate(&mut inner);
            }
            CircuitState::HalfOpen => {
                inner.half_open_successes += 1;
                if inner.half_open_successes >= self.settings.permitted_calls_in_half_open {
                    self.transition(&mut inner, CircuitState::Closed, Instant::now());
                }
            }
            CircuitState::Open => {}
        }
    }

    fn on_failure(&self, generation: u64) {
        metrics::record_breaker_call(&self.name, "failure");
        let mut inner = self.lock();
        inner.failed_calls += 1;
        if inner.generation != generation {
            return;
        }

        match inner.state {
            CircuitState::Closed => {
                inner.window.record(true);
                self.evaluate(&mut inner);
            }
            CircuitState::HalfOpen => {
                self.transition(&mut inner, CircuitState::Open, Instant::now());
            }
            CircuitState::Open => {}
        }
    }

    /// Release a half-open slot held by a call that never completed.
    fn on_abandoned(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.generation == generation && inner.state == CircuitState::HalfOpen {
            inner.half_open_admitted = inner.half_open_admitted.saturating_sub(1);
        }
    }

    fn evaluate(&self, inner: &mut Inner) {
        if inner.window.len() < self.settings.minimum_number_of_calls {
            return;
        }
        let rate = inner.window.failure_rate();
        if rate >= self.settings.failure_rate_threshold {
            tracing::warn!(
                breaker = %self.name,
                failure_rate = rate,
                threshold = self.settings.failure_rate_threshold,
                "Failure rate threshold exceeded"
            );
            self.transition(inner, CircuitState::Open, Instant::now());
        }
    }

    fn transition(&self, inner: &mut Inner, to: CircuitState, now: Instant) {
        let from = inner.state;
        if from == to {
            return;
        }

        inner.state = to;
        inner.generation += 1;
        inner.last_transition = now;
        inner.half_open_admitted = 0;
        inner.half_open_successes = 0;
        inner.window.clear();

        match to {
            CircuitState::Open => {
                tracing::warn!(breaker = %self.name, from = %from, to = %to, "Circuit breaker state transition")
            }
            _ => tracing::info!(breaker = %self.name, from = %from, to = %to, "Circuit breaker state transition"),
        }
        metrics::record_breaker_state(&self.name, to);
    }
}

/// Admission ticket for one guarded call.
///
/// Dropping it unsettled (the call's future was cancelled) gives a
/// half-open trial slot back.
struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    settled: bool,
}

impl CallPermit<'_> {
    fn settle(mut self, success: bool) {
        self.settled = true;
        if success {
            self.breaker.on_success(self.generation);
        } else {
            self.breaker.on_failure(self.generation);
        }
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.on_abandoned(self.generation);
        }
    }
}
