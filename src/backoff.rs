use std::{collections::VecDeque, time::Duration};

/// One step of a [`Backoff`] schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffStep {
    /// Wait this long before the next relaunch.
    Delay(Duration),
    /// Stop retrying from here on.
    Stop,
}

/// What a supervised process should do after an exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffDecision {
    /// Sleep for the given duration, then relaunch.
    RetryAfter(Duration),
    /// Give up; the process stays down.
    Stop,
}

impl BackoffDecision {
    pub fn is_stop(&self) -> bool {
        matches!(self, BackoffDecision::Stop)
    }
}

/// A retry-delay schedule consumed left-to-right.
///
/// Each call to [`next`](Backoff::next) yields the delay to wait before the
/// following relaunch, or [`BackoffDecision::Stop`] once retries are over:
///
/// * an empty schedule stops immediately;
/// * a [`BackoffStep::Stop`] step stops at that point, permanently;
/// * a schedule with no stop step keeps repeating its last delay forever.
///
/// `Backoff` is a plain value: the pool clones its default schedule into
/// every process that uses it, so each process advances a private cursor
/// and concurrent restarts never interfere.
///
/// ```rust
/// use std::time::Duration;
/// use proc_pool::{Backoff, BackoffDecision};
///
/// let mut backoff = Backoff::delays_then_stop([Duration::from_millis(100)]);
/// assert_eq!(
///     backoff.next(),
///     BackoffDecision::RetryAfter(Duration::from_millis(100))
/// );
/// assert_eq!(backoff.next(), BackoffDecision::Stop);
/// assert_eq!(backoff.next(), BackoffDecision::Stop);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Backoff {
    steps: VecDeque<BackoffStep>,
}

impl Backoff {
    /// Creates a schedule from explicit steps.
    pub fn new(steps: impl IntoIterator<Item = BackoffStep>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
        }
    }

    /// A schedule of delays with no stop step: once the delays run out, the
    /// last one repeats indefinitely.
    pub fn delays(delays: impl IntoIterator<Item = Duration>) -> Self {
        Self::new(delays.into_iter().map(BackoffStep::Delay))
    }

    /// A schedule of delays followed by a stop step: retries end after the
    /// last delay has been consumed.
    pub fn delays_then_stop(delays: impl IntoIterator<Item = Duration>) -> Self {
        let mut backoff = Self::delays(delays);
        backoff.steps.push_back(BackoffStep::Stop);
        backoff
    }

    /// Advances the schedule and returns the decision for the next relaunch.
    ///
    /// Safe to call arbitrarily often after the schedule has stopped; it
    /// keeps returning [`BackoffDecision::Stop`].
    pub fn next(&mut self) -> BackoffDecision {
        match self.steps.front() {
            None | Some(BackoffStep::Stop) => BackoffDecision::Stop,
            Some(BackoffStep::Delay(delay)) => {
                let delay = *delay;
                // Keep a sole trailing delay in place so it repeats forever.
                if self.steps.len() > 1 {
                    self.steps.pop_front();
                }
                BackoffDecision::RetryAfter(delay)
            }
        }
    }
}

impl FromIterator<BackoffStep> for Backoff {
    fn from_iter<I: IntoIterator<Item = BackoffStep>>(iter: I) -> Self {
        Self::new(iter)
    }
}
