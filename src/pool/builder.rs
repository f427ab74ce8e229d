use crate::{Backoff, Pool};

/// Builds a [`Pool`] with its composition options.
///
/// Options are independent and may be applied in any order.
pub struct PoolBuilder {
    default_backoff: Option<Backoff>,
    retry_on_success: bool,
    sigterm_relay: bool,
}

impl PoolBuilder {
    pub fn new() -> Self {
        Self {
            default_backoff: None,
            retry_on_success: false,
            sigterm_relay: false,
        }
    }

    /// Sets the backoff schedule cloned into every process that does not
    /// bring its own. Without a default, such processes are never retried.
    pub fn with_default_backoff(mut self, backoff: Backoff) -> Self {
        self.default_backoff = Some(backoff);
        self
    }

    /// Relays the host's termination signal (SIGTERM on unix, Ctrl-C
    /// elsewhere) to the pool: on delivery, every supervised process is
    /// stopped as if [`Pool::kill_all`] had been called.
    ///
    /// The subscription lives as long as the pool.
    pub fn with_sigterm_relay(mut self) -> Self {
        self.sigterm_relay = true;
        self
    }

    /// Also relaunches processes that exit cleanly (status zero), subject to
    /// the same backoff schedule. By default a clean exit is terminal.
    pub fn with_restart_on_success(mut self) -> Self {
        self.retry_on_success = true;
        self
    }

    /// Constructs the pool. Must be called within a tokio runtime when the
    /// signal relay is enabled.
    pub fn build(self) -> Pool {
        Pool::from_parts(
            self.default_backoff,
            self.retry_on_success,
            self.sigterm_relay,
        )
    }
}

impl Default for PoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}
