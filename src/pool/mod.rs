pub(crate) mod builder;

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use tokio::sync::watch;
use tracing::debug;

use crate::{
    process::{ProcessHandle, ProcessStatus},
    signal::SignalBridge,
    Backoff, Pid,
};

/// Errors returned by [`Pool::run`].
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// The OS process could not even be started. Nothing was registered and
    /// no retry is attempted.
    #[error("failed to spawn `{path}`: {source}")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Default)]
struct PoolState {
    /// Live OS processes only: pid -> handle. An entry exists exactly while
    /// the OS process is alive, and an expiring pid is removed before a
    /// successor generation inserts a (possibly reused) pid.
    registry: HashMap<Pid, ProcessHandle>,
    /// Every in-flight supervision, including ones sleeping out a backoff
    /// delay with no live OS process. Keyed by a monotonic id.
    supervised: HashMap<u64, ProcessHandle>,
    next_supervision_id: u64,
}

/// State shared between the pool front-end and the monitor tasks.
pub(crate) struct PoolShared {
    state: Mutex<PoolState>,
    // Mirrors `supervised.len()` for the drain-wait.
    inflight_tx: watch::Sender<usize>,
    inflight_rx: watch::Receiver<usize>,
    default_backoff: Option<Backoff>,
    retry_on_success: bool,
}

impl PoolShared {
    fn new(default_backoff: Option<Backoff>, retry_on_success: bool) -> Self {
        let (inflight_tx, inflight_rx) = watch::channel(0);
        Self {
            state: Mutex::new(PoolState::default()),
            inflight_tx,
            inflight_rx,
            default_backoff,
            retry_on_success,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PoolState> {
        self.state.lock().expect("pool lock poisoned")
    }

    /// Admits a new supervision and registers its first pid, atomically with
    /// respect to `kill_all` and other registrations.
    fn admit(&self, handle: &ProcessHandle, pid: Option<Pid>) -> u64 {
        let mut state = self.lock();
        let id = state.next_supervision_id;
        state.next_supervision_id += 1;
        state.supervised.insert(id, handle.clone());
        if let Some(pid) = pid {
            state.registry.insert(pid, handle.clone());
        }
        let inflight = state.supervised.len();
        drop(state);
        self.inflight_tx.send_replace(inflight);
        id
    }

    pub(crate) fn register(&self, pid: Pid, handle: ProcessHandle) {
        self.lock().registry.insert(pid, handle);
    }

    pub(crate) fn unregister(&self, pid: Pid) {
        self.lock().registry.remove(&pid);
    }

    /// Ends a supervision; the last `retire` lets `wait_all` return.
    pub(crate) fn retire(&self, supervision_id: u64) {
        let mut state = self.lock();
        state.supervised.remove(&supervision_id);
        let inflight = state.supervised.len();
        drop(state);
        self.inflight_tx.send_replace(inflight);
    }

    pub(crate) fn kill_all(&self) {
        let state = self.lock();
        debug!(supervised = state.supervised.len(), "killing all processes");
        for handle in state.supervised.values() {
            // NoProcess just means the supervision was mid-backoff; the stop
            // flag still suppresses its pending restart.
            let _ = handle.stop();
        }
    }

    fn running_count(&self) -> usize {
        self.lock().registry.len()
    }
}

/// A pool of supervised OS processes.
///
/// Each [`run`](Pool::run) spawns a command and keeps it under supervision:
/// when the process exits and its backoff schedule allows another attempt,
/// it is relaunched after the scheduled delay. The pool tracks every live
/// and pending supervision so the whole group can be awaited or killed at
/// once.
///
/// ```rust,no_run
/// use std::time::Duration;
/// use proc_pool::{Backoff, Pool};
///
/// #[tokio::main]
/// async fn main() -> Result<(), proc_pool::PoolError> {
///     let pool = Pool::builder()
///         .with_default_backoff(Backoff::delays_then_stop([
///             Duration::from_millis(100),
///             Duration::from_millis(200),
///             Duration::from_millis(500),
///         ]))
///         .with_sigterm_relay()
///         .build();
///
///     let proc = pool.run("my-worker", ["--verbose"], [("MODE", "batch")], None)?;
///     println!("worker pid: {:?}", proc.pid());
///
///     pool.wait_all().await;
///     Ok(())
/// }
/// ```
pub struct Pool {
    shared: Arc<PoolShared>,
    // Held for teardown ability; lives as long as the pool.
    #[allow(dead_code)]
    signal_bridge: Option<SignalBridge>,
}

impl Pool {
    /// Returns a builder with no default backoff and no signal relay.
    pub fn builder() -> builder::PoolBuilder {
        builder::PoolBuilder::new()
    }

    pub(crate) fn from_parts(
        default_backoff: Option<Backoff>,
        retry_on_success: bool,
        sigterm_relay: bool,
    ) -> Self {
        let shared = Arc::new(PoolShared::new(default_backoff, retry_on_success));
        let signal_bridge = sigterm_relay.then(|| SignalBridge::subscribe(Arc::clone(&shared)));
        Self {
            shared,
            signal_bridge,
        }
    }

    /// Spawns `path` with the given arguments and starts supervising it.
    ///
    /// `env` entries are added on top of the inherited environment. When
    /// `backoff` is `None`, a fresh clone of the pool's default schedule is
    /// used; a pool without a default means no retries.
    ///
    /// A spawn failure (missing binary, permission denied) is returned
    /// synchronously and the command is never registered. On success the
    /// handle is returned immediately; monitoring and restarts happen in the
    /// background.
    pub fn run<P, A, E, K, V>(
        &self,
        path: P,
        args: A,
        env: E,
        backoff: Option<Backoff>,
    ) -> Result<ProcessHandle, PoolError>
    where
        P: Into<String>,
        A: IntoIterator,
        A::Item: Into<String>,
        E: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let path = path.into();
        let backoff = backoff.or_else(|| self.shared.default_backoff.clone());
        let handle = ProcessHandle::new(
            path.clone(),
            args.into_iter().map(Into::into).collect(),
            env.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            backoff,
            self.shared.retry_on_success,
        );

        handle.mark(ProcessStatus::Spawning);
        let (child, io_tasks) = handle.spawn_child().map_err(|source| PoolError::Spawn {
            path: path.clone(),
            source,
        })?;

        let pid = child.id();
        handle.set_pid(pid);
        let supervision_id = self.shared.admit(&handle, pid);
        handle.mark(ProcessStatus::Running);
        debug!(path = %path, pid, "process started");

        handle.attach_monitor(Arc::clone(&self.shared), supervision_id, child, io_tasks);
        Ok(handle)
    }

    /// Blocks until no supervision is in flight.
    ///
    /// Counts processes sleeping out a backoff delay as in flight, so a
    /// merely pending restart keeps this waiting. Safe to call repeatedly
    /// and from several tasks at once; with nothing running it returns
    /// immediately.
    pub async fn wait_all(&self) {
        let mut inflight = self.shared.inflight_rx.clone();
        // Only errors if the sender is dropped, and we hold it via `shared`.
        let _ = inflight.wait_for(|count| *count == 0).await;
    }

    /// Stops every supervision: kills all live processes and suppresses the
    /// restarts of supervisions currently sleeping out a backoff delay.
    pub fn kill_all(&self) {
        self.shared.kill_all();
    }

    /// Number of currently-live OS processes (registered pids).
    pub fn running_count(&self) -> usize {
        self.shared.running_count()
    }
}
