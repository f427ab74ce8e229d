use std::{
    io,
    process::Stdio,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc, Mutex,
    },
};

use tokio::{
    io::AsyncReadExt,
    process::{Child, Command},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{output::OutputBuffer, pool::PoolShared, Backoff, BackoffDecision, Pid};

/// Errors reported by [`ProcessHandle::stop`].
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// `stop()` found no live OS process to kill. The stop request itself
    /// still took effect: any pending restart is suppressed.
    #[error("no live process to kill")]
    NoProcess,
}

/// Where a supervised process currently is in its lifecycle.
///
/// `Stopped` (explicit stop) and `Terminated` (clean exit, missing backoff,
/// or backoff exhaustion) are absorbing: no transition leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Created,
    Spawning,
    Running,
    Exited,
    Restarting,
    Stopped,
    Terminated,
}

impl ProcessStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, ProcessStatus::Running)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessStatus::Stopped | ProcessStatus::Terminated)
    }
}

impl std::fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Spawning => write!(f, "spawning"),
            Self::Running => write!(f, "running"),
            Self::Exited => write!(f, "exited"),
            Self::Restarting => write!(f, "restarting"),
            Self::Stopped => write!(f, "stopped"),
            Self::Terminated => write!(f, "terminated"),
        }
    }
}

pub(crate) struct ProcessInner {
    path: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
    stdout: OutputBuffer,
    stderr: OutputBuffer,
    backoff: Mutex<Option<Backoff>>,
    retry_on_success: bool,
    status: Mutex<ProcessStatus>,
    pid: Mutex<Option<Pid>>,
    restarts: AtomicU32,
    // Permanent stop flag: cancelled once, never reset.
    stop: CancellationToken,
    // The monitor task, owned by the handle. Never joined; the pool's
    // in-flight counter tracks its completion.
    #[allow(dead_code)]
    monitor: Mutex<Option<JoinHandle<()>>>,
}

/// Handle to one supervised process.
///
/// Returned by [`Pool::run`](crate::Pool::run). Cheap to clone; all clones
/// refer to the same supervision. Dropping every handle does not stop the
/// process: supervision keeps running until a terminal state is reached.
#[derive(Clone)]
pub struct ProcessHandle {
    inner: Arc<ProcessInner>,
}

impl ProcessHandle {
    pub(crate) fn new(
        path: String,
        args: Vec<String>,
        env: Vec<(String, String)>,
        backoff: Option<Backoff>,
        retry_on_success: bool,
    ) -> Self {
        Self {
            inner: Arc::new(ProcessInner {
                path,
                args,
                env,
                stdout: OutputBuffer::new(),
                stderr: OutputBuffer::new(),
                backoff: Mutex::new(backoff),
                retry_on_success,
                status: Mutex::new(ProcessStatus::Created),
                pid: Mutex::new(None),
                restarts: AtomicU32::new(0),
                stop: CancellationToken::new(),
                monitor: Mutex::new(None),
            }),
        }
    }

    /// Pid of the underlying OS process, or `None` while nothing is running
    /// (before the first spawn, between restarts, or after termination).
    pub fn pid(&self) -> Option<Pid> {
        *self.inner.pid.lock().expect("pid lock poisoned")
    }

    /// Current lifecycle state.
    pub fn status(&self) -> ProcessStatus {
        *self.inner.status.lock().expect("status lock poisoned")
    }

    /// How many times the process has been relaunched after an exit.
    pub fn restart_count(&self) -> u32 {
        self.inner.restarts.load(Ordering::Relaxed)
    }

    /// Everything the process wrote to stdout, across all restarts.
    pub fn stdout_output(&self) -> Vec<u8> {
        self.inner.stdout.contents()
    }

    /// Everything the process wrote to stderr, across all restarts.
    pub fn stderr_output(&self) -> Vec<u8> {
        self.inner.stderr.contents()
    }

    /// Permanently stops the supervision and kills the OS process if one is
    /// alive.
    ///
    /// The stop flag is one-way: it also suppresses a restart that is
    /// currently sleeping its backoff delay. Returns
    /// [`ProcessError::NoProcess`] when there was nothing alive to kill
    /// (mid-backoff or already terminal); that is informational, and calling
    /// `stop` again later is always safe.
    pub fn stop(&self) -> Result<(), ProcessError> {
        self.inner.stop.cancel();
        if self.pid().is_none() {
            return Err(ProcessError::NoProcess);
        }
        Ok(())
    }

    pub(crate) fn mark(&self, status: ProcessStatus) {
        *self.inner.status.lock().expect("status lock poisoned") = status;
    }

    pub(crate) fn set_pid(&self, pid: Option<Pid>) {
        *self.inner.pid.lock().expect("pid lock poisoned") = pid;
    }

    fn take_pid(&self) -> Option<Pid> {
        self.inner.pid.lock().expect("pid lock poisoned").take()
    }

    /// Spawns one generation of the OS process and wires its output sinks.
    ///
    /// Synchronous: an exec failure (missing binary, permission denied) is
    /// returned directly and nothing is registered. The returned tasks drain
    /// the child's stdout/stderr; the monitor awaits them after the exit so
    /// captured output is complete before the supervision moves on.
    pub(crate) fn spawn_child(&self) -> io::Result<(Child, Vec<JoinHandle<()>>)> {
        let mut cmd = Command::new(&self.inner.path);
        cmd.args(&self.inner.args)
            .envs(self.inner.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn()?;
        let mut io_tasks = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            io_tasks.push(tokio::spawn(drain_into(stdout, self.inner.stdout.clone())));
        }
        if let Some(stderr) = child.stderr.take() {
            io_tasks.push(tokio::spawn(drain_into(stderr, self.inner.stderr.clone())));
        }
        Ok((child, io_tasks))
    }

    pub(crate) fn attach_monitor(
        &self,
        pool: Arc<PoolShared>,
        supervision_id: u64,
        child: Child,
        io_tasks: Vec<JoinHandle<()>>,
    ) {
        let task = tokio::spawn(supervise(
            self.clone(),
            pool,
            supervision_id,
            child,
            io_tasks,
        ));
        *self.inner.monitor.lock().expect("monitor lock poisoned") = Some(task);
    }
}

/// Awaits the current generation's output-drain tasks, so the sinks hold
/// the generation's complete output before the next decision is taken.
async fn flush_io(io_tasks: &mut Vec<JoinHandle<()>>) {
    for task in io_tasks.drain(..) {
        let _ = task.await;
    }
}

/// Copies a child stream into its sink until EOF.
async fn drain_into(mut src: impl tokio::io::AsyncRead + Unpin, sink: OutputBuffer) {
    let mut buf = [0u8; 4096];
    loop {
        match src.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => sink.append(&buf[..n]),
        }
    }
}

/// The supervision loop: one structured task per supervised process, alive
/// from the first successful spawn until a terminal state.
///
/// Each iteration owns one generation of the OS process. The loop blocks on
/// `Child::wait()`, decides what the exit means, and either relaunches after
/// the backoff delay or ends the supervision. The pool's in-flight count is
/// held for the whole loop, including backoff sleeps, so `wait_all` cannot
/// return while a restart is merely pending.
async fn supervise(
    handle: ProcessHandle,
    pool: Arc<PoolShared>,
    supervision_id: u64,
    mut child: Child,
    mut io_tasks: Vec<JoinHandle<()>>,
) {
    loop {
        let exit = tokio::select! {
            exit = child.wait() => exit,
            _ = handle.inner.stop.cancelled() => {
                let _ = child.start_kill();
                // Reap before unregistering so the pid cannot be reused
                // while the registry still maps it.
                let _ = child.wait().await;
                flush_io(&mut io_tasks).await;
                if let Some(pid) = handle.take_pid() {
                    pool.unregister(pid);
                }
                handle.mark(ProcessStatus::Stopped);
                break;
            }
        };
        flush_io(&mut io_tasks).await;

        // Unregister before deciding anything else; drain-waiters and pid
        // reuse both depend on the old entry being gone first.
        if let Some(pid) = handle.take_pid() {
            pool.unregister(pid);
        }

        if handle.inner.stop.is_cancelled() {
            handle.mark(ProcessStatus::Stopped);
            break;
        }
        handle.mark(ProcessStatus::Exited);

        let success = exit.as_ref().map(|s| s.success()).unwrap_or(false);
        debug!(path = %handle.inner.path, success, "process exited");
        if success && !handle.inner.retry_on_success {
            handle.mark(ProcessStatus::Terminated);
            break;
        }

        let decision = handle
            .inner
            .backoff
            .lock()
            .expect("backoff lock poisoned")
            .as_mut()
            .map(Backoff::next)
            .unwrap_or(BackoffDecision::Stop);
        let delay = match decision {
            BackoffDecision::Stop => {
                handle.mark(ProcessStatus::Terminated);
                break;
            }
            BackoffDecision::RetryAfter(delay) => delay,
        };

        handle.mark(ProcessStatus::Restarting);
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = handle.inner.stop.cancelled() => {}
        }
        // A stop issued during the sleep has no OS process to kill; it is
        // honored here instead.
        if handle.inner.stop.is_cancelled() {
            handle.mark(ProcessStatus::Stopped);
            break;
        }

        handle.mark(ProcessStatus::Spawning);
        match handle.spawn_child() {
            Ok((next_child, next_io_tasks)) => {
                handle.inner.restarts.fetch_add(1, Ordering::Relaxed);
                let pid = next_child.id();
                handle.set_pid(pid);
                if let Some(pid) = pid {
                    pool.register(pid, handle.clone());
                }
                handle.mark(ProcessStatus::Running);
                debug!(path = %handle.inner.path, pid, "process relaunched");
                child = next_child;
                io_tasks = next_io_tasks;
            }
            Err(err) => {
                warn!(path = %handle.inner.path, error = %err, "relaunch failed");
                handle.mark(ProcessStatus::Terminated);
                break;
            }
        }
    }
    pool.retire(supervision_id);
}
