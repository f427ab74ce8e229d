//! # proc-pool
//!
//! `proc-pool` keeps external OS processes alive. It spawns commands,
//! watches them until they exit, and relaunches failed ones following a
//! configurable backoff schedule. The whole supervised group can be awaited,
//! killed at once, or wired to the host's termination signal.
//!
//! ## Quick example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use proc_pool::{Backoff, Pool};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), proc_pool::PoolError> {
//!     let pool = Pool::builder()
//!         .with_default_backoff(Backoff::delays_then_stop([
//!             Duration::from_millis(100),
//!             Duration::from_millis(200),
//!             Duration::from_millis(500),
//!         ]))
//!         .build();
//!
//!     let proc = pool.run("flaky-worker", ["--once"], [("MODE", "batch")], None)?;
//!
//!     pool.wait_all().await; // until every process is done retrying
//!     println!("{}", String::from_utf8_lossy(&proc.stdout_output()));
//!     Ok(())
//! }
//! ```
//!
//! ## What you get
//!
//! * **Automatic relaunches** – failed processes come back after the delays
//!   of their [`Backoff`] schedule, until it says stop.
//! * **Group control** – [`Pool::wait_all`] blocks until nothing is running
//!   or pending a restart; [`Pool::kill_all`] stops everything, including
//!   restarts that are still sleeping.
//! * **Signal relay** – opt-in SIGTERM subscription that maps the host's
//!   termination signal to `kill_all`.
//! * **Captured output** – stdout and stderr accumulate across restarts and
//!   are readable from the [`ProcessHandle`].
//!
//! Spawn failures surface synchronously from [`Pool::run`]; anything that
//! happens after a successful spawn (crashes, non-zero exits) silently
//! drives the restart decision instead.

pub use backoff::{Backoff, BackoffDecision, BackoffStep};
pub use pool::{builder::PoolBuilder, Pool, PoolError};
pub use process::{ProcessError, ProcessHandle, ProcessStatus};

mod backoff;
mod output;
mod pool;
mod process;
mod signal;

/// OS process id.
pub type Pid = u32;
