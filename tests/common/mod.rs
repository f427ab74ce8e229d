use std::time::Duration;

use proc_pool::{Backoff, Pool};

// Every child in the suite is a short /bin/sh script.
#[allow(unused)]
pub const SH: &str = "/bin/sh";

#[allow(unused)]
pub fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[allow(unused)]
pub fn sh_args(script: &str) -> [String; 2] {
    ["-c".to_string(), script.to_string()]
}

#[allow(unused)]
pub fn no_env() -> Vec<(String, String)> {
    Vec::new()
}

/// `[100ms, 200ms, 500ms, STOP]` — three retries, then give up.
#[allow(unused)]
pub fn short_backoff() -> Backoff {
    Backoff::delays_then_stop([ms(100), ms(200), ms(500)])
}

#[allow(unused)]
pub fn pool_with_short_backoff() -> Pool {
    Pool::builder().with_default_backoff(short_backoff()).build()
}
