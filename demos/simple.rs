use std::time::Duration;

use anyhow::Result;
use proc_pool::{Backoff, Pool};

#[tokio::main]
async fn main() -> Result<()> {
    // Retry failed processes three times, with growing delays.
    let pool = Pool::builder()
        .with_default_backoff(Backoff::delays_then_stop([
            Duration::from_millis(100),
            Duration::from_millis(200),
            Duration::from_millis(500),
        ]))
        .with_sigterm_relay()
        .build();

    let flaky = pool.run(
        "/bin/sh",
        ["-c", "echo attempt; exit 1"],
        [("LANG", "C")],
        None,
    )?;
    let clean = pool.run("/bin/sh", ["-c", "echo all good"], [("LANG", "C")], None)?;

    println!("flaky pid: {:?}, clean pid: {:?}", flaky.pid(), clean.pid());

    // Blocks until the clean process exits and the flaky one exhausts its
    // retries (or a SIGTERM kills everything via the relay).
    pool.wait_all().await;

    println!(
        "flaky restarted {} times, wrote: {:?}",
        flaky.restart_count(),
        String::from_utf8_lossy(&flaky.stdout_output())
    );
    println!(
        "clean wrote: {:?}",
        String::from_utf8_lossy(&clean.stdout_output())
    );
    Ok(())
}
