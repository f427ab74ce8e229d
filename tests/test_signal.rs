#![cfg(unix)]

mod common;

use proc_pool::{Pool, ProcessStatus};
use tokio::time::timeout;

use common::{ms, no_env, sh_args, short_backoff, SH};

#[tokio::test]
async fn test_sigterm_relay_kills_all_processes() {
    // Hold our own SIGTERM subscription so the signal cannot take the test
    // process down even if it beats the bridge's subscription.
    let _guard = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .expect("subscribe to SIGTERM");

    let pool = Pool::builder()
        .with_default_backoff(short_backoff())
        .with_sigterm_relay()
        .build();

    let p1 = pool.run(SH, sh_args("sleep 100"), no_env(), None).unwrap();
    let p2 = pool.run(SH, sh_args("sleep 100"), no_env(), None).unwrap();

    // Give the bridge time to install its subscription, then deliver the
    // signal to ourselves, as the hosting program's init system would.
    tokio::time::sleep(ms(200)).await;
    let pid = std::process::id();
    let status = std::process::Command::new("kill")
        .args(["-s", "TERM", &pid.to_string()])
        .status()
        .expect("run kill");
    assert!(status.success());

    // Without the relay this would block for 100 seconds.
    timeout(ms(5000), pool.wait_all())
        .await
        .expect("SIGTERM relay should drain the pool");

    assert_eq!(p1.status(), ProcessStatus::Stopped);
    assert_eq!(p2.status(), ProcessStatus::Stopped);
    assert_eq!(pool.running_count(), 0);
}
