#![cfg(unix)]

mod common;

use std::time::Instant;

use proc_pool::{Backoff, Pool};
use tokio::time::timeout;

use common::{ms, no_env, sh_args, SH};

#[tokio::test]
async fn test_wait_all_on_empty_pool_returns_immediately() {
    let pool = Pool::builder().build();
    timeout(ms(50), pool.wait_all())
        .await
        .expect("empty pool should drain immediately");
}

#[tokio::test]
async fn test_wait_all_blocks_while_process_runs() {
    let pool = Pool::builder().build();
    let _proc = pool.run(SH, sh_args("sleep 0.3"), no_env(), None).unwrap();

    let started = Instant::now();
    pool.wait_all().await;
    assert!(started.elapsed() >= ms(200));
    assert_eq!(pool.running_count(), 0);
}

#[tokio::test]
async fn test_wait_all_counts_sleeping_restart_as_in_flight() {
    let pool = Pool::builder()
        .with_default_backoff(Backoff::delays_then_stop([ms(400)]))
        .build();

    // Exits instantly, then sleeps 400ms before its one retry.
    let proc = pool.run(SH, sh_args("exit 1"), no_env(), None).unwrap();

    // During the backoff sleep no pid is registered, yet the pool must not
    // report itself drained.
    tokio::time::sleep(ms(150)).await;
    assert_eq!(pool.running_count(), 0);
    assert!(timeout(ms(50), pool.wait_all()).await.is_err());

    pool.wait_all().await;
    assert_eq!(proc.restart_count(), 1);
}

#[tokio::test]
async fn test_wait_all_with_concurrent_processes_and_waiters() {
    let pool = Pool::builder().build();
    let _p1 = pool.run(SH, sh_args("sleep 0.2"), no_env(), None).unwrap();
    let _p2 = pool.run(SH, sh_args("sleep 0.3"), no_env(), None).unwrap();

    let started = Instant::now();
    tokio::join!(pool.wait_all(), pool.wait_all(), pool.wait_all());
    assert!(started.elapsed() >= ms(200));
    assert_eq!(pool.running_count(), 0);
}

#[tokio::test]
async fn test_consecutive_waits() {
    let pool = Pool::builder().build();
    let _proc = pool.run(SH, sh_args("sleep 0.1"), no_env(), None).unwrap();

    pool.wait_all().await;
    // Already drained; further waits return immediately.
    timeout(ms(50), pool.wait_all()).await.unwrap();
    timeout(ms(50), pool.wait_all()).await.unwrap();
}
