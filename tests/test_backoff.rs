use std::time::Duration;

use proc_pool::{Backoff, BackoffDecision, BackoffStep};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn test_delays_then_stop_sequence() {
    let mut backoff = Backoff::delays_then_stop([ms(100), ms(200), ms(500)]);

    assert_eq!(backoff.next(), BackoffDecision::RetryAfter(ms(100)));
    assert_eq!(backoff.next(), BackoffDecision::RetryAfter(ms(200)));
    assert_eq!(backoff.next(), BackoffDecision::RetryAfter(ms(500)));
    assert_eq!(backoff.next(), BackoffDecision::Stop);

    // Terminal behavior is idempotent.
    for _ in 0..10 {
        assert_eq!(backoff.next(), BackoffDecision::Stop);
    }
}

#[test]
fn test_last_delay_repeats_without_stop_step() {
    let mut backoff = Backoff::delays([ms(1), ms(2), ms(3)]);

    assert_eq!(backoff.next(), BackoffDecision::RetryAfter(ms(1)));
    assert_eq!(backoff.next(), BackoffDecision::RetryAfter(ms(2)));
    for _ in 0..10 {
        assert_eq!(backoff.next(), BackoffDecision::RetryAfter(ms(3)));
    }
}

#[test]
fn test_empty_schedule_stops_immediately() {
    let mut backoff = Backoff::default();
    for _ in 0..4 {
        assert_eq!(backoff.next(), BackoffDecision::Stop);
    }
}

#[test]
fn test_leading_stop_step_shadows_later_delays() {
    let mut backoff = Backoff::new([BackoffStep::Stop, BackoffStep::Delay(ms(5))]);
    assert_eq!(backoff.next(), BackoffDecision::Stop);
    assert_eq!(backoff.next(), BackoffDecision::Stop);
}

#[test]
fn test_clones_advance_independently() {
    let mut original = Backoff::delays_then_stop([ms(100), ms(200)]);
    let mut clone = original.clone();

    assert_eq!(original.next(), BackoffDecision::RetryAfter(ms(100)));
    assert_eq!(original.next(), BackoffDecision::RetryAfter(ms(200)));
    assert_eq!(original.next(), BackoffDecision::Stop);

    // The clone's cursor is untouched.
    assert_eq!(clone.next(), BackoffDecision::RetryAfter(ms(100)));
}
