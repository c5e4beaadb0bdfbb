//! Integration tests for the watchdog.
//!
//! Runs with paused Tokio time: sleeps resolve as soon as the runtime is
//! otherwise idle, so 30-second deadlines cost nothing.

use std::time::Duration;

use omok_timer::Watchdog;
use tokio::time::Instant;

// =========================================================================
// Firing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_expired_fires_at_deadline() {
    let mut w = Watchdog::new("turn");
    let start = Instant::now();
    w.arm(Duration::from_secs(30));

    let expiry = w.expired().await;

    assert_eq!(expiry.generation, 1);
    assert!(start.elapsed() >= Duration::from_secs(30));
    assert!(!w.is_armed(), "a fired watchdog disarms itself");
}

#[tokio::test(start_paused = true)]
async fn test_rearm_replaces_pending_deadline() {
    let mut w = Watchdog::new("turn");
    let start = Instant::now();
    w.arm(Duration::from_secs(30));

    tokio::time::advance(Duration::from_secs(20)).await;
    w.arm(Duration::from_secs(30));

    let expiry = w.expired().await;
    assert_eq!(expiry.generation, 2);
    assert!(start.elapsed() >= Duration::from_secs(50));
}

#[tokio::test(start_paused = true)]
async fn test_disarmed_watchdog_never_fires() {
    let mut w = Watchdog::new("turn");
    let result = tokio::time::timeout(Duration::from_secs(3600), w.expired()).await;
    assert!(result.is_err(), "disarmed watchdog must pend forever");
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_watchdog_never_fires() {
    let mut w = Watchdog::new("turn");
    w.arm(Duration::from_secs(5));
    w.cancel();
    let result = tokio::time::timeout(Duration::from_secs(60), w.expired()).await;
    assert!(result.is_err());
}

// =========================================================================
// select! integration
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_dropped_expired_future_keeps_deadline() {
    let mut w = Watchdog::new("turn");
    w.arm(Duration::from_secs(10));

    // Another branch wins first; the watchdog future is dropped mid-wait.
    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(1)) => {}
        _ = w.expired() => panic!("watchdog fired too early"),
    }

    assert!(w.is_armed());
    assert_eq!(w.remaining(), Some(Duration::from_secs(9)));
    let expiry = w.expired().await;
    assert_eq!(expiry.generation, 1);
}

#[tokio::test(start_paused = true)]
async fn test_command_loop_resets_clock_on_each_command() {
    let (tx, mut rx) = tokio::sync::mpsc::channel::<()>(4);
    let mut w = Watchdog::new("turn");
    w.arm(Duration::from_secs(30));

    tokio::spawn(async move {
        for _ in 0..3 {
            tokio::time::sleep(Duration::from_secs(20)).await;
            tx.send(()).await.unwrap();
        }
    });

    let start = Instant::now();
    let mut commands = 0;
    loop {
        tokio::select! {
            Some(()) = rx.recv() => {
                commands += 1;
                w.arm(Duration::from_secs(30));
            }
            _ = w.expired() => break,
        }
    }

    assert_eq!(commands, 3);
    // Last command at t=60s, expiry 30s later.
    assert!(start.elapsed() >= Duration::from_secs(90));
}
