use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{TimeZone, Utc};
use clarity_admission_lib::config::AdmissionConfig;
use clarity_admission_lib::security::admission::{
    AdmissionController, AdmissionResult, BlockReason, HourClock,
};
use clarity_admission_lib::AdmissionError;

type TestResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

fn config(max_requests: u32) -> AdmissionConfig {
    AdmissionConfig {
        window_seconds: 60,
        max_requests,
        block_duration_seconds: 300,
        ..AdmissionConfig::default()
    }
}

fn secs(s: f64) -> Duration {
    Duration::from_secs_f64(s)
}

#[test]
fn test_three_per_minute_scenario() -> TestResult {
    let controller = AdmissionController::new(config(3))?;
    let t0 = Instant::now();

    for (offset, expected_remaining) in [(0.0, 2), (1.0, 1), (2.0, 0)] {
        match controller.check_at("203.0.113.9", t0 + secs(offset))? {
            AdmissionResult::Allowed { limit, remaining, reset_at } => {
                assert_eq!(limit, 3);
                assert_eq!(remaining, expected_remaining);
                assert_eq!(reset_at, t0 + secs(offset) + Duration::from_secs(60));
            }
            other => panic!("t={offset}: expected Allowed, got {other:?}"),
        }
    }

    let blocked = controller.check_at("203.0.113.9", t0 + secs(3.0))?;
    assert_eq!(
        blocked,
        AdmissionResult::Blocked {
            retry_after: Duration::from_secs(300),
            reason: BlockReason::Threshold
        }
    );

    let cooling = controller.check_at("203.0.113.9", t0 + secs(3.5))?;
    assert_eq!(cooling.block_reason(), Some(BlockReason::Cooldown));
    assert_eq!(cooling.retry_after(), Some(secs(299.5)));
    Ok(())
}

#[test]
fn test_remaining_strictly_decreases() -> TestResult {
    let controller = AdmissionController::new(config(10))?;
    let t0 = Instant::now();

    let mut previous = None;
    for i in 0..10u64 {
        let result = controller.check_at("k", t0 + Duration::from_millis(i * 100))?;
        assert!(result.is_allowed(), "call {i} should be admitted");
        if let Some(prev) = previous {
            assert_eq!(result.remaining() + 1, prev);
        }
        previous = Some(result.remaining());
    }
    assert_eq!(previous, Some(0));
    assert!(controller.check_at("k", t0 + secs(1.0))?.is_blocked());
    Ok(())
}

#[test]
fn test_cooldown_holds_then_fresh_window() -> TestResult {
    let controller = AdmissionController::new(config(2))?;
    let t0 = Instant::now();

    controller.check_at("k", t0)?;
    controller.check_at("k", t0)?;
    assert!(controller.check_at("k", t0 + secs(1.0))?.is_blocked());

    for offset in [10.0, 100.0, 299.0, 300.9] {
        assert!(
            controller.check_at("k", t0 + secs(offset))?.is_blocked(),
            "still cooling down at t={offset}"
        );
    }

    // block placed at t=1 ends at t=301; the window starts empty
    let after = controller.check_at("k", t0 + secs(301.0))?;
    assert_eq!(after.remaining(), 1);
    assert!(controller.check_at("k", t0 + secs(301.5))?.is_allowed());
    assert!(controller.check_at("k", t0 + secs(302.0))?.is_blocked());
    Ok(())
}

#[test]
fn test_window_slides() -> TestResult {
    let controller = AdmissionController::new(config(2))?;
    let t0 = Instant::now();

    controller.check_at("k", t0)?;
    controller.check_at("k", t0 + secs(30.0))?;

    // the t=0 entry is exactly window-old and no longer counts
    let result = controller.check_at("k", t0 + secs(60.0))?;
    assert_eq!(result.remaining(), 0);
    assert_eq!(controller.window_count("k", t0 + secs(60.0)), 2);
    Ok(())
}

#[test]
fn test_keys_are_independent() -> TestResult {
    let controller = AdmissionController::new(config(1))?;
    let t0 = Instant::now();

    assert!(controller.check_at("alice", t0)?.is_allowed());
    assert!(controller.check_at("alice", t0)?.is_blocked());
    assert!(controller.check_at("bob", t0)?.is_allowed());
    assert_eq!(controller.blocked_keys(t0), 1);
    Ok(())
}

#[test]
fn test_empty_key_rejected() -> TestResult {
    let controller = AdmissionController::new(config(3))?;

    assert_eq!(controller.check(""), Err(AdmissionError::InvalidKey));
    assert_eq!(controller.check("   "), Err(AdmissionError::InvalidKey));
    assert_eq!(controller.tracked_keys(), 0);
    assert_eq!(controller.metrics().total_requests, 0);
    Ok(())
}

#[test]
fn test_metrics_match_calls() -> TestResult {
    let wall = Utc.with_ymd_and_hms(2026, 3, 1, 9, 59, 0).single().ok_or("invalid test date")?;
    let clock = HourClock::new(Instant::now(), wall);
    let t0 = Instant::now();
    let controller = AdmissionController::with_clock(config(2), clock)?;

    for _ in 0..3 {
        controller.check_at("a", t0)?;
    }
    controller.check_at("b", t0 + secs(120.0))?;

    let snapshot = controller.metrics_at(t0 + secs(120.0));
    assert_eq!(snapshot.total_requests, 4);
    assert_eq!(snapshot.blocked_requests, 1);
    assert_eq!(snapshot.unique_keys_count, 2);
    assert_eq!(snapshot.hourly_stats.values().sum::<u64>(), 4);
    assert_eq!(snapshot.requests_in_hour("2026-03-01 10:00"), 1);
    Ok(())
}

#[test]
fn test_metrics_reset_after_interval() -> TestResult {
    let controller = AdmissionController::new(AdmissionConfig {
        metrics_reset_interval_seconds: 3600,
        ..config(5)
    })?;
    let t0 = Instant::now();

    controller.check_at("k", t0)?;
    assert_eq!(controller.metrics_at(t0 + secs(3500.0)).total_requests, 1);
    assert!(controller.reset_metrics_if_due(t0 + secs(3700.0)));
    assert!(!controller.reset_metrics_if_due(t0 + secs(3701.0)));

    let snapshot = controller.metrics_at(t0 + secs(3701.0));
    assert_eq!(snapshot.total_requests, 0);
    assert_eq!(snapshot.unique_keys_count, 0);
    assert!(snapshot.hourly_stats.is_empty());

    // key state is untouched by a metrics reset
    assert_eq!(controller.tracked_keys(), 1);
    Ok(())
}

#[test]
fn test_sweep_removes_stale_and_is_idempotent() -> TestResult {
    let controller = AdmissionController::new(config(1))?;
    let t0 = Instant::now();

    controller.check_at("quiet", t0)?;
    controller.check_at("noisy", t0)?;
    controller.check_at("noisy", t0)?;
    assert_eq!(controller.tracked_keys(), 2);

    let early = controller.sweep(t0 + secs(61.0));
    assert_eq!(early.expired_requests, 1);
    assert_eq!(early.evicted_keys, 1);
    assert_eq!(controller.tracked_keys(), 1);

    let late = t0 + secs(301.0);
    let first = controller.sweep(late);
    assert_eq!(first.expired_blocks, 1);
    assert_eq!(controller.tracked_keys(), 0);

    let second = controller.sweep(late);
    assert!(second.is_empty());
    assert!(controller.check_at("noisy", late)?.is_allowed());
    Ok(())
}

#[test]
fn test_sweep_keeps_live_state() -> TestResult {
    let controller = AdmissionController::new(config(1))?;
    let t0 = Instant::now();

    controller.check_at("k", t0)?;
    controller.check_at("k", t0)?;
    let stats = controller.sweep(t0 + secs(10.0));
    assert!(stats.is_empty());
    assert_eq!(controller.block_remaining("k", t0 + secs(10.0)), Some(secs(290.0)));
    Ok(())
}

#[test]
fn test_concurrent_checks_admit_exactly_max() -> TestResult {
    const THREADS: usize = 8;
    const CALLS_PER_THREAD: usize = 25;
    const MAX: u32 = 50;

    let controller = Arc::new(AdmissionController::new(config(MAX))?);
    let barrier = Arc::new(Barrier::new(THREADS));
    let now = Instant::now();

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let controller = controller.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                (0..CALLS_PER_THREAD)
                    .filter(|_| matches!(controller.check_at("shared", now), Ok(r) if r.is_allowed()))
                    .count()
            })
        })
        .collect();

    let mut allowed = 0;
    for handle in handles {
        allowed += handle.join().map_err(|_| "worker panicked")?;
    }

    assert_eq!(allowed, MAX as usize);
    let snapshot = controller.metrics_at(now);
    assert_eq!(snapshot.total_requests, (THREADS * CALLS_PER_THREAD) as u64);
    assert_eq!(snapshot.blocked_requests, (THREADS * CALLS_PER_THREAD) as u64 - MAX as u64);
    Ok(())
}

#[test]
fn test_single_slot_same_instant_race() -> TestResult {
    let controller = Arc::new(AdmissionController::new(config(1))?);
    let barrier = Arc::new(Barrier::new(2));
    let now = Instant::now();

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let controller = controller.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                controller.check_at("contended", now)
            })
        })
        .collect();

    let mut allowed = 0;
    let mut blocked = 0;
    for handle in handles {
        match handle.join().map_err(|_| "worker panicked")?? {
            AdmissionResult::Allowed { .. } => allowed += 1,
            AdmissionResult::Blocked { .. } => blocked += 1,
        }
    }
    assert_eq!((allowed, blocked), (1, 1));
    Ok(())
}
