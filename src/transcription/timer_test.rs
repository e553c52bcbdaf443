use super::*;

/// Paused-clock timers land on the millisecond tick at or after the deadline
fn assert_elapsed(start: Instant, expected_ms: u64) {
    let elapsed = start.elapsed();
    assert!(
        elapsed >= Duration::from_millis(expected_ms)
            && elapsed < Duration::from_millis(expected_ms + 5),
        "expected ~{}ms, got {:?}",
        expected_ms,
        elapsed
    );
}

#[tokio::test(start_paused = true)]
async fn test_schedule_and_fire() {
    let mut timers = TimerService::new();
    let start = Instant::now();
    timers.schedule(TimerKind::Silence, Duration::from_millis(1500));
    assert!(timers.is_pending(TimerKind::Silence));

    let kind = timers.fired().await;
    assert_eq!(kind, TimerKind::Silence);
    assert_elapsed(start, 1500);
    assert!(!timers.is_pending(TimerKind::Silence));
}

#[tokio::test(start_paused = true)]
async fn test_earliest_timer_fires_first() {
    let mut timers = TimerService::new();
    timers.schedule(TimerKind::HardTimeout, Duration::from_millis(15000));
    timers.schedule(TimerKind::Silence, Duration::from_millis(1500));

    assert_eq!(timers.fired().await, TimerKind::Silence);
    assert_eq!(timers.fired().await, TimerKind::HardTimeout);
    assert!(!timers.has_pending());
}

#[tokio::test(start_paused = true)]
async fn test_reschedule_pushes_deadline() {
    let mut timers = TimerService::new();
    let start = Instant::now();
    let first = timers.schedule(TimerKind::Silence, Duration::from_millis(1500));
    tokio::time::advance(Duration::from_millis(1000)).await;
    let second = timers.schedule(TimerKind::Silence, Duration::from_millis(1500));

    // The superseded handle no longer controls the slot
    assert!(!timers.cancel(first));
    assert!(timers.is_pending(TimerKind::Silence));

    timers.fired().await;
    assert_elapsed(start, 2500);
    assert!(!timers.cancel(second));
}

#[test]
fn test_cancel_is_safe_after_cancel() {
    let mut timers = TimerService::new();
    let handle = timers.schedule(TimerKind::HardTimeout, Duration::from_secs(15));
    assert!(timers.cancel(handle));
    assert!(!timers.cancel(handle));
    assert!(!timers.is_pending(TimerKind::HardTimeout));
}

#[test]
fn test_cancel_all() {
    let mut timers = TimerService::new();
    timers.schedule(TimerKind::HardTimeout, Duration::from_secs(15));
    timers.schedule(TimerKind::Silence, Duration::from_millis(1500));
    timers.cancel_all();
    assert!(!timers.has_pending());
    assert!(timers.deadline(TimerKind::Silence).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_no_pending_timer_never_fires() {
    let mut timers = TimerService::new();
    let result = tokio::time::timeout(Duration::from_secs(60), timers.fired()).await;
    assert!(result.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_dropped_wait_keeps_timer_armed() {
    let mut timers = TimerService::new();
    timers.schedule(TimerKind::Silence, Duration::from_millis(1500));

    let result = tokio::time::timeout(Duration::from_millis(100), timers.fired()).await;
    assert!(result.is_err());
    assert!(timers.is_pending(TimerKind::Silence));
}

#[test]
fn test_handle_reports_kind() {
    let mut timers = TimerService::new();
    let handle = timers.schedule(TimerKind::HardTimeout, Duration::from_secs(1));
    assert_eq!(handle.kind(), TimerKind::HardTimeout);
}
