// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn system_clock_returns_increasing_time() {
    let clock = SystemClock;
    let t1 = clock.now();
    std::thread::sleep(Duration::from_millis(1));
    let t2 = clock.now();
    assert!(t2 > t1);
}

#[test]
fn system_clock_epoch_is_after_2020() {
    assert!(SystemClock.epoch_ms() > 1_577_836_800_000);
}

#[test]
fn fake_clock_can_be_advanced() {
    let clock = FakeClock::new();
    let t1 = clock.now();
    let e1 = clock.epoch_ms();
    clock.advance(Duration::from_secs(60));
    assert_eq!(clock.now().duration_since(t1), Duration::from_secs(60));
    assert_eq!(clock.epoch_ms() - e1, 60_000);
}

#[test]
fn fake_clock_is_cloneable_and_shared() {
    let clock1 = FakeClock::new();
    let clock2 = clock1.clone();
    let t1 = clock1.now();
    clock2.advance(Duration::from_secs(30));
    assert!(clock1.now().duration_since(t1) >= Duration::from_secs(30));
}

#[test]
fn secs_since_has_sub_millisecond_precision() {
    let clock = FakeClock::new();
    let start = clock.now();
    clock.advance(Duration::from_micros(1_250));
    assert!((clock.secs_since(start) - 0.00125).abs() < 1e-9);
}

#[tokio::test]
async fn fake_sleep_records_and_advances() {
    let clock = FakeClock::new();
    let start = clock.now();
    clock.sleep(Duration::from_millis(100)).await;
    clock.sleep(Duration::from_millis(200)).await;
    assert_eq!(clock.sleeps(), vec![Duration::from_millis(100), Duration::from_millis(200)]);
    assert_eq!(clock.now().duration_since(start), Duration::from_millis(300));
}

#[tokio::test]
async fn system_sleep_waits() {
    let clock = SystemClock;
    let start = clock.now();
    clock.sleep(Duration::from_millis(5)).await;
    assert!(clock.now().duration_since(start) >= Duration::from_millis(5));
}
