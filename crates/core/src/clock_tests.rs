// SPDX-License-Identifier: MIT

use std::time::Duration;

use super::*;

#[test]
fn system_clock_moves_forward() {
    let clock = SystemClock;
    let t1 = clock.now();
    std::thread::sleep(Duration::from_millis(1));
    assert!(clock.now() > t1);
}

#[test]
fn system_clock_epoch_is_plausible() {
    // Any date after 2020-01-01.
    assert!(SystemClock.epoch_ms() > 1_577_836_800_000);
}

#[test]
fn fake_clock_only_moves_when_advanced() {
    let clock = FakeClock::new();
    let t1 = clock.now();
    let e1 = clock.epoch_ms();
    assert_eq!(clock.now(), t1);
    clock.advance(Duration::from_secs(30));
    assert_eq!(clock.now().duration_since(t1), Duration::from_secs(30));
    assert_eq!(clock.epoch_ms(), e1 + 30_000);
}

#[test]
fn fake_clock_shares_state_across_clones() {
    let clock = FakeClock::new();
    let other = clock.clone();
    other.advance(Duration::from_secs(5));
    assert_eq!(clock.epoch_ms(), other.epoch_ms());
}

#[test]
fn fake_clock_set_epoch() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(42_000);
    assert_eq!(clock.epoch_ms(), 42_000);
}
