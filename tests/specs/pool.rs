// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pool acquisition order and lifetime expiry.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use gantry_core::{FakeClock, ObjectPool, PoolItem, Strategy};

#[derive(Debug)]
struct Conn {
    serial: usize,
}

impl PoolItem for Conn {}

fn pool(clock: FakeClock) -> ObjectPool<Conn, FakeClock> {
    let counter = AtomicUsize::new(0);
    ObjectPool::with_clock(
        move || Conn { serial: counter.fetch_add(1, Ordering::SeqCst) },
        2,
        Duration::from_millis(50),
        false,
        false,
        clock,
    )
}

#[test]
fn fifo_hands_out_the_oldest_idle_item_until_it_expires() {
    let clock = FakeClock::new();
    let pool = pool(clock.clone());

    // Acquire two fresh items, release A at t=0 and B at t=10ms.
    let a = pool.get(Duration::ZERO, Strategy::Fifo).unwrap();
    let b = pool.get(Duration::ZERO, Strategy::Fifo).unwrap();
    assert_eq!((a.serial, b.serial), (0, 1));
    drop(a);
    clock.advance(Duration::from_millis(10));
    drop(b);

    // t=30ms: both alive; FIFO returns A.
    clock.advance(Duration::from_millis(20));
    let again = pool.get(Duration::ZERO, Strategy::Fifo).unwrap();
    assert_eq!(again.serial, 0);
    drop(again);

    // t=60ms: A and B have both outlived 50ms; a fresh item is created.
    clock.advance(Duration::from_millis(30));
    let fresh = pool.get(Duration::ZERO, Strategy::Fifo).unwrap();
    assert_eq!(fresh.serial, 2);
}

#[test]
fn lifo_prefers_the_most_recently_released_item() {
    let clock = FakeClock::new();
    let pool = pool(clock.clone());

    let a = pool.get(Duration::ZERO, Strategy::Fifo).unwrap();
    let b = pool.get(Duration::ZERO, Strategy::Fifo).unwrap();
    drop(a);
    drop(b);

    let taken = pool.get(Duration::ZERO, Strategy::Lifo).unwrap();
    assert_eq!(taken.serial, 1);
}

#[test]
fn the_bound_holds_under_circulation() {
    let clock = FakeClock::new();
    let pool = pool(clock);

    let _a = pool.get(Duration::ZERO, Strategy::Fifo).unwrap();
    let _b = pool.get(Duration::ZERO, Strategy::Fifo).unwrap();

    // Two items are circulating; a bounded get must time out.
    assert!(pool.get(Duration::from_millis(20), Strategy::Fifo).is_none());
}
