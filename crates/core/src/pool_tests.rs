// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;

use crate::clock::FakeClock;

use super::*;

#[derive(Debug, PartialEq)]
struct Item {
    serial: usize,
    dirty: bool,
}

impl PoolItem for Item {
    fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// Pool whose factory stamps each created item with a serial number.
fn counting_pool(
    max_objects: usize,
    lifetime: Duration,
    reset_on_get: bool,
    reset_on_release: bool,
    clock: FakeClock,
) -> ObjectPool<Item, FakeClock> {
    let counter = AtomicUsize::new(0);
    ObjectPool::with_clock(
        move || Item { serial: counter.fetch_add(1, Ordering::SeqCst), dirty: false },
        max_objects,
        lifetime,
        reset_on_get,
        reset_on_release,
        clock,
    )
}

#[test]
fn get_creates_when_pool_is_empty() {
    let pool = counting_pool(0, Duration::ZERO, false, false, FakeClock::new());
    let a = pool.get(Duration::ZERO, Strategy::Fifo).unwrap();
    assert_eq!(a.serial, 0);
    let b = pool.get(Duration::ZERO, Strategy::Fifo).unwrap();
    assert_eq!(b.serial, 1);
}

#[test]
fn fifo_returns_items_in_release_order() {
    let pool = counting_pool(0, Duration::ZERO, false, false, FakeClock::new());
    let a = pool.get(Duration::ZERO, Strategy::Fifo).unwrap();
    let b = pool.get(Duration::ZERO, Strategy::Fifo).unwrap();
    drop(a); // serial 0 idles first
    drop(b);

    assert_eq!(pool.get(Duration::ZERO, Strategy::Fifo).unwrap().serial, 0);
    assert_eq!(pool.get(Duration::ZERO, Strategy::Fifo).unwrap().serial, 1);
}

#[test]
fn lifo_returns_items_in_reverse_release_order() {
    let pool = counting_pool(0, Duration::ZERO, false, false, FakeClock::new());
    let a = pool.get(Duration::ZERO, Strategy::Fifo).unwrap();
    let b = pool.get(Duration::ZERO, Strategy::Fifo).unwrap();
    drop(a);
    drop(b); // serial 1 idles last

    assert_eq!(pool.get(Duration::ZERO, Strategy::Lifo).unwrap().serial, 1);
    assert_eq!(pool.get(Duration::ZERO, Strategy::Lifo).unwrap().serial, 0);
}

#[test]
fn bounded_pool_times_out_when_at_capacity() {
    let pool = counting_pool(1, Duration::ZERO, false, false, FakeClock::new());
    let held = pool.get(Duration::ZERO, Strategy::Fifo).unwrap();

    assert!(pool.get(Duration::from_millis(20), Strategy::Fifo).is_none());

    drop(held);
    assert!(pool.get(Duration::from_millis(20), Strategy::Fifo).is_some());
}

#[test]
fn release_wakes_a_blocked_waiter() {
    let pool = Arc::new(counting_pool(1, Duration::ZERO, false, false, FakeClock::new()));
    let held = pool.get(Duration::ZERO, Strategy::Fifo).unwrap();

    let (tx, rx) = mpsc::channel();
    let waiter_pool = Arc::clone(&pool);
    let waiter = std::thread::spawn(move || {
        // timeout of zero waits indefinitely
        let item = waiter_pool.get(Duration::ZERO, Strategy::Fifo);
        tx.send(item.is_some()).ok();
    });

    std::thread::sleep(Duration::from_millis(20));
    drop(held);

    assert!(rx.recv_timeout(Duration::from_secs(2)).unwrap());
    waiter.join().unwrap();
}

#[test]
fn expired_items_are_never_handed_out() {
    let clock = FakeClock::new();
    let pool = counting_pool(0, Duration::from_millis(50), false, false, clock.clone());

    drop(pool.get(Duration::ZERO, Strategy::Fifo)); // serial 0 idles
    clock.advance(Duration::from_millis(60));

    // serial 0 expired while idle; a fresh item is created instead
    assert_eq!(pool.get(Duration::ZERO, Strategy::Fifo).unwrap().serial, 1);
}

#[test]
fn expired_items_are_destroyed_on_release() {
    let clock = FakeClock::new();
    let pool = counting_pool(0, Duration::from_millis(50), false, false, clock.clone());

    let held = pool.get(Duration::ZERO, Strategy::Fifo).unwrap();
    clock.advance(Duration::from_millis(60));
    drop(held);

    let (idle, circulating) = pool.counts();
    assert_eq!((idle, circulating), (0, 0));
}

#[test]
fn reset_lifetime_on_release_restarts_the_clock() {
    let clock = FakeClock::new();
    let pool = counting_pool(0, Duration::from_millis(50), false, true, clock.clone());

    let held = pool.get(Duration::ZERO, Strategy::Fifo).unwrap();
    clock.advance(Duration::from_millis(40));
    drop(held); // lifetime restarts here

    clock.advance(Duration::from_millis(40));
    // 80ms since creation but only 40ms since release; still alive
    assert_eq!(pool.get(Duration::ZERO, Strategy::Fifo).unwrap().serial, 0);
}

#[test]
fn reset_lifetime_on_get_restarts_the_clock() {
    let clock = FakeClock::new();
    let pool = counting_pool(0, Duration::from_millis(50), true, false, clock.clone());

    drop(pool.get(Duration::ZERO, Strategy::Fifo));
    clock.advance(Duration::from_millis(40));

    let held = pool.get(Duration::ZERO, Strategy::Fifo).unwrap();
    assert_eq!(held.serial, 0);
    clock.advance(Duration::from_millis(40));
    drop(held); // 80ms old, but restamped 40ms ago on get

    assert_eq!(pool.get(Duration::ZERO, Strategy::Fifo).unwrap().serial, 0);
}

#[test]
fn dirty_items_are_destroyed_on_release() {
    let clock = FakeClock::new();
    let pool = counting_pool(0, Duration::ZERO, false, false, clock);

    let mut held = pool.get(Duration::ZERO, Strategy::Fifo).unwrap();
    held.dirty = true;
    drop(held);

    let (idle, _) = pool.counts();
    assert_eq!(idle, 0);
    assert_eq!(pool.get(Duration::ZERO, Strategy::Fifo).unwrap().serial, 1);
}

#[test]
fn conservation_under_bound() {
    let pool = counting_pool(2, Duration::ZERO, false, false, FakeClock::new());
    let a = pool.get(Duration::ZERO, Strategy::Fifo).unwrap();
    let b = pool.get(Duration::ZERO, Strategy::Fifo).unwrap();

    let (idle, circulating) = pool.counts();
    assert!(idle + circulating <= 2);
    assert_eq!(circulating, 2);

    drop(a);
    drop(b);
    let (idle, circulating) = pool.counts();
    assert_eq!((idle, circulating), (2, 0));
}

#[test]
fn sweeper_destroys_expired_idle_items() {
    // Real clock: the sweeper's deadline arithmetic drives this path.
    let counter = AtomicUsize::new(0);
    let pool = ObjectPool::new(
        move || Item { serial: counter.fetch_add(1, Ordering::SeqCst), dirty: false },
        0,
        Duration::from_millis(30),
        false,
        false,
    );

    drop(pool.get(Duration::ZERO, Strategy::Fifo));
    let (idle, _) = pool.counts();
    assert_eq!(idle, 1);

    std::thread::sleep(Duration::from_millis(120));
    let (idle, _) = pool.counts();
    assert_eq!(idle, 0);
}

#[test]
fn shutdown_waits_for_circulating_items() {
    let pool = counting_pool(0, Duration::from_millis(500), false, false, FakeClock::new());
    let held = pool.get(Duration::ZERO, Strategy::Fifo).unwrap();

    let (tx, rx) = mpsc::channel();
    let dropper = std::thread::spawn(move || {
        drop(pool); // blocks until `held` is released
        tx.send(()).ok();
    });

    assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    drop(held);
    assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());
    dropper.join().unwrap();
}

#[test]
fn shutdown_unblocks_waiters_with_none() {
    let pool = Arc::new(counting_pool(1, Duration::ZERO, false, false, FakeClock::new()));
    let held = pool.get(Duration::ZERO, Strategy::Fifo).unwrap();

    let (tx, rx) = mpsc::channel();
    let waiter_pool = Arc::clone(&pool);
    let waiter = std::thread::spawn(move || {
        tx.send(waiter_pool.get(Duration::ZERO, Strategy::Fifo).is_none()).ok();
    });

    std::thread::sleep(Duration::from_millis(20));
    pool.shutdown();

    assert!(rx.recv_timeout(Duration::from_secs(2)).unwrap());
    waiter.join().unwrap();
    drop(held);
}
