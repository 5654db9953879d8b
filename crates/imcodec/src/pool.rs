/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! A bounded pool of scratch memory shared between operations
//!
//! Codecs borrow scratch space with [`ScratchPool::acquire_or`], the returned
//! guard hands the item back when dropped. The pool keeps at most `max_idle`
//! idle items, and items idle for longer than the expiry are released by
//! [`ScratchPool::sweep`], which a background thread can run periodically.
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};
use std::time::{Duration, Instant};

use log::{trace, warn};

/// Something that can be cleaned up and handed to another user
///
/// The default value is what a guard holds after giving its item back,
/// it should not allocate.
pub trait Poolable: Default + Send + 'static {
    /// Bring the item back to a fresh state before it is reused
    fn reset(&mut self);
}

impl<T: Send + 'static> Poolable for Vec<T> {
    fn reset(&mut self) {
        self.clear();
    }
}

struct PoolShared<T> {
    idle:     Mutex<Vec<(T, Instant)>>,
    max_idle: usize,
    expiry:   Duration
}

impl<T> PoolShared<T> {
    fn lock(&self) -> MutexGuard<'_, Vec<(T, Instant)>> {
        // items are plain scratch, a panic elsewhere leaves nothing inconsistent
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sweep(&self) -> usize {
        let mut idle = self.lock();
        let before = idle.len();
        let expiry = self.expiry;

        idle.retain(|(_, since)| since.elapsed() < expiry);
        before - idle.len()
    }
}

/// A bounded pool of reusable items
pub struct ScratchPool<T: Poolable> {
    shared: Arc<PoolShared<T>>
}

impl<T: Poolable> Clone for ScratchPool<T> {
    fn clone(&self) -> Self {
        ScratchPool {
            shared: Arc::clone(&self.shared)
        }
    }
}

impl<T: Poolable> ScratchPool<T> {
    /// Create a pool without a background sweeper
    pub fn new(max_idle: usize, expiry: Duration) -> ScratchPool<T> {
        ScratchPool {
            shared: Arc::new(PoolShared {
                idle: Mutex::new(Vec::with_capacity(max_idle)),
                max_idle,
                expiry
            })
        }
    }

    /// Create a pool with a thread that sweeps it every `interval`
    ///
    /// The thread ends once every handle to the pool is dropped.
    /// If it cannot be spawned the pool still works, expired items are
    /// then only released on explicit calls to [`sweep`](Self::sweep).
    pub fn with_sweeper(max_idle: usize, expiry: Duration, interval: Duration) -> ScratchPool<T> {
        let pool = Self::new(max_idle, expiry);
        let weak: Weak<PoolShared<T>> = Arc::downgrade(&pool.shared);

        let spawned = std::thread::Builder::new()
            .name("imcodec-pool-sweeper".to_string())
            .spawn(move || loop {
                std::thread::sleep(interval);

                match weak.upgrade() {
                    Some(shared) => {
                        let released = shared.sweep();
                        if released > 0 {
                            trace!("Released {released} expired scratch items");
                        }
                    }
                    None => break
                }
            });

        if let Err(e) = spawned {
            warn!("Could not start the pool sweeper: {e}");
        }
        pool
    }

    /// Take an idle item, or create one with `create` if none is idle
    pub fn acquire_or(&self, create: impl FnOnce() -> T) -> Pooled<T> {
        let item = self.shared.lock().pop().map(|(item, _)| item);

        Pooled {
            item:  item.unwrap_or_else(create),
            owner: Arc::clone(&self.shared)
        }
    }

    /// Number of items waiting to be reused
    pub fn idle_count(&self) -> usize {
        self.shared.lock().len()
    }

    /// Release idle items older than the expiry, returning how many were released
    pub fn sweep(&self) -> usize {
        self.shared.sweep()
    }
}

/// An item on loan from a [`ScratchPool`]
pub struct Pooled<T: Poolable> {
    item:  T,
    owner: Arc<PoolShared<T>>
}

impl<T: Poolable> Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.item
    }
}

impl<T: Poolable> DerefMut for Pooled<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.item
    }
}

impl<T: Poolable> Drop for Pooled<T> {
    fn drop(&mut self) {
        let mut item = std::mem::take(&mut self.item);
        item.reset();

        let mut idle = self.owner.lock();

        if idle.len() < self.owner.max_idle {
            idle.push((item, Instant::now()));
        }
    }
}

const GLOBAL_MAX_IDLE: usize = 16;
const GLOBAL_EXPIRY: Duration = Duration::from_secs(30);
const GLOBAL_SWEEP_INTERVAL: Duration = Duration::from_secs(10);

/// Byte scratch shared by every codec in the process
pub fn byte_pool() -> &'static ScratchPool<Vec<u8>> {
    static POOL: OnceLock<ScratchPool<Vec<u8>>> = OnceLock::new();
    POOL.get_or_init(|| ScratchPool::with_sweeper(GLOBAL_MAX_IDLE, GLOBAL_EXPIRY, GLOBAL_SWEEP_INTERVAL))
}

/// Float scratch used by pixel conversion
pub fn float_pool() -> &'static ScratchPool<Vec<f32>> {
    static POOL: OnceLock<ScratchPool<Vec<f32>>> = OnceLock::new();
    POOL.get_or_init(|| ScratchPool::with_sweeper(GLOBAL_MAX_IDLE, GLOBAL_EXPIRY, GLOBAL_SWEEP_INTERVAL))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn items_are_reset_and_reused() {
        let pool: ScratchPool<Vec<u8>> = ScratchPool::new(2, Duration::from_secs(60));
        {
            let mut scratch = pool.acquire_or(|| Vec::with_capacity(100));
            scratch.extend_from_slice(&[1, 2, 3]);
        }
        assert_eq!(pool.idle_count(), 1);

        let scratch = pool.acquire_or(Vec::new);
        assert!(scratch.is_empty());
        assert!(scratch.capacity() >= 100);
        assert_eq!(pool.idle_count(), 0);
    }

    /// Counts resets through a shared counter
    #[derive(Default)]
    struct Counted(Arc<std::sync::atomic::AtomicUsize>);

    impl Poolable for Counted {
        fn reset(&mut self) {
            self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
    }

    #[test]
    fn returned_items_keep_their_identity() {
        let resets = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let pool: ScratchPool<Counted> = ScratchPool::new(1, Duration::from_secs(60));

        drop(pool.acquire_or(|| Counted(Arc::clone(&resets))));
        assert_eq!(resets.load(std::sync::atomic::Ordering::Relaxed), 1);
        assert_eq!(pool.idle_count(), 1);

        // the pooled item comes back, not a default one
        let item = pool.acquire_or(Counted::default);
        assert!(Arc::ptr_eq(&item.0, &resets));
        drop(item);
        assert_eq!(resets.load(std::sync::atomic::Ordering::Relaxed), 2);
        assert_eq!(pool.idle_count(), 1);
    }

    #[test]
    fn idle_items_are_bounded() {
        let pool: ScratchPool<Vec<u8>> = ScratchPool::new(2, Duration::from_secs(60));
        let loans: Vec<_> = (0..5).map(|_| pool.acquire_or(Vec::new)).collect();

        drop(loans);
        assert_eq!(pool.idle_count(), 2);
    }

    #[test]
    fn expired_items_are_swept() {
        let pool: ScratchPool<Vec<u8>> = ScratchPool::new(4, Duration::ZERO);
        drop(pool.acquire_or(Vec::new));
        drop(pool.acquire_or(Vec::new));

        assert_eq!(pool.idle_count(), 1);
        assert_eq!(pool.sweep(), 1);
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn background_sweeper_releases_items() {
        let pool: ScratchPool<Vec<u8>> =
            ScratchPool::with_sweeper(4, Duration::from_millis(1), Duration::from_millis(5));
        drop(pool.acquire_or(Vec::new));

        let deadline = Instant::now() + Duration::from_secs(5);

        while pool.idle_count() != 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn pools_are_shared_between_threads() {
        let pool: ScratchPool<Vec<u8>> = ScratchPool::new(8, Duration::from_secs(60));

        std::thread::scope(|s| {
            for _ in 0..4 {
                let pool = pool.clone();
                s.spawn(move || {
                    for _ in 0..100 {
                        let mut scratch = pool.acquire_or(Vec::new);
                        scratch.push(1);
                    }
                });
            }
        });
        assert!(pool.idle_count() <= 4);
    }
}
