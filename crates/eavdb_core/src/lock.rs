//! Per-store reader/writer lock.
//!
//! Readers share the lock, a writer holds it alone. The writer may lock
//! again from its own thread, for writing or reading, without blocking;
//! that is what lets a unit of work call any store operation, including a
//! nested transaction.
//!
//! Upgrading a read guard to a write guard on the same thread deadlocks.
//! The store never does this: reads are leaf operations.

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, ThreadId};

pub(crate) struct StoreLock {
    rw: RwLock<()>,
    /// Thread currently holding `rw` for writing.
    writer: Mutex<Option<ThreadId>>,
    /// Write guards alive on the writer thread.
    depth: AtomicUsize,
}

/// Exclusive access, released when the outermost guard drops.
pub(crate) struct WriteGuard<'a> {
    lock: &'a StoreLock,
    _exclusive: Option<RwLockWriteGuard<'a, ()>>,
}

/// Shared access. Empty when taken by the writer thread.
pub(crate) struct ReadGuard<'a> {
    _shared: Option<RwLockReadGuard<'a, ()>>,
}

impl StoreLock {
    pub(crate) fn new() -> Self {
        Self {
            rw: RwLock::new(()),
            writer: Mutex::new(None),
            depth: AtomicUsize::new(0),
        }
    }

    fn held_by_current_thread(&self) -> bool {
        *self.writer.lock() == Some(thread::current().id())
    }

    /// Blocks until no other thread reads or writes.
    pub(crate) fn write(&self) -> WriteGuard<'_> {
        if self.held_by_current_thread() {
            self.depth.fetch_add(1, Ordering::Relaxed);
            return WriteGuard {
                lock: self,
                _exclusive: None,
            };
        }

        let exclusive = self.rw.write();
        *self.writer.lock() = Some(thread::current().id());
        self.depth.store(1, Ordering::Relaxed);
        WriteGuard {
            lock: self,
            _exclusive: Some(exclusive),
        }
    }

    /// Blocks until no other thread writes.
    pub(crate) fn read(&self) -> ReadGuard<'_> {
        if self.held_by_current_thread() {
            return ReadGuard { _shared: None };
        }
        ReadGuard {
            _shared: Some(self.rw.read()),
        }
    }
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        // the rw guard field is released after this body runs
        if self.lock.depth.fetch_sub(1, Ordering::Relaxed) == 1 {
            *self.lock.writer.lock() = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    #[test]
    fn write_is_reentrant() {
        let lock = StoreLock::new();
        let outer = lock.write();
        let inner = lock.write();
        let read = lock.read();
        drop(read);
        drop(inner);
        assert!(lock.held_by_current_thread());
        drop(outer);
        assert!(!lock.held_by_current_thread());
    }

    #[test]
    fn readers_share() {
        let lock = StoreLock::new();
        let _a = lock.read();
        thread::scope(|s| {
            s.spawn(|| {
                let _b = lock.read();
            });
        });
    }

    #[test]
    fn writer_excludes_other_threads_until_outermost_release() {
        let lock = StoreLock::new();
        let acquired = AtomicBool::new(false);

        let outer = lock.write();
        let inner = lock.write();
        thread::scope(|s| {
            s.spawn(|| {
                let _r = lock.read();
                acquired.store(true, Ordering::SeqCst);
            });

            thread::sleep(Duration::from_millis(50));
            drop(inner);
            thread::sleep(Duration::from_millis(50));
            assert!(!acquired.load(Ordering::SeqCst));
            drop(outer);
        });
        assert!(acquired.load(Ordering::SeqCst));
    }

    #[test]
    fn released_lock_can_be_taken_by_another_thread() {
        let lock = StoreLock::new();
        drop(lock.write());
        thread::scope(|s| {
            s.spawn(|| {
                let _w = lock.write();
                assert!(lock.held_by_current_thread());
            });
        });
        assert!(!lock.held_by_current_thread());
    }
}
