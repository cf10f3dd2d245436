//! Probe backend for concurrency tests.
//!
//! [`ProbeBackend`] wraps an [`InMemoryBackend`] and records how the store
//! drives it: how many reads run at once, whether a read and a write ever
//! overlap, and the order in which reads and writes start and end. Reads
//! can be slowed down or held at a gate so tests can line up threads
//! deterministically.

use eavdb_storage::{
    Condition, EntityRecord, InMemoryBackend, RowId, StorageBackend, StorageResult,
    StoredAttribute, TypeTag,
};
use parking_lot::{Condvar, Mutex};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// A recorded backend call boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeEvent {
    /// A read call started.
    ReadStart,
    /// A read call returned.
    ReadEnd,
    /// A write call started.
    WriteStart,
    /// A write call returned.
    WriteEnd,
}

#[derive(Debug, Default)]
struct ProbeState {
    active_reads: usize,
    active_writes: usize,
    max_reads: usize,
    overlaps: usize,
    events: Vec<ProbeEvent>,
    gate_closed: bool,
    read_delay: Duration,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<ProbeState>,
    changed: Condvar,
}

/// Handle for inspecting and steering a [`ProbeBackend`].
///
/// Cloning the handle is cheap; all clones observe the same backend.
#[derive(Debug, Clone, Default)]
pub struct Probe {
    shared: Arc<Shared>,
}

impl Probe {
    /// Highest number of reads seen running at once.
    pub fn max_concurrent_reads(&self) -> usize {
        self.shared.state.lock().max_reads
    }

    /// Number of times a read and a write ran at the same time.
    pub fn overlaps(&self) -> usize {
        self.shared.state.lock().overlaps
    }

    /// All recorded events, oldest first.
    pub fn events(&self) -> Vec<ProbeEvent> {
        self.shared.state.lock().events.clone()
    }

    /// Makes every read sleep for `delay` before touching the data.
    pub fn set_read_delay(&self, delay: Duration) {
        self.shared.state.lock().read_delay = delay;
    }

    /// Holds every subsequent read until [`Probe::open_gate`] is called.
    pub fn close_gate(&self) {
        self.shared.state.lock().gate_closed = true;
    }

    /// Releases all reads held at the gate.
    pub fn open_gate(&self) {
        self.shared.state.lock().gate_closed = false;
        self.shared.changed.notify_all();
    }

    /// Waits until at least `count` reads are running.
    ///
    /// Returns false if that did not happen within `timeout`.
    pub fn wait_for_reads(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        while state.active_reads < count {
            if self
                .shared
                .changed
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                return state.active_reads >= count;
            }
        }
        true
    }

    fn read<T>(&self, f: impl FnOnce() -> T) -> T {
        let delay = {
            let mut state = self.shared.state.lock();
            state.active_reads += 1;
            state.max_reads = state.max_reads.max(state.active_reads);
            if state.active_writes > 0 {
                state.overlaps += 1;
            }
            state.events.push(ProbeEvent::ReadStart);
            self.shared.changed.notify_all();
            while state.gate_closed {
                self.shared.changed.wait(&mut state);
            }
            state.read_delay
        };
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        let result = f();

        let mut state = self.shared.state.lock();
        state.active_reads -= 1;
        state.events.push(ProbeEvent::ReadEnd);
        self.shared.changed.notify_all();
        result
    }

    fn write<T>(&self, f: impl FnOnce() -> T) -> T {
        {
            let mut state = self.shared.state.lock();
            if state.active_reads > 0 || state.active_writes > 0 {
                state.overlaps += 1;
            }
            state.active_writes += 1;
            state.events.push(ProbeEvent::WriteStart);
        }

        let result = f();

        let mut state = self.shared.state.lock();
        state.active_writes -= 1;
        state.events.push(ProbeEvent::WriteEnd);
        self.shared.changed.notify_all();
        result
    }
}

/// In-memory backend instrumented with a [`Probe`].
#[derive(Debug, Default)]
pub struct ProbeBackend {
    inner: InMemoryBackend,
    probe: Probe,
}

impl ProbeBackend {
    /// Creates an empty probe backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle observing this backend.
    pub fn probe(&self) -> Probe {
        self.probe.clone()
    }
}

impl StorageBackend for ProbeBackend {
    fn open_or_create(location: &Path) -> StorageResult<(Self, bool)> {
        let (inner, created) = InMemoryBackend::open_or_create(location)?;
        Ok((
            Self {
                inner,
                probe: Probe::default(),
            },
            created,
        ))
    }

    fn insert_entity(&self, kind: &str, payload: Option<&[u8]>) -> StorageResult<RowId> {
        self.probe.write(|| self.inner.insert_entity(kind, payload))
    }

    fn replace_entity(&self, id: RowId, kind: &str, payload: Option<&[u8]>) -> StorageResult<bool> {
        self.probe
            .write(|| self.inner.replace_entity(id, kind, payload))
    }

    fn delete_attributes(&self, id: RowId) -> StorageResult<()> {
        self.probe.write(|| self.inner.delete_attributes(id))
    }

    fn delete_entity(&self, id: RowId) -> StorageResult<()> {
        self.probe.write(|| self.inner.delete_entity(id))
    }

    fn insert_attribute(
        &self,
        entity_id: RowId,
        entity_kind: &str,
        name: &str,
        type_tag: TypeTag,
        value: &str,
    ) -> StorageResult<()> {
        self.probe.write(|| {
            self.inner
                .insert_attribute(entity_id, entity_kind, name, type_tag, value)
        })
    }

    fn fetch_entity(&self, id: RowId) -> StorageResult<Option<EntityRecord>> {
        self.probe.read(|| self.inner.fetch_entity(id))
    }

    fn fetch_attributes(&self, id: RowId) -> StorageResult<HashMap<String, StoredAttribute>> {
        self.probe.read(|| self.inner.fetch_attributes(id))
    }

    fn find_candidate_ids(&self, condition: &Condition) -> StorageResult<BTreeSet<RowId>> {
        self.probe.read(|| self.inner.find_candidate_ids(condition))
    }

    fn close(&self) -> StorageResult<()> {
        self.inner.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_reads_and_writes() {
        let backend = ProbeBackend::new();
        let probe = backend.probe();

        let id = backend.insert_entity("k", None).unwrap();
        backend.fetch_entity(id).unwrap();

        assert_eq!(
            probe.events(),
            [
                ProbeEvent::WriteStart,
                ProbeEvent::WriteEnd,
                ProbeEvent::ReadStart,
                ProbeEvent::ReadEnd,
            ]
        );
        assert_eq!(probe.max_concurrent_reads(), 1);
        assert_eq!(probe.overlaps(), 0);
    }

    #[test]
    fn gate_holds_reads() {
        let backend = ProbeBackend::new();
        let probe = backend.probe();
        probe.close_gate();

        thread::scope(|s| {
            s.spawn(|| backend.fetch_entity(1).unwrap());
            s.spawn(|| backend.fetch_entity(2).unwrap());
            assert!(probe.wait_for_reads(2, Duration::from_secs(5)));
            probe.open_gate();
        });
        assert_eq!(probe.max_concurrent_reads(), 2);
    }

    #[test]
    fn unguarded_write_during_read_is_an_overlap() {
        let backend = ProbeBackend::new();
        let probe = backend.probe();
        probe.close_gate();

        thread::scope(|s| {
            s.spawn(|| backend.fetch_entity(1).unwrap());
            assert!(probe.wait_for_reads(1, Duration::from_secs(5)));
            backend.insert_entity("k", None).unwrap();
            probe.open_gate();
        });
        assert_eq!(probe.overlaps(), 1);
    }

    #[test]
    fn wait_for_reads_times_out() {
        let probe = ProbeBackend::new().probe();
        assert!(!probe.wait_for_reads(1, Duration::from_millis(10)));
    }
}
