//! Locking behaviour observed through the probe backend.

use eavdb_core::{Config, CoreError, Entity, EntityId, EntityStore, Filter, TransactionRunner};
use eavdb_testkit::{ProbeBackend, ProbeEvent};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(10);

fn probed_store() -> (EntityStore, eavdb_testkit::Probe) {
    let backend = ProbeBackend::new();
    let probe = backend.probe();
    let store = EntityStore::open_with_backend(backend, true, Config::default());
    (store, probe)
}

fn seed(store: &EntityStore) -> EntityId {
    store
        .put(&mut Entity::new("item").unwrap().with("n", 1))
        .unwrap()
}

fn position(events: &[ProbeEvent], wanted: ProbeEvent) -> usize {
    events
        .iter()
        .position(|e| *e == wanted)
        .expect("event recorded")
}

#[test]
fn readers_run_concurrently() {
    let (store, probe) = probed_store();
    let id = seed(&store);
    probe.close_gate();

    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| store.get(id).unwrap());
        }
        assert!(probe.wait_for_reads(4, TIMEOUT));
        probe.open_gate();
    });

    assert_eq!(probe.max_concurrent_reads(), 4);
    assert_eq!(probe.overlaps(), 0);
}

#[test]
fn writer_waits_for_reader() {
    let (store, probe) = probed_store();
    let id = seed(&store);
    let seeded = probe.events().len();
    probe.close_gate();

    thread::scope(|s| {
        s.spawn(|| store.get(id).unwrap());
        assert!(probe.wait_for_reads(1, TIMEOUT));

        let writer = s.spawn(|| store.put(&mut Entity::new("item").unwrap()).unwrap());
        thread::sleep(Duration::from_millis(100));
        assert!(!probe.events()[seeded..].contains(&ProbeEvent::WriteStart));

        probe.open_gate();
        writer.join().unwrap();
    });

    let events = probe.events();
    let tail = &events[seeded..];
    assert!(position(tail, ProbeEvent::ReadEnd) < position(tail, ProbeEvent::WriteStart));
    assert_eq!(probe.overlaps(), 0);
}

#[test]
fn reader_waits_for_writer() {
    let (store, probe) = probed_store();
    let (started_tx, started_rx) = mpsc::channel();

    thread::scope(|s| {
        s.spawn(|| {
            store
                .transaction(|st| {
                    started_tx.send(()).unwrap();
                    thread::sleep(Duration::from_millis(100));
                    st.put(&mut Entity::new("item").unwrap())
                })
                .unwrap()
        });

        started_rx.recv_timeout(TIMEOUT).unwrap();
        s.spawn(|| store.query_ids(&Filter::all("item").unwrap()).unwrap());
    });

    let events = probe.events();
    let last_write = events
        .iter()
        .rposition(|e| *e == ProbeEvent::WriteEnd)
        .expect("write recorded");
    assert!(last_write < position(&events, ProbeEvent::ReadStart));
    assert_eq!(probe.overlaps(), 0);
}

#[test]
fn unit_of_work_holds_lock_between_operations() {
    let (store, probe) = probed_store();
    let (started_tx, started_rx) = mpsc::channel();

    thread::scope(|s| {
        s.spawn(|| {
            store
                .transaction(|st| {
                    let id = st.put(&mut Entity::new("item").unwrap())?;
                    started_tx.send(()).unwrap();
                    thread::sleep(Duration::from_millis(100));
                    st.delete(id)
                })
                .unwrap()
        });

        started_rx.recv_timeout(TIMEOUT).unwrap();
        // the intermediate state is never observable
        let seen = s.spawn(|| store.query_ids(&Filter::all("item").unwrap()).unwrap());
        assert!(seen.join().unwrap().is_empty());
    });
    assert_eq!(probe.overlaps(), 0);
}

#[test]
fn reentrant_units_do_not_deadlock() {
    let (store, _probe) = probed_store();
    let runner = TransactionRunner::new(&store);

    let found = runner
        .execute(|outer| {
            let id = outer.put(&mut Entity::new("item").unwrap().with("n", 7))?;
            let inner = TransactionRunner::new(outer).execute(|inner| {
                inner.put(&mut Entity::new("item").unwrap().with("n", 8))?;
                inner.query_ids(&Filter::all("item").unwrap())
            })?;
            assert!(inner.contains(&id));
            outer.get(id)
        })
        .unwrap();
    assert!(found.is_some());

    // the lock is fully released afterwards
    thread::scope(|s| {
        s.spawn(|| store.put(&mut Entity::new("item").unwrap()).unwrap());
    });
}

#[test]
fn nested_failure_surfaces_once_wrapped() {
    let (store, _probe) = probed_store();
    let err = store
        .transaction(|outer| {
            outer.transaction(|inner| inner.query_single(&Filter::all("item")?))
        })
        .unwrap_err();

    match err {
        CoreError::Transaction { source, .. } => assert!(matches!(
            source.as_deref(),
            Some(CoreError::Cardinality { found: 0 })
        )),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn close_waits_for_running_unit() {
    let (store, _probe) = probed_store();
    let (started_tx, started_rx) = mpsc::channel();

    thread::scope(|s| {
        let unit = s.spawn(|| {
            store.transaction(|st| {
                started_tx.send(()).unwrap();
                thread::sleep(Duration::from_millis(100));
                st.put(&mut Entity::new("item").unwrap())
            })
        });

        started_rx.recv_timeout(TIMEOUT).unwrap();
        store.close().unwrap();
        assert!(unit.join().unwrap().is_ok());
    });
    assert!(store.is_closed());
}
