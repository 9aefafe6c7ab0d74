use analytics::{
    ClientInfo, DwellOutcome, EventRecord, EventRecorder, EventStore, IncomingRequest, MemoryEventStore, SledEventStore,
};
use std::collections::HashSet;
use std::sync::{Arc, Barrier};

fn client(key: &str) -> ClientInfo {
    ClientInfo {
        key: key.into(),
        ip: "192.168.1.20".into(),
        user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 17_1 like Mac OS X) Mobile/15E148 Safari/604.1".into(),
    }
}

fn search(q: &str) -> IncomingRequest {
    IncomingRequest { path: "/search".into(), method: "GET".into(), query_string: q.into() }
}

fn session_count(store: &dyn EventStore) -> usize {
    store.snapshot().unwrap().iter().filter(|r| matches!(r, EventRecord::Session(_))).count()
}

#[test]
fn simultaneous_first_contact_creates_one_session() {
    const N: usize = 32;
    let store: Arc<dyn EventStore> = Arc::new(MemoryEventStore::new());
    let recorder = Arc::new(EventRecorder::new(store.clone()).unwrap());
    let barrier = Arc::new(Barrier::new(N));

    let handles: Vec<_> = (0..N)
        .map(|_| {
            let recorder = recorder.clone();
            let barrier = barrier.clone();
            std::thread::spawn(move || {
                barrier.wait();
                recorder.record_request(&client("same-client"), search("red shoes")).unwrap().session_id
            })
        })
        .collect();

    let ids: HashSet<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(ids.len(), 1);
    assert_eq!(session_count(store.as_ref()), 1);
    assert_eq!(recorder.compute_stats(5).unwrap().total_requests, N as u64);
}

#[test]
fn dwell_completion_is_first_write_wins() {
    let recorder = EventRecorder::new(Arc::new(MemoryEventStore::new())).unwrap();
    let req = recorder.record_request(&client("c1"), search("red shoes")).unwrap();
    let handle = recorder.record_click(&req.session_id, "D1", 1, "red shoes").unwrap();

    let before = recorder.compute_stats(5).unwrap();
    assert_eq!(before.total_clicks, 1);
    assert_eq!(before.completed_dwells, 0);
    assert_eq!(before.avg_dwell_secs, 0.0);

    assert_eq!(recorder.complete_dwell(handle, 42.0).unwrap(), DwellOutcome::Recorded);
    let after = recorder.compute_stats(5).unwrap();
    assert_eq!(after.avg_dwell_secs, 42.0);

    assert_eq!(recorder.complete_dwell(handle, 99.0).unwrap(), DwellOutcome::AlreadyCompleted);
    assert_eq!(recorder.compute_stats(5).unwrap().avg_dwell_secs, 42.0);
}

#[test]
fn concurrent_completions_record_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn EventStore> = Arc::new(SledEventStore::open(dir.path()).unwrap());
    let recorder = Arc::new(EventRecorder::new(store).unwrap());
    let req = recorder.record_request(&client("c1"), search("boots")).unwrap();
    let handle = recorder.record_click(&req.session_id, "B7", 4, "boots").unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let recorder = recorder.clone();
            std::thread::spawn(move || recorder.complete_dwell(handle, 10.0 + i as f64).unwrap())
        })
        .collect();
    let recorded = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|o| *o == DwellOutcome::Recorded)
        .count();
    assert_eq!(recorded, 1);
    assert_eq!(recorder.compute_stats(5).unwrap().completed_dwells, 1);
}

#[test]
fn stats_are_stable_across_calls() {
    let recorder = EventRecorder::new(Arc::new(MemoryEventStore::new())).unwrap();
    for (key, q) in [("a", "jeans"), ("b", "slim jeans"), ("a", "black boots")] {
        let req = recorder.record_request(&client(key), search(q)).unwrap();
        recorder.record_click(&req.session_id, "J1", 2, q).unwrap();
    }
    let first = recorder.compute_stats(3).unwrap();
    let second = recorder.compute_stats(3).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.total_sessions, 2);
    assert_eq!(first.top_terms[0].key, "jean");
    assert_eq!(first.devices[0].key, "Mobile");
}
