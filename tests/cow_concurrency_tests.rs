#![cfg(feature = "cow")]

use rstest::rstest;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;
use synchrony::cow::{CowMap, CowSet};

/// Counts concurrent copy-function invocations; each gated copy waits for a
/// permit before completing.
struct CopyGate {
    gated: AtomicBool,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    permits: Mutex<mpsc::Receiver<()>>,
}

impl CopyGate {
    fn new() -> (Arc<Self>, mpsc::Sender<()>) {
        let (sender, receiver) = mpsc::channel();
        let gate = Arc::new(Self {
            gated: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            permits: Mutex::new(receiver),
        });
        (gate, sender)
    }

    fn pass(&self) {
        if !self.gated.load(Ordering::SeqCst) {
            return;
        }
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.permits.lock().unwrap().recv().unwrap();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

fn wait_until(condition: impl Fn() -> bool) {
    while !condition() {
        thread::sleep(Duration::from_millis(1));
    }
}

#[rstest]
fn cow_writers_run_one_copy_at_a_time() {
    let (gate, permits) = CopyGate::new();
    let copier_gate = Arc::clone(&gate);
    let map = Arc::new(CowMap::with_copier(
        HashMap::from([(1, "one"), (2, "two")]),
        move |map: &HashMap<i32, &'static str>| {
            copier_gate.pass();
            map.clone()
        },
    ));
    gate.gated.store(true, Ordering::SeqCst);

    let (done_sender, done_receiver) = mpsc::channel();
    let writers = vec![
        {
            let map = Arc::clone(&map);
            let done = done_sender.clone();
            thread::spawn(move || {
                map.remove(&1);
                done.send("remove").unwrap();
            })
        },
        {
            let map = Arc::clone(&map);
            let done = done_sender.clone();
            thread::spawn(move || {
                map.put(3, "three");
                done.send("put").unwrap();
            })
        },
        {
            let map = Arc::clone(&map);
            let done = done_sender;
            thread::spawn(move || {
                map.clear();
                done.send("clear").unwrap();
            })
        },
    ];

    let mut completed = Vec::new();
    for _ in 0..3 {
        wait_until(|| gate.in_flight.load(Ordering::SeqCst) == 1);
        thread::sleep(Duration::from_millis(10));
        assert_eq!(gate.in_flight.load(Ordering::SeqCst), 1);

        // Readers are never held up by the blocked writer.
        let _ = map.len();
        let _ = map.get(&2);

        permits.send(()).unwrap();
        completed.push(done_receiver.recv().unwrap());
        assert!(done_receiver.try_recv().is_err());
    }

    for writer in writers {
        writer.join().unwrap();
    }
    assert_eq!(gate.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(map.version(), 3);
    completed.sort_unstable();
    assert_eq!(completed, vec!["clear", "put", "remove"]);
}

#[rstest]
fn cow_set_concurrent_inserts_are_all_published() {
    const THREADS: usize = 8;
    const ITEMS: usize = 50;
    let set: Arc<CowSet<std::collections::BTreeSet<usize>>> = Arc::new(CowSet::default());

    let handles: Vec<_> = (0..THREADS)
        .map(|thread_index| {
            let set = Arc::clone(&set);
            thread::spawn(move || {
                for item in 0..ITEMS {
                    set.insert(thread_index * ITEMS + item);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(set.len(), THREADS * ITEMS);
    assert_eq!(set.version(), (THREADS * ITEMS) as u64);
    assert_eq!(set.iter().collect::<Vec<_>>(), (0..THREADS * ITEMS).collect::<Vec<_>>());
}
