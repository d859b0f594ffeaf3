use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use typebus::{
    Bus, BusConfig, GlobalStorage, HandlerRef, NoId, Reentrant, SingleAddress,
    UnorderedAddresses, UnorderedHandlers, WithEventQueue,
};

trait Probe: Send + Sync {
    fn hit(&self, event: u32);
}

type Log = Arc<Mutex<Vec<(&'static str, u32)>>>;

struct Recorder {
    name: &'static str,
    log: Log,
}

impl Probe for Recorder {
    fn hit(&self, event: u32) {
        self.log.lock().unwrap().push((self.name, event));
    }
}

fn recorder(name: &'static str, log: &Log) -> Arc<Recorder> {
    Arc::new(Recorder {
        name,
        log: log.clone(),
    })
}

// ====== deferral ======

#[test]
fn queued_events_wait_for_the_flush() {
    struct TheBus;
    impl BusConfig for TheBus {
        type Interface = dyn Probe;
        type AddressId = u32;
        type Handlers = UnorderedHandlers<Self>;
        type Directory = UnorderedAddresses<Self>;
        type Lock = Reentrant;
        type Storage = GlobalStorage;
    }
    impl WithEventQueue for TheBus {}

    let log = Arc::new(Mutex::new(Vec::new()));
    let handler: HandlerRef<TheBus> = recorder("h", &log);
    Bus::<TheBus>::connect_at(1, handler).unwrap();

    Bus::<TheBus>::queue_dispatch(1, |h| h.hit(1));
    Bus::<TheBus>::queue_broadcast(|h| h.hit(2));
    assert!(log.lock().unwrap().is_empty());
    assert_eq!(Bus::<TheBus>::queued_event_count(), 2);

    Bus::<TheBus>::execute_queued();
    assert_eq!(*log.lock().unwrap(), [("h", 1), ("h", 2)]);
    assert_eq!(Bus::<TheBus>::queued_event_count(), 0);

    // A drained queue flushes to nothing.
    Bus::<TheBus>::execute_queued();
    assert_eq!(log.lock().unwrap().len(), 2);

    Bus::<TheBus>::reset();
}

#[test]
fn queued_events_run_before_queued_functions() {
    struct TheBus;
    impl BusConfig for TheBus {
        type Interface = dyn Probe;
        type AddressId = NoId;
        type Handlers = UnorderedHandlers<Self>;
        type Directory = SingleAddress<Self>;
        type Lock = Reentrant;
        type Storage = GlobalStorage;
    }
    impl WithEventQueue for TheBus {}

    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let handler: HandlerRef<TheBus> = recorder("h", &log);
    Bus::<TheBus>::connect(handler).unwrap();

    // Interleave posts; the flush still runs all events first.
    Bus::<TheBus>::queue_broadcast(|h| h.hit(1));
    {
        let log = log.clone();
        Bus::<TheBus>::queue_function(move || log.lock().unwrap().push(("fn", 0)));
    }
    Bus::<TheBus>::queue_broadcast(|h| h.hit(2));

    Bus::<TheBus>::execute_queued();
    assert_eq!(*log.lock().unwrap(), [("h", 1), ("h", 2), ("fn", 0)]);

    Bus::<TheBus>::reset();
}

#[test]
fn clear_discards_everything_undelivered() {
    struct TheBus;
    impl BusConfig for TheBus {
        type Interface = dyn Probe;
        type AddressId = NoId;
        type Handlers = UnorderedHandlers<Self>;
        type Directory = SingleAddress<Self>;
        type Lock = Reentrant;
        type Storage = GlobalStorage;
    }
    impl WithEventQueue for TheBus {}

    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let handler: HandlerRef<TheBus> = recorder("h", &log);
    Bus::<TheBus>::connect(handler).unwrap();

    Bus::<TheBus>::queue_broadcast(|h| h.hit(1));
    {
        let log = log.clone();
        Bus::<TheBus>::queue_function(move || log.lock().unwrap().push(("fn", 0)));
    }
    Bus::<TheBus>::clear_queued();
    Bus::<TheBus>::execute_queued();
    assert!(log.lock().unwrap().is_empty());

    Bus::<TheBus>::reset();
}

// ====== emptiness and activation ======

#[test]
fn queueing_to_an_empty_bus_is_dropped_at_enqueue() {
    struct TheBus;
    impl BusConfig for TheBus {
        type Interface = dyn Probe;
        type AddressId = u32;
        type Handlers = UnorderedHandlers<Self>;
        type Directory = UnorderedAddresses<Self>;
        type Lock = Reentrant;
        type Storage = GlobalStorage;
    }
    impl WithEventQueue for TheBus {}

    let log = Arc::new(Mutex::new(Vec::new()));

    // Nobody is connected and nobody routes, so the event never makes it
    // into the queue.
    Bus::<TheBus>::queue_dispatch(1, |h| h.hit(1));
    assert_eq!(Bus::<TheBus>::queued_event_count(), 0);

    // Connecting afterwards does not resurrect it.
    let handler: HandlerRef<TheBus> = recorder("late", &log);
    Bus::<TheBus>::connect_at(1, handler).unwrap();
    Bus::<TheBus>::execute_queued();
    assert!(log.lock().unwrap().is_empty());

    Bus::<TheBus>::reset();
}

#[test]
fn inactive_function_queue_drops_posts() {
    struct TheBus;
    impl BusConfig for TheBus {
        type Interface = dyn Probe;
        type AddressId = NoId;
        type Handlers = UnorderedHandlers<Self>;
        type Directory = SingleAddress<Self>;
        type Lock = Reentrant;
        type Storage = GlobalStorage;
    }
    impl WithEventQueue for TheBus {}

    // Surface the dropped-post warning when the suite runs with RUST_LOG set.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let ran = Arc::new(AtomicBool::new(false));

    assert!(Bus::<TheBus>::is_function_queueing_active());
    Bus::<TheBus>::set_function_queueing_active(false);
    {
        let ran = ran.clone();
        Bus::<TheBus>::queue_function(move || ran.store(true, Ordering::SeqCst));
    }
    Bus::<TheBus>::set_function_queueing_active(true);

    // The drop happened at post time; re-activating cannot recover it.
    Bus::<TheBus>::execute_queued();
    assert!(!ran.load(Ordering::SeqCst));

    Bus::<TheBus>::reset();
}

// ====== cached targets and reentrant posts ======

#[test]
fn queued_cached_dispatch_lands_on_the_bound_address() {
    struct TheBus;
    impl BusConfig for TheBus {
        type Interface = dyn Probe;
        type AddressId = u32;
        type Handlers = UnorderedHandlers<Self>;
        type Directory = UnorderedAddresses<Self>;
        type Lock = Reentrant;
        type Storage = GlobalStorage;
    }
    impl WithEventQueue for TheBus {}

    let log = Arc::new(Mutex::new(Vec::new()));
    let near: HandlerRef<TheBus> = recorder("near", &log);
    let far: HandlerRef<TheBus> = recorder("far", &log);
    Bus::<TheBus>::connect_at(1, near).unwrap();
    Bus::<TheBus>::connect_at(2, far).unwrap();

    let ptr = Bus::<TheBus>::bind(1);
    Bus::<TheBus>::queue_dispatch_cached(&ptr, |h| h.hit(7));
    Bus::<TheBus>::execute_queued();
    assert_eq!(*log.lock().unwrap(), [("near", 7)]);

    Bus::<TheBus>::reset();
}

#[test]
fn queued_cached_reverse_dispatch_mirrors_the_handler_order() {
    struct TheBus;
    impl BusConfig for TheBus {
        type Interface = dyn Probe;
        type AddressId = u32;
        type Handlers = UnorderedHandlers<Self>;
        type Directory = UnorderedAddresses<Self>;
        type Lock = Reentrant;
        type Storage = GlobalStorage;
    }
    impl WithEventQueue for TheBus {}

    let log = Arc::new(Mutex::new(Vec::new()));
    let first: HandlerRef<TheBus> = recorder("first", &log);
    let second: HandlerRef<TheBus> = recorder("second", &log);
    Bus::<TheBus>::connect_at(1, first).unwrap();
    Bus::<TheBus>::connect_at(1, second).unwrap();

    let ptr = Bus::<TheBus>::bind(1);
    Bus::<TheBus>::queue_dispatch_cached_reverse(&ptr, |h| h.hit(8));
    Bus::<TheBus>::execute_queued();
    assert_eq!(*log.lock().unwrap(), [("second", 8), ("first", 8)]);

    Bus::<TheBus>::reset();
}

#[test]
fn events_queued_during_the_flush_are_flushed_too() {
    trait Chain: Send + Sync {
        fn link(&self, depth: u32);
    }

    struct TheBus;
    impl BusConfig for TheBus {
        type Interface = dyn Chain;
        type AddressId = NoId;
        type Handlers = UnorderedHandlers<Self>;
        type Directory = SingleAddress<Self>;
        type Lock = Reentrant;
        type Storage = GlobalStorage;
    }
    impl WithEventQueue for TheBus {}

    struct Linker {
        depths: Mutex<Vec<u32>>,
    }
    impl Chain for Linker {
        fn link(&self, depth: u32) {
            self.depths.lock().unwrap().push(depth);
            if depth < 3 {
                Bus::<TheBus>::queue_broadcast(move |h| h.link(depth + 1));
            }
        }
    }

    let linker = Arc::new(Linker {
        depths: Mutex::new(Vec::new()),
    });
    Bus::<TheBus>::connect(linker.clone()).unwrap();

    Bus::<TheBus>::queue_broadcast(|h| h.link(0));
    Bus::<TheBus>::execute_queued();
    assert_eq!(*linker.depths.lock().unwrap(), [0, 1, 2, 3]);
    assert_eq!(Bus::<TheBus>::queued_event_count(), 0);

    Bus::<TheBus>::reset();
}

#[test]
fn events_queued_by_a_flushed_function_are_delivered_in_the_same_flush() {
    struct TheBus;
    impl BusConfig for TheBus {
        type Interface = dyn Probe;
        type AddressId = NoId;
        type Handlers = UnorderedHandlers<Self>;
        type Directory = SingleAddress<Self>;
        type Lock = Reentrant;
        type Storage = GlobalStorage;
    }
    impl WithEventQueue for TheBus {}

    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let handler: HandlerRef<TheBus> = recorder("h", &log);
    Bus::<TheBus>::connect(handler).unwrap();

    Bus::<TheBus>::queue_function(|| Bus::<TheBus>::queue_broadcast(|h| h.hit(5)));
    Bus::<TheBus>::execute_queued();
    assert_eq!(*log.lock().unwrap(), [("h", 5)]);
    assert_eq!(Bus::<TheBus>::queued_event_count(), 0);

    Bus::<TheBus>::reset();
}
