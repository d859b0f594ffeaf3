use std::sync::{Arc, Mutex};

use typebus::{
    Bus, BusConfig, GlobalStorage, HandlerRef, Reentrant, RouteInfo, Router, RouterDecision,
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

// ====== absorption ======

#[test]
fn an_absorbing_router_blanks_out_one_address() {
    struct TheBus;
    impl BusConfig for TheBus {
        type Interface = dyn Probe;
        type AddressId = u32;
        type Handlers = UnorderedHandlers<Self>;
        type Directory = UnorderedAddresses<Self>;
        type Lock = Reentrant;
        type Storage = GlobalStorage;
    }

    struct Firewall {
        blocked: u32,
    }
    impl Router<TheBus> for Firewall {
        fn route(
            &self,
            info: &RouteInfo<'_, TheBus>,
            _event: &mut dyn FnMut(&(dyn Probe + 'static)),
        ) -> RouterDecision {
            if info.address == Some(&self.blocked) {
                RouterDecision::SkipHandlers
            } else {
                RouterDecision::Continue
            }
        }
    }

    let log = Arc::new(Mutex::new(Vec::new()));
    let open: HandlerRef<TheBus> = recorder("open", &log);
    let blocked: HandlerRef<TheBus> = recorder("blocked", &log);
    Bus::<TheBus>::connect_at(1, open).unwrap();
    Bus::<TheBus>::connect_at(2, blocked).unwrap();

    let firewall: Arc<dyn Router<TheBus>> = Arc::new(Firewall { blocked: 2 });
    Bus::<TheBus>::register_router(firewall.clone(), 0);

    Bus::<TheBus>::dispatch(&1, |h| h.hit(1));
    Bus::<TheBus>::dispatch(&2, |h| h.hit(2));
    assert_eq!(*log.lock().unwrap(), [("open", 1)]);

    // A broadcast has no single address and passes the filter whole.
    Bus::<TheBus>::broadcast(|h| h.hit(3));
    assert_eq!(log.lock().unwrap().len(), 3);

    // Unregistering restores delivery.
    assert!(Bus::<TheBus>::unregister_router(&firewall));
    assert!(!Bus::<TheBus>::unregister_router(&firewall));
    Bus::<TheBus>::dispatch(&2, |h| h.hit(4));
    assert_eq!(log.lock().unwrap().last(), Some(&("blocked", 4)));

    Bus::<TheBus>::reset();
}

#[test]
fn skip_all_silences_later_routers_as_well() {
    struct TheBus;
    impl BusConfig for TheBus {
        type Interface = dyn Probe;
        type AddressId = u32;
        type Handlers = UnorderedHandlers<Self>;
        type Directory = UnorderedAddresses<Self>;
        type Lock = Reentrant;
        type Storage = GlobalStorage;
    }

    struct Tap {
        name: &'static str,
        consulted: Arc<Mutex<Vec<&'static str>>>,
        decision: RouterDecision,
    }
    impl Router<TheBus> for Tap {
        fn route(
            &self,
            _info: &RouteInfo<'_, TheBus>,
            _event: &mut dyn FnMut(&(dyn Probe + 'static)),
        ) -> RouterDecision {
            self.consulted.lock().unwrap().push(self.name);
            self.decision
        }
    }

    let log = Arc::new(Mutex::new(Vec::new()));
    let handler: HandlerRef<TheBus> = recorder("h", &log);
    Bus::<TheBus>::connect_at(1, handler).unwrap();

    let consulted = Arc::new(Mutex::new(Vec::new()));
    let gate: Arc<dyn Router<TheBus>> = Arc::new(Tap {
        name: "gate",
        consulted: consulted.clone(),
        decision: RouterDecision::SkipAll,
    });
    let shadow: Arc<dyn Router<TheBus>> = Arc::new(Tap {
        name: "shadow",
        consulted: consulted.clone(),
        decision: RouterDecision::Continue,
    });
    Bus::<TheBus>::register_router(gate, -1);
    Bus::<TheBus>::register_router(shadow, 1);

    Bus::<TheBus>::dispatch(&1, |h| h.hit(1));
    assert!(log.lock().unwrap().is_empty());
    assert_eq!(*consulted.lock().unwrap(), ["gate"]);

    Bus::<TheBus>::reset();
}

// ====== observation ======

#[test]
fn routers_see_the_event_and_its_delivery_flags() {
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

    struct Wiretap {
        seen: Arc<Mutex<Vec<(Option<u32>, bool, bool)>>>,
        ear: Recorder,
    }
    impl Router<TheBus> for Wiretap {
        fn route(
            &self,
            info: &RouteInfo<'_, TheBus>,
            event: &mut dyn FnMut(&(dyn Probe + 'static)),
        ) -> RouterDecision {
            self.seen
                .lock()
                .unwrap()
                .push((info.address.copied(), info.queued, info.reverse));
            // Routers observe by applying the event to their own interface.
            event(&self.ear);
            RouterDecision::Continue
        }
    }

    let log = Arc::new(Mutex::new(Vec::new()));
    let tap_log = Arc::new(Mutex::new(Vec::new()));
    let handler: HandlerRef<TheBus> = recorder("h", &log);
    Bus::<TheBus>::connect_at(5, handler).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let tap: Arc<dyn Router<TheBus>> = Arc::new(Wiretap {
        seen: seen.clone(),
        ear: Recorder {
            name: "tap",
            log: tap_log.clone(),
        },
    });
    Bus::<TheBus>::register_router(tap, 0);

    Bus::<TheBus>::dispatch(&5, |h| h.hit(1));
    Bus::<TheBus>::broadcast_reverse(|h| h.hit(2));
    Bus::<TheBus>::queue_dispatch(5, |h| h.hit(3));
    Bus::<TheBus>::execute_queued();

    assert_eq!(
        *seen.lock().unwrap(),
        [
            (Some(5), false, false),
            (None, false, true),
            (Some(5), true, false),
        ]
    );
    assert_eq!(*tap_log.lock().unwrap(), [("tap", 1), ("tap", 2), ("tap", 3)]);
    assert_eq!(*log.lock().unwrap(), [("h", 1), ("h", 2), ("h", 3)]);

    Bus::<TheBus>::reset();
}

// ====== router-only buses ======

#[test]
fn a_router_keeps_a_handlerless_bus_alive_for_queueing() {
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

    struct Sink {
        ear: Recorder,
    }
    impl Router<TheBus> for Sink {
        fn route(
            &self,
            _info: &RouteInfo<'_, TheBus>,
            event: &mut dyn FnMut(&(dyn Probe + 'static)),
        ) -> RouterDecision {
            event(&self.ear);
            RouterDecision::SkipHandlers
        }
    }

    let log = Arc::new(Mutex::new(Vec::new()));
    let sink: Arc<dyn Router<TheBus>> = Arc::new(Sink {
        ear: Recorder {
            name: "sink",
            log: log.clone(),
        },
    });
    Bus::<TheBus>::register_router(sink, 0);

    // No handlers anywhere, but the router counts as an audience, so the
    // event is queued rather than dropped and reaches the router at flush.
    Bus::<TheBus>::queue_dispatch(1, |h| h.hit(9));
    assert_eq!(Bus::<TheBus>::queued_event_count(), 1);
    Bus::<TheBus>::execute_queued();
    assert_eq!(*log.lock().unwrap(), [("sink", 9)]);

    Bus::<TheBus>::reset();
}
