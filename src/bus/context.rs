use std::sync::atomic::AtomicUsize;
use std::thread::ThreadId;

use parking_lot::Mutex;

use crate::bus::queue::{EventQueue, FunctionQueue};
use crate::bus::router::RouterChain;
use crate::config::BusConfig;
use crate::sync::LockPolicy;

/// Mutable bus state guarded by the config's lock policy.
pub(crate) struct BusState<C: BusConfig> {
    pub(crate) directory: C::Directory,
    pub(crate) routers: RouterChain<C>,
}

/// The per-bus-type singleton.
///
/// The handler and router totals are plain atomics read outside the lock:
/// dispatch on an empty, router-free bus returns without ever locking. They
/// are advisory for that fast path only; every decision that matters is
/// re-made under the lock.
pub struct Context<C: BusConfig> {
    pub(crate) state: <C::Lock as LockPolicy>::Cell<BusState<C>>,
    pub(crate) handlers_total: AtomicUsize,
    pub(crate) routers_total: AtomicUsize,
    pub(crate) events: EventQueue<C>,
    pub(crate) functions: FunctionQueue,
    /// Stack of addresses currently being dispatched on this context,
    /// innermost last, each tagged with the dispatching thread. Backs
    /// `current_address`, which only reports entries its caller pushed.
    pub(crate) callstack: Mutex<Vec<(ThreadId, C::AddressId)>>,
}

impl<C: BusConfig> Context<C> {
    pub(crate) fn new() -> Self {
        Context {
            state: C::Lock::new_cell(BusState {
                directory: C::Directory::default(),
                routers: RouterChain::default(),
            }),
            handlers_total: AtomicUsize::new(0),
            routers_total: AtomicUsize::new(0),
            events: EventQueue::new(),
            functions: FunctionQueue::new(),
            callstack: Mutex::new(Vec::new()),
        }
    }
}
