use std::sync::Arc;

use crate::config::BusConfig;

/// What a router decided about one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterDecision {
    /// Let the event proceed.
    Continue,
    /// Absorb the event: handlers are skipped, later routers still see it.
    SkipHandlers,
    /// Absorb the event and stop the router chain immediately.
    SkipAll,
}

/// Metadata routers receive alongside the event.
pub struct RouteInfo<'a, C: BusConfig> {
    /// Target address, or `None` for a broadcast.
    pub address: Option<&'a C::AddressId>,
    /// True when the event is being delivered from the queue.
    pub queued: bool,
    /// True for reverse-order delivery.
    pub reverse: bool,
}

/// An event interceptor.
///
/// Routers see every event on the bus before any handler does, in ascending
/// `order` (ties in registration order). The event is passed as the same
/// type-erased invoker the handlers would receive; a router that wants to
/// observe the event applies it to its own interface object.
///
/// `Send + Sync` is required because the chain is shared by every storage
/// policy, including the process-global one.
pub trait Router<C: BusConfig>: Send + Sync + 'static {
    fn route(
        &self,
        info: &RouteInfo<'_, C>,
        event: &mut dyn FnMut(&C::Interface),
    ) -> RouterDecision;
}

struct RouterEntry<C: BusConfig> {
    order: i32,
    seq: u64,
    router: Arc<dyn Router<C>>,
}

/// Priority-ordered router registrations.
pub(crate) struct RouterChain<C: BusConfig> {
    entries: Vec<RouterEntry<C>>,
    next_seq: u64,
}

impl<C: BusConfig> Default for RouterChain<C> {
    fn default() -> Self {
        RouterChain {
            entries: Vec::new(),
            next_seq: 0,
        }
    }
}

impl<C: BusConfig> RouterChain<C> {
    pub(crate) fn insert(&mut self, router: Arc<dyn Router<C>>, order: i32) {
        let seq = self.next_seq;
        self.next_seq += 1;
        let at = self
            .entries
            .partition_point(|entry| (entry.order, entry.seq) <= (order, seq));
        self.entries.insert(at, RouterEntry { order, seq, router });
    }

    /// Removes a router by identity. Returns whether it was registered.
    pub(crate) fn remove(&mut self, router: &Arc<dyn Router<C>>) -> bool {
        let target = Arc::as_ptr(router).cast::<()>();
        let before = self.entries.len();
        self.entries
            .retain(|entry| !std::ptr::eq(Arc::as_ptr(&entry.router).cast::<()>(), target));
        self.entries.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Chain snapshot in consultation order; safe to walk with the state
    /// borrow released.
    pub(crate) fn snapshot(&self) -> Vec<Arc<dyn Router<C>>> {
        self.entries.iter().map(|e| e.router.clone()).collect()
    }
}

/// Runs the chain over one event. Returns `true` when the event was
/// absorbed and handlers must be skipped.
pub(crate) fn consult<C: BusConfig>(
    routers: &[Arc<dyn Router<C>>],
    info: &RouteInfo<'_, C>,
    event: &mut dyn FnMut(&C::Interface),
) -> bool {
    let mut absorbed = false;
    for router in routers {
        match router.route(info, event) {
            RouterDecision::Continue => {}
            RouterDecision::SkipHandlers => absorbed = true,
            RouterDecision::SkipAll => return true,
        }
    }
    absorbed
}
