use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::warn;

use crate::bus::dispatch::AddressPtr;
use crate::config::BusConfig;

/// A deferred event: the stored target plus the type-erased invoker.
pub(crate) struct QueuedEvent<C: BusConfig> {
    pub(crate) target: QueuedTarget<C>,
    pub(crate) reverse: bool,
    pub(crate) invoke: Box<dyn FnMut(&C::Interface) + Send>,
}

pub(crate) enum QueuedTarget<C: BusConfig> {
    All,
    Id(C::AddressId),
    Cached(AddressPtr<C>),
}

/// FIFO of deferred events, locked independently of the bus state so
/// enqueueing never contends with dispatch.
pub(crate) struct EventQueue<C: BusConfig> {
    messages: Mutex<VecDeque<QueuedEvent<C>>>,
}

impl<C: BusConfig> EventQueue<C> {
    pub(crate) fn new() -> Self {
        EventQueue {
            messages: Mutex::new(VecDeque::new()),
        }
    }

    pub(crate) fn push(&self, event: QueuedEvent<C>) {
        self.messages.lock().push_back(event);
    }

    pub(crate) fn pop(&self) -> Option<QueuedEvent<C>> {
        self.messages.lock().pop_front()
    }

    pub(crate) fn clear(&self) {
        self.messages.lock().clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.messages.lock().len()
    }
}

/// FIFO of deferred closures, flushed after the event queue.
///
/// Posting can be turned off at runtime; a post while inactive is dropped
/// with a warning rather than queued, so shutdown code can fence off late
/// producers.
pub(crate) struct FunctionQueue {
    functions: Mutex<VecDeque<Box<dyn FnOnce() + Send>>>,
    active: AtomicBool,
}

impl FunctionQueue {
    pub(crate) fn new() -> Self {
        FunctionQueue {
            functions: Mutex::new(VecDeque::new()),
            active: AtomicBool::new(true),
        }
    }

    /// Posts a closure. Returns whether it was accepted.
    pub(crate) fn push(&self, function: Box<dyn FnOnce() + Send>) -> bool {
        if !self.active.load(Ordering::Acquire) {
            warn!("function posted to an inactive function queue; dropped");
            return false;
        }
        self.functions.lock().push_back(function);
        true
    }

    pub(crate) fn pop(&self) -> Option<Box<dyn FnOnce() + Send>> {
        self.functions.lock().pop_front()
    }

    pub(crate) fn clear(&self) {
        self.functions.lock().clear();
    }

    pub(crate) fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}
