use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::BusConfig;
use crate::error::{ConnectError, DisconnectError};
use crate::handler::{HandlerRef, HandlerSet};

type Cursor<C> = <<C as BusConfig>::Handlers as HandlerSet<C>>::Cursor;

/// One address on a bus: an id, its handler set, and a pin count.
///
/// The inner mutex protects the handler set and the pin count together; it
/// is held only for individual set operations, never across a handler
/// invocation, so handlers may reconnect or disconnect reentrantly without
/// self-deadlock.
pub struct AddressNode<C: BusConfig> {
    id: C::AddressId,
    inner: Mutex<NodeInner<C>>,
}

struct NodeInner<C: BusConfig> {
    handlers: C::Handlers,
    pins: u32,
}

impl<C: BusConfig> AddressNode<C> {
    pub(crate) fn new(id: C::AddressId) -> Arc<Self> {
        Arc::new(AddressNode {
            id,
            inner: Mutex::new(NodeInner {
                handlers: C::Handlers::default(),
                pins: 0,
            }),
        })
    }

    /// The id this node is (or was) linked under.
    pub fn id(&self) -> &C::AddressId {
        &self.id
    }

    pub(crate) fn handler_count(&self) -> usize {
        self.inner.lock().handlers.len()
    }

    pub(crate) fn contains(&self, handler: &HandlerRef<C>) -> bool {
        self.inner.lock().handlers.contains(handler)
    }

    pub(crate) fn connect(&self, handler: HandlerRef<C>) -> Result<(), ConnectError> {
        self.inner.lock().handlers.connect(handler)
    }

    /// Removes a handler. `Ok(true)` means the node emptied with no active
    /// pins and should be unlinked by the caller.
    pub(crate) fn disconnect(&self, handler: &HandlerRef<C>) -> Result<bool, DisconnectError> {
        let mut inner = self.inner.lock();
        inner.handlers.disconnect(handler)?;
        Ok(inner.handlers.is_empty() && inner.pins == 0)
    }

    /// True when the node is empty and unpinned, i.e. safe to unlink.
    pub(crate) fn unlinkable(&self) -> bool {
        let inner = self.inner.lock();
        inner.handlers.is_empty() && inner.pins == 0
    }

    /// Marks the node as being walked; unlink-on-empty is deferred until the
    /// matching [`unpin`](Self::unpin).
    pub(crate) fn pin(&self) {
        self.inner.lock().pins += 1;
    }

    /// Drops one pin. `true` means the node emptied while pinned and the
    /// caller must unlink it now.
    pub(crate) fn unpin(&self) -> bool {
        let mut inner = self.inner.lock();
        inner.pins -= 1;
        inner.pins == 0 && inner.handlers.is_empty()
    }

    pub(crate) fn step_front(&self) -> Option<(Cursor<C>, HandlerRef<C>)> {
        self.inner.lock().handlers.front()
    }

    pub(crate) fn step_back(&self) -> Option<(Cursor<C>, HandlerRef<C>)> {
        self.inner.lock().handlers.back()
    }

    pub(crate) fn step_after(&self, cursor: &Cursor<C>) -> Option<(Cursor<C>, HandlerRef<C>)> {
        self.inner.lock().handlers.after(cursor)
    }

    pub(crate) fn step_before(&self, cursor: &Cursor<C>) -> Option<(Cursor<C>, HandlerRef<C>)> {
        self.inner.lock().handlers.before(cursor)
    }
}
