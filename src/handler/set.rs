use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use crate::config::BusConfig;
use crate::error::{ConnectError, DisconnectError};
use crate::handler::DispatchOrder;

/// A connected handler: shared ownership of an event-interface object.
pub type HandlerRef<C> = Arc<<C as BusConfig>::Interface>;

/// Identity comparison for handler registrations.
///
/// Compares the data pointer only. `Arc::ptr_eq` on trait objects also
/// compares vtable pointers, which can differ across codegen units for the
/// same object; the data pointer is the stable identity.
pub(crate) fn same_handler<I: ?Sized>(a: &Arc<I>, b: &Arc<I>) -> bool {
    std::ptr::eq(Arc::as_ptr(a).cast::<()>(), Arc::as_ptr(b).cast::<()>())
}

/// Handler storage at one address.
///
/// Walks are expressed as cursor stepping rather than iteration: `front` /
/// `back` yield the first entry in either direction, and `after` / `before`
/// yield the entry strictly past a cursor *as of the time of the call*. The
/// set may be mutated freely between steps.
pub trait HandlerSet<C: BusConfig>: Default + 'static {
    /// Walk position: the ordering key of the last-visited entry.
    type Cursor: Clone;

    /// Adds a handler. Rejects duplicates and, for single-handler sets, any
    /// second handler.
    fn connect(&mut self, handler: HandlerRef<C>) -> Result<(), ConnectError>;

    /// Removes a handler by identity.
    fn disconnect(&mut self, handler: &HandlerRef<C>) -> Result<(), DisconnectError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, handler: &HandlerRef<C>) -> bool;

    /// First entry in dispatch order.
    fn front(&self) -> Option<(Self::Cursor, HandlerRef<C>)>;

    /// Last entry in dispatch order.
    fn back(&self) -> Option<(Self::Cursor, HandlerRef<C>)>;

    /// Entry strictly after `cursor` in dispatch order.
    fn after(&self, cursor: &Self::Cursor) -> Option<(Self::Cursor, HandlerRef<C>)>;

    /// Entry strictly before `cursor` in dispatch order.
    fn before(&self, cursor: &Self::Cursor) -> Option<(Self::Cursor, HandlerRef<C>)>;
}

/// At most one handler per address.
pub struct SingleHandler<C: BusConfig> {
    slot: Option<HandlerRef<C>>,
}

impl<C: BusConfig> Default for SingleHandler<C> {
    fn default() -> Self {
        SingleHandler { slot: None }
    }
}

impl<C: BusConfig> HandlerSet<C> for SingleHandler<C> {
    type Cursor = ();

    fn connect(&mut self, handler: HandlerRef<C>) -> Result<(), ConnectError> {
        match &self.slot {
            Some(held) if same_handler(held, &handler) => Err(ConnectError::AlreadyConnected),
            Some(_) => Err(ConnectError::SlotOccupied),
            None => {
                self.slot = Some(handler);
                Ok(())
            }
        }
    }

    fn disconnect(&mut self, handler: &HandlerRef<C>) -> Result<(), DisconnectError> {
        match &self.slot {
            Some(held) if same_handler(held, handler) => {
                self.slot = None;
                Ok(())
            }
            _ => Err(DisconnectError::NotConnected),
        }
    }

    fn len(&self) -> usize {
        usize::from(self.slot.is_some())
    }

    fn contains(&self, handler: &HandlerRef<C>) -> bool {
        matches!(&self.slot, Some(held) if same_handler(held, handler))
    }

    fn front(&self) -> Option<(Self::Cursor, HandlerRef<C>)> {
        self.slot.clone().map(|h| ((), h))
    }

    fn back(&self) -> Option<(Self::Cursor, HandlerRef<C>)> {
        self.front()
    }

    fn after(&self, _cursor: &Self::Cursor) -> Option<(Self::Cursor, HandlerRef<C>)> {
        None
    }

    fn before(&self, _cursor: &Self::Cursor) -> Option<(Self::Cursor, HandlerRef<C>)> {
        None
    }
}

/// Any number of handlers, walked in connection order.
///
/// The delivery order is an implementation detail callers must not rely on;
/// only the walk-safety rules are guaranteed.
pub struct UnorderedHandlers<C: BusConfig> {
    entries: BTreeMap<u64, HandlerRef<C>>,
    next_seq: u64,
}

impl<C: BusConfig> Default for UnorderedHandlers<C> {
    fn default() -> Self {
        UnorderedHandlers {
            entries: BTreeMap::new(),
            next_seq: 0,
        }
    }
}

impl<C: BusConfig> HandlerSet<C> for UnorderedHandlers<C> {
    type Cursor = u64;

    fn connect(&mut self, handler: HandlerRef<C>) -> Result<(), ConnectError> {
        if self.contains(&handler) {
            return Err(ConnectError::AlreadyConnected);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(seq, handler);
        Ok(())
    }

    fn disconnect(&mut self, handler: &HandlerRef<C>) -> Result<(), DisconnectError> {
        let key = self
            .entries
            .iter()
            .find(|(_, h)| same_handler(h, handler))
            .map(|(k, _)| *k)
            .ok_or(DisconnectError::NotConnected)?;
        self.entries.remove(&key);
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn contains(&self, handler: &HandlerRef<C>) -> bool {
        self.entries.values().any(|h| same_handler(h, handler))
    }

    fn front(&self) -> Option<(Self::Cursor, HandlerRef<C>)> {
        self.entries.iter().next().map(|(k, h)| (*k, h.clone()))
    }

    fn back(&self) -> Option<(Self::Cursor, HandlerRef<C>)> {
        self.entries.iter().next_back().map(|(k, h)| (*k, h.clone()))
    }

    fn after(&self, cursor: &Self::Cursor) -> Option<(Self::Cursor, HandlerRef<C>)> {
        self.entries
            .range((Bound::Excluded(*cursor), Bound::Unbounded))
            .next()
            .map(|(k, h)| (*k, h.clone()))
    }

    fn before(&self, cursor: &Self::Cursor) -> Option<(Self::Cursor, HandlerRef<C>)> {
        self.entries
            .range(..*cursor)
            .next_back()
            .map(|(k, h)| (*k, h.clone()))
    }
}

/// Any number of handlers, walked by [`DispatchOrder`] key.
///
/// Requires the bus interface to extend [`DispatchOrder`]. Lower keys first;
/// equal keys keep connection order.
pub struct OrderedHandlers<C: BusConfig> {
    entries: BTreeMap<(i64, u64), HandlerRef<C>>,
    next_seq: u64,
}

impl<C: BusConfig> Default for OrderedHandlers<C> {
    fn default() -> Self {
        OrderedHandlers {
            entries: BTreeMap::new(),
            next_seq: 0,
        }
    }
}

impl<C: BusConfig> HandlerSet<C> for OrderedHandlers<C>
where
    C::Interface: DispatchOrder,
{
    type Cursor = (i64, u64);

    fn connect(&mut self, handler: HandlerRef<C>) -> Result<(), ConnectError> {
        if self.contains(&handler) {
            return Err(ConnectError::AlreadyConnected);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        let key = (handler.dispatch_order(), seq);
        self.entries.insert(key, handler);
        Ok(())
    }

    fn disconnect(&mut self, handler: &HandlerRef<C>) -> Result<(), DisconnectError> {
        let key = self
            .entries
            .iter()
            .find(|(_, h)| same_handler(h, handler))
            .map(|(k, _)| *k)
            .ok_or(DisconnectError::NotConnected)?;
        self.entries.remove(&key);
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn contains(&self, handler: &HandlerRef<C>) -> bool {
        self.entries.values().any(|h| same_handler(h, handler))
    }

    fn front(&self) -> Option<(Self::Cursor, HandlerRef<C>)> {
        self.entries.iter().next().map(|(k, h)| (*k, h.clone()))
    }

    fn back(&self) -> Option<(Self::Cursor, HandlerRef<C>)> {
        self.entries.iter().next_back().map(|(k, h)| (*k, h.clone()))
    }

    fn after(&self, cursor: &Self::Cursor) -> Option<(Self::Cursor, HandlerRef<C>)> {
        self.entries
            .range((Bound::Excluded(*cursor), Bound::Unbounded))
            .next()
            .map(|(k, h)| (*k, h.clone()))
    }

    fn before(&self, cursor: &Self::Cursor) -> Option<(Self::Cursor, HandlerRef<C>)> {
        self.entries
            .range(..*cursor)
            .next_back()
            .map(|(k, h)| (*k, h.clone()))
    }
}
