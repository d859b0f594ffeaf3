use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

use crate::address::{AddressNode, Directory};
use crate::bus::context::{BusState, Context};
use crate::bus::queue::{QueuedEvent, QueuedTarget};
use crate::bus::router::{self, RouteInfo, Router};
use crate::config::{BusConfig, NoId, WithEventQueue};
use crate::error::{ConnectError, DisconnectError};
use crate::handler::HandlerRef;
use crate::sync::{LockPolicy, StoragePolicy};

/// A cached address: the result of a one-time id lookup.
///
/// Dispatching through the pointer skips the directory lookup entirely. The
/// pointer stays valid forever; once its address empties and unlinks,
/// dispatch through it is a no-op, and a later reconnect under the same id
/// goes to a fresh node the stale pointer does not see.
pub struct AddressPtr<C: BusConfig> {
    pub(crate) node: Arc<AddressNode<C>>,
}

impl<C: BusConfig> Clone for AddressPtr<C> {
    fn clone(&self) -> Self {
        AddressPtr {
            node: self.node.clone(),
        }
    }
}

impl<C: BusConfig> AddressPtr<C> {
    /// The id this pointer was bound to.
    pub fn id(&self) -> &C::AddressId {
        self.node.id()
    }
}

/// Dispatch target, before the directory has been consulted.
enum Target<'a, C: BusConfig> {
    All,
    Id(&'a C::AddressId),
    Node(&'a Arc<AddressNode<C>>),
}

impl<'a, C: BusConfig> Target<'a, C> {
    fn address(&self) -> Option<&C::AddressId> {
        match self {
            Target::All => None,
            Target::Id(id) => Some(id),
            Target::Node(node) => Some(node.id()),
        }
    }
}

/// The operation surface of one configured bus.
///
/// `Bus` is never instantiated; every operation is an associated function
/// that locates the context through `C::Storage`. Events are closures over
/// the interface: `Bus::<DocBus>::broadcast(|h| h.on_saved("a.txt"))` calls
/// `on_saved` on every connected handler.
pub struct Bus<C: BusConfig> {
    _config: PhantomData<C>,
}

impl<C: BusConfig> Bus<C> {
    // ===== connection =====

    /// Connects a handler at an address. The address is created on demand.
    pub fn connect_at(id: C::AddressId, handler: HandlerRef<C>) -> Result<(), ConnectError> {
        C::Storage::with_context(|ctx| {
            C::Lock::with(&ctx.state, |state| {
                let node = state.borrow_mut().directory.get_or_create(&id);
                match node.connect(handler) {
                    Ok(()) => {
                        ctx.handlers_total.fetch_add(1, Ordering::Relaxed);
                        Ok(())
                    }
                    Err(err) => {
                        // A failed connect must not leave behind an address
                        // that was created just for it.
                        if node.unlinkable() {
                            state.borrow_mut().directory.unlink(&node);
                        }
                        Err(err)
                    }
                }
            })
        })
    }

    /// Disconnects a handler from an address. The address unlinks when its
    /// last handler leaves, unless a walk currently has it pinned.
    pub fn disconnect_from(
        id: &C::AddressId,
        handler: &HandlerRef<C>,
    ) -> Result<(), DisconnectError> {
        C::Storage::with_context(|ctx| {
            C::Lock::with(&ctx.state, |state| {
                let node = state
                    .borrow()
                    .directory
                    .find(id)
                    .ok_or(DisconnectError::NotConnected)?;
                let unlink = node.disconnect(handler)?;
                ctx.handlers_total.fetch_sub(1, Ordering::Relaxed);
                if unlink {
                    state.borrow_mut().directory.unlink(&node);
                }
                Ok(())
            })
        })
    }

    /// True if the handler is currently connected at the address.
    pub fn is_connected_at(id: &C::AddressId, handler: &HandlerRef<C>) -> bool {
        C::Storage::with_context(|ctx| {
            C::Lock::with(&ctx.state, |state| {
                state
                    .borrow()
                    .directory
                    .find(id)
                    .is_some_and(|node| node.contains(handler))
            })
        })
    }

    // ===== immediate dispatch =====

    /// Delivers an event to every handler on the bus, address by address in
    /// the directory's forward order.
    pub fn broadcast(mut event: impl FnMut(&C::Interface)) {
        Self::deliver(Target::All, false, false, &mut event);
    }

    /// [`broadcast`](Self::broadcast) in reverse order, both across
    /// addresses and within each address.
    pub fn broadcast_reverse(mut event: impl FnMut(&C::Interface)) {
        Self::deliver(Target::All, true, false, &mut event);
    }

    /// Broadcast capturing a result. Each handler's return overwrites the
    /// slot, so the last handler in delivery order wins; with no handlers
    /// the slot is left untouched.
    pub fn broadcast_result<R>(result: &mut R, mut event: impl FnMut(&C::Interface) -> R) {
        Self::deliver(Target::All, false, false, &mut |h| *result = event(h));
    }

    /// [`broadcast_result`](Self::broadcast_result) in reverse order.
    pub fn broadcast_result_reverse<R>(result: &mut R, mut event: impl FnMut(&C::Interface) -> R) {
        Self::deliver(Target::All, true, false, &mut |h| *result = event(h));
    }

    /// Delivers an event to the handlers at one address. Silently a no-op
    /// when nothing is connected there.
    pub fn dispatch(id: &C::AddressId, mut event: impl FnMut(&C::Interface)) {
        Self::deliver(Target::Id(id), false, false, &mut event);
    }

    /// [`dispatch`](Self::dispatch) in reverse handler order.
    pub fn dispatch_reverse(id: &C::AddressId, mut event: impl FnMut(&C::Interface)) {
        Self::deliver(Target::Id(id), true, false, &mut event);
    }

    /// Addressed dispatch capturing a result; last handler wins, untouched
    /// when no handler ran.
    pub fn dispatch_result<R>(
        id: &C::AddressId,
        result: &mut R,
        mut event: impl FnMut(&C::Interface) -> R,
    ) {
        Self::deliver(Target::Id(id), false, false, &mut |h| *result = event(h));
    }

    /// [`dispatch_result`](Self::dispatch_result) in reverse handler order.
    pub fn dispatch_result_reverse<R>(
        id: &C::AddressId,
        result: &mut R,
        mut event: impl FnMut(&C::Interface) -> R,
    ) {
        Self::deliver(Target::Id(id), true, false, &mut |h| *result = event(h));
    }

    // ===== cached-address dispatch =====

    /// Looks an address up once and returns a reusable pointer to it. The
    /// address is created (and linked) if absent.
    pub fn bind(id: C::AddressId) -> AddressPtr<C> {
        C::Storage::with_context(|ctx| {
            C::Lock::with(&ctx.state, |state| AddressPtr {
                node: state.borrow_mut().directory.get_or_create(&id),
            })
        })
    }

    /// [`dispatch`](Self::dispatch) through a cached address, skipping the
    /// directory lookup.
    pub fn dispatch_cached(ptr: &AddressPtr<C>, mut event: impl FnMut(&C::Interface)) {
        Self::deliver(Target::Node(&ptr.node), false, false, &mut event);
    }

    /// [`dispatch_cached`](Self::dispatch_cached) in reverse handler order.
    pub fn dispatch_cached_reverse(ptr: &AddressPtr<C>, mut event: impl FnMut(&C::Interface)) {
        Self::deliver(Target::Node(&ptr.node), true, false, &mut event);
    }

    /// Cached-address dispatch capturing a result; last handler wins.
    pub fn dispatch_cached_result<R>(
        ptr: &AddressPtr<C>,
        result: &mut R,
        mut event: impl FnMut(&C::Interface) -> R,
    ) {
        Self::deliver(Target::Node(&ptr.node), false, false, &mut |h| {
            *result = event(h)
        });
    }

    /// [`dispatch_cached_result`](Self::dispatch_cached_result) in reverse
    /// handler order.
    pub fn dispatch_cached_result_reverse<R>(
        ptr: &AddressPtr<C>,
        result: &mut R,
        mut event: impl FnMut(&C::Interface) -> R,
    ) {
        Self::deliver(Target::Node(&ptr.node), true, false, &mut |h| {
            *result = event(h)
        });
    }

    // ===== introspection =====

    /// Visits every handler on the bus without dispatching an event. The
    /// callback returns `false` to stop early.
    pub fn enumerate_handlers(mut visit: impl FnMut(&HandlerRef<C>) -> bool) {
        Self::enumerate(Target::All, &mut visit);
    }

    /// Visits the handlers at one address.
    pub fn enumerate_handlers_at(id: &C::AddressId, mut visit: impl FnMut(&HandlerRef<C>) -> bool) {
        Self::enumerate(Target::Id(id), &mut visit);
    }

    /// Visits the handlers at a cached address.
    pub fn enumerate_handlers_cached(
        ptr: &AddressPtr<C>,
        mut visit: impl FnMut(&HandlerRef<C>) -> bool,
    ) {
        Self::enumerate(Target::Node(&ptr.node), &mut visit);
    }

    /// First handler on the bus in forward delivery order.
    pub fn find_first_handler() -> Option<HandlerRef<C>> {
        let mut found = None;
        Self::enumerate(Target::All, &mut |handler| {
            found = Some(handler.clone());
            false
        });
        found
    }

    /// First handler at one address in forward delivery order.
    pub fn find_first_handler_at(id: &C::AddressId) -> Option<HandlerRef<C>> {
        let mut found = None;
        Self::enumerate(Target::Id(id), &mut |handler| {
            found = Some(handler.clone());
            false
        });
        found
    }

    /// Number of handlers connected at one address.
    pub fn count_handlers_at(id: &C::AddressId) -> usize {
        C::Storage::with_context(|ctx| {
            C::Lock::with(&ctx.state, |state| {
                state
                    .borrow()
                    .directory
                    .find(id)
                    .map_or(0, |node| node.handler_count())
            })
        })
    }

    /// Number of handlers connected anywhere on the bus.
    pub fn total_handlers() -> usize {
        C::Storage::with_context(|ctx| ctx.handlers_total.load(Ordering::Relaxed))
    }

    /// True when at least one handler is connected anywhere on the bus.
    pub fn has_handlers() -> bool {
        Self::total_handlers() > 0
    }

    /// The address the calling thread is currently dispatching to (the
    /// innermost one, when dispatches nest), or `None` when the caller is
    /// not inside a dispatch. Lets a handler learn which address an event
    /// arrived on; a thread that is not dispatching always sees `None`,
    /// even while another thread's walk is in flight.
    pub fn current_address() -> Option<C::AddressId> {
        let caller = thread::current().id();
        C::Storage::with_context(|ctx| {
            ctx.callstack
                .lock()
                .iter()
                .rev()
                .find(|(owner, _)| *owner == caller)
                .map(|(_, id)| id.clone())
        })
    }

    // ===== routing =====

    /// Registers a router. Lower `order` runs earlier; ties run in
    /// registration order.
    pub fn register_router(router: Arc<dyn Router<C>>, order: i32) {
        C::Storage::with_context(|ctx| {
            C::Lock::with(&ctx.state, |state| {
                let mut state = state.borrow_mut();
                state.routers.insert(router, order);
                ctx.routers_total.store(state.routers.len(), Ordering::Relaxed);
            })
        })
    }

    /// Unregisters a router by identity. Returns whether it was registered.
    pub fn unregister_router(router: &Arc<dyn Router<C>>) -> bool {
        C::Storage::with_context(|ctx| {
            C::Lock::with(&ctx.state, |state| {
                let mut state = state.borrow_mut();
                let removed = state.routers.remove(router);
                ctx.routers_total.store(state.routers.len(), Ordering::Relaxed);
                removed
            })
        })
    }

    // ===== lifecycle =====

    /// Tears the whole context down: handlers, addresses, routers, queues.
    /// The next call on the bus starts from a fresh context.
    pub fn reset() {
        C::Storage::reset();
    }

    // ===== walk engine =====

    /// Immediate or queued delivery of one event to a target.
    fn deliver(
        target: Target<'_, C>,
        reverse: bool,
        queued: bool,
        event: &mut dyn FnMut(&C::Interface),
    ) {
        C::Storage::with_context(|ctx| {
            // Fast path: nothing to do and nobody routing, without locking.
            let no_handlers = match &target {
                Target::Node(node) => node.handler_count() == 0,
                _ => ctx.handlers_total.load(Ordering::Relaxed) == 0,
            };
            if no_handlers && ctx.routers_total.load(Ordering::Relaxed) == 0 {
                return;
            }

            C::Lock::with(&ctx.state, |state| {
                if ctx.routers_total.load(Ordering::Relaxed) > 0 {
                    let routers = state.borrow().routers.snapshot();
                    let info = RouteInfo {
                        address: target.address(),
                        queued,
                        reverse,
                    };
                    if router::consult(&routers, &info, &mut *event) {
                        return;
                    }
                }

                let visit: &mut dyn FnMut(&HandlerRef<C>) -> bool = &mut |handler| {
                    event(&**handler);
                    true
                };
                match target {
                    Target::All => {
                        let mut nodes = state.borrow().directory.nodes();
                        if reverse {
                            nodes.reverse();
                        }
                        for node in &nodes {
                            Self::walk_node(ctx, state, node, reverse, true, visit);
                        }
                    }
                    Target::Id(id) => {
                        let found = state.borrow().directory.find(id);
                        if let Some(node) = found {
                            Self::walk_node(ctx, state, &node, reverse, false, visit);
                        }
                    }
                    Target::Node(node) => {
                        Self::walk_node(ctx, state, node, reverse, false, visit);
                    }
                }
            });
        });
    }

    /// Event-free walk over handlers; stops when `visit` returns `false`.
    fn enumerate(target: Target<'_, C>, visit: &mut dyn FnMut(&HandlerRef<C>) -> bool) {
        C::Storage::with_context(|ctx| {
            let no_handlers = match &target {
                Target::Node(node) => node.handler_count() == 0,
                _ => ctx.handlers_total.load(Ordering::Relaxed) == 0,
            };
            if no_handlers {
                return;
            }

            C::Lock::with(&ctx.state, |state| {
                match target {
                    Target::All => {
                        let nodes = state.borrow().directory.nodes();
                        for node in &nodes {
                            if !Self::walk_node(ctx, state, node, false, true, visit) {
                                break;
                            }
                        }
                    }
                    Target::Id(id) => {
                        let found = state.borrow().directory.find(id);
                        if let Some(node) = found {
                            Self::walk_node(ctx, state, &node, false, false, visit);
                        }
                    }
                    Target::Node(node) => {
                        Self::walk_node(ctx, state, node, false, false, visit);
                    }
                }
            });
        });
    }

    /// Walks one address. The cursor is advanced from the key of the entry
    /// just visited, so the walk tolerates any reentrant mutation of the
    /// set. Whole-bus walks pin the node (`pin = true`) so that emptying it
    /// mid-walk defers the unlink to us. Returns `false` if `visit` stopped
    /// the walk.
    fn walk_node(
        ctx: &Context<C>,
        state: &RefCell<BusState<C>>,
        node: &Arc<AddressNode<C>>,
        reverse: bool,
        pin: bool,
        visit: &mut dyn FnMut(&HandlerRef<C>) -> bool,
    ) -> bool {
        if node.handler_count() == 0 {
            return true;
        }
        if pin {
            node.pin();
        }
        ctx.callstack
            .lock()
            .push((thread::current().id(), node.id().clone()));

        let mut keep_going = true;
        let mut step = if reverse {
            node.step_back()
        } else {
            node.step_front()
        };
        while let Some((cursor, handler)) = step {
            keep_going = visit(&handler);
            if !keep_going {
                break;
            }
            step = if reverse {
                node.step_before(&cursor)
            } else {
                node.step_after(&cursor)
            };
        }

        ctx.callstack.lock().pop();
        if pin && node.unpin() {
            state.borrow_mut().directory.unlink(node);
        }
        keep_going
    }
}

impl<C> Bus<C>
where
    C: BusConfig<AddressId = NoId>,
{
    /// Connects a handler to a single-address bus.
    pub fn connect(handler: HandlerRef<C>) -> Result<(), ConnectError> {
        Self::connect_at(NoId, handler)
    }

    /// Disconnects a handler from a single-address bus.
    pub fn disconnect(handler: &HandlerRef<C>) -> Result<(), DisconnectError> {
        Self::disconnect_from(&NoId, handler)
    }

    /// True if the handler is connected.
    pub fn is_connected(handler: &HandlerRef<C>) -> bool {
        Self::is_connected_at(&NoId, handler)
    }
}

impl<C: WithEventQueue> Bus<C> {
    /// Queues a broadcast for a later [`execute_queued`](Self::execute_queued).
    /// Dropped immediately when the bus has no handlers and no routers.
    pub fn queue_broadcast(event: impl FnMut(&C::Interface) + Send + 'static) {
        Self::queue(QueuedTarget::All, false, event);
    }

    /// Queues a reverse-order broadcast.
    pub fn queue_broadcast_reverse(event: impl FnMut(&C::Interface) + Send + 'static) {
        Self::queue(QueuedTarget::All, true, event);
    }

    /// Queues an addressed dispatch.
    pub fn queue_dispatch(id: C::AddressId, event: impl FnMut(&C::Interface) + Send + 'static) {
        Self::queue(QueuedTarget::Id(id), false, event);
    }

    /// Queues a reverse-order addressed dispatch.
    pub fn queue_dispatch_reverse(
        id: C::AddressId,
        event: impl FnMut(&C::Interface) + Send + 'static,
    ) {
        Self::queue(QueuedTarget::Id(id), true, event);
    }

    /// Queues a dispatch through a cached address.
    pub fn queue_dispatch_cached(
        ptr: &AddressPtr<C>,
        event: impl FnMut(&C::Interface) + Send + 'static,
    ) {
        Self::queue(QueuedTarget::Cached(ptr.clone()), false, event);
    }

    /// Queues a reverse-order dispatch through a cached address.
    pub fn queue_dispatch_cached_reverse(
        ptr: &AddressPtr<C>,
        event: impl FnMut(&C::Interface) + Send + 'static,
    ) {
        Self::queue(QueuedTarget::Cached(ptr.clone()), true, event);
    }

    fn queue(
        target: QueuedTarget<C>,
        reverse: bool,
        event: impl FnMut(&C::Interface) + Send + 'static,
    ) {
        C::Storage::with_context(|ctx| {
            // Nothing will ever see this event: no handlers now and routers
            // are consulted at flush with the same emptiness rule.
            if ctx.handlers_total.load(Ordering::Relaxed) == 0
                && ctx.routers_total.load(Ordering::Relaxed) == 0
            {
                return;
            }
            ctx.events.push(QueuedEvent {
                target,
                reverse,
                invoke: Box::new(event),
            });
        });
    }

    /// Queues a plain closure, flushed after all queued events. Posts made
    /// while function queueing is inactive are dropped with a warning.
    pub fn queue_function(function: impl FnOnce() + Send + 'static) {
        C::Storage::with_context(|ctx| {
            ctx.functions.push(Box::new(function));
        });
    }

    /// Flushes the queues: every queued event in FIFO order, then the
    /// queued functions. Entries queued reentrantly during the flush are
    /// flushed too; events queued by a flushed function are delivered
    /// before the next function runs. A handler that queues on every
    /// delivery can therefore starve the call.
    pub fn execute_queued() {
        C::Storage::with_context(|ctx| loop {
            while let Some(mut message) = ctx.events.pop() {
                let target = match &message.target {
                    QueuedTarget::All => Target::All,
                    QueuedTarget::Id(id) => Target::Id(id),
                    QueuedTarget::Cached(ptr) => Target::Node(&ptr.node),
                };
                Self::deliver(target, message.reverse, true, &mut *message.invoke);
            }
            match ctx.functions.pop() {
                Some(function) => function(),
                None => break,
            }
        });
    }

    /// Discards everything queued without delivering it.
    pub fn clear_queued() {
        C::Storage::with_context(|ctx| {
            ctx.events.clear();
            ctx.functions.clear();
        });
    }

    /// Number of events currently queued.
    pub fn queued_event_count() -> usize {
        C::Storage::with_context(|ctx| ctx.events.len())
    }

    /// Turns function queueing on or off. Defaults to on.
    pub fn set_function_queueing_active(active: bool) {
        C::Storage::with_context(|ctx| ctx.functions.set_active(active));
    }

    /// Whether function queueing is currently accepting posts.
    pub fn is_function_queueing_active() -> bool {
        C::Storage::with_context(|ctx| ctx.functions.is_active())
    }
}
