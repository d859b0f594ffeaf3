use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::trace;

use crate::bus::Context;
use crate::config::BusConfig;

/// Where the per-bus-type context singleton lives.
///
/// Contexts are created lazily on first use and torn down by
/// [`reset`](Self::reset); the next use after a reset builds a fresh one.
/// Anything still holding a piece of the old context (a cached address
/// pointer, a running walk) keeps that piece alive but invisible to the new
/// context.
pub trait StoragePolicy<C: BusConfig>: 'static {
    /// Runs `f` against the context, creating it on first use.
    fn with_context<R>(f: impl FnOnce(&Context<C>) -> R) -> R;

    /// Tears the context down. Test-oriented; not intended for concurrent
    /// use with live dispatch.
    fn reset();
}

/// One context per bus type per process.
///
/// Backed by a process-wide `TypeId -> Arc<dyn Any>` registry; requires the
/// context to be `Send + Sync`, which rules out `SingleThreaded` buses.
pub struct GlobalStorage;

static GLOBAL_CONTEXTS: Lazy<RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

impl<C: BusConfig> StoragePolicy<C> for GlobalStorage
where
    Context<C>: Send + Sync,
{
    fn with_context<R>(f: impl FnOnce(&Context<C>) -> R) -> R {
        let key = TypeId::of::<C>();
        let entry = GLOBAL_CONTEXTS.read().get(&key).cloned();
        let entry = match entry {
            Some(entry) => entry,
            None => GLOBAL_CONTEXTS
                .write()
                .entry(key)
                .or_insert_with(|| {
                    trace!(bus = std::any::type_name::<C>(), "creating global bus context");
                    Arc::new(Context::<C>::new())
                })
                .clone(),
        };
        // The registry guard is dropped before `f` runs, so dispatch inside
        // `f` may create other buses' contexts without deadlocking.
        let context = entry
            .downcast::<Context<C>>()
            .ok()
            .expect("context registry entries are keyed by their own TypeId");
        f(&context)
    }

    fn reset() {
        if GLOBAL_CONTEXTS.write().remove(&TypeId::of::<C>()).is_some() {
            trace!(bus = std::any::type_name::<C>(), "global bus context torn down");
        }
    }
}

/// One context per bus type per thread.
///
/// Each thread that touches the bus gets its own independent directory,
/// routers, and queues. The only storage choice for `SingleThreaded` buses,
/// whose contexts are `!Sync`.
pub struct ThreadLocalStorage;

thread_local! {
    static LOCAL_CONTEXTS: RefCell<HashMap<TypeId, Rc<dyn Any>>> = RefCell::new(HashMap::new());
}

impl<C: BusConfig> StoragePolicy<C> for ThreadLocalStorage {
    fn with_context<R>(f: impl FnOnce(&Context<C>) -> R) -> R {
        let key = TypeId::of::<C>();
        let entry = LOCAL_CONTEXTS.with(|contexts| {
            contexts
                .borrow_mut()
                .entry(key)
                .or_insert_with(|| {
                    trace!(
                        bus = std::any::type_name::<C>(),
                        "creating thread-local bus context"
                    );
                    Rc::new(Context::<C>::new())
                })
                .clone()
        });
        let context = entry
            .downcast::<Context<C>>()
            .ok()
            .expect("context registry entries are keyed by their own TypeId");
        f(&context)
    }

    fn reset() {
        let removed =
            LOCAL_CONTEXTS.with(|contexts| contexts.borrow_mut().remove(&TypeId::of::<C>()));
        if removed.is_some() {
            trace!(
                bus = std::any::type_name::<C>(),
                "thread-local bus context torn down"
            );
        }
    }
}
