//! Bus configuration - the compile-time policy binding for a bus type.
//!
//! A bus type is one implementation of [`BusConfig`]: a unit struct that
//! binds an event interface to an addressing policy, a handler-set policy,
//! a lock policy, and a storage policy. Every distinct `BusConfig`
//! implementation gets its own process-wide (or thread-wide) context, so the
//! configuration below defines three completely independent buses:
//!
//! ```ignore
//! trait DocEvents { fn on_saved(&self, path: &str); }
//!
//! struct DocBus;
//! impl BusConfig for DocBus {
//!     type Interface = dyn DocEvents + Send + Sync;
//!     type AddressId = u64;                        // one address per document
//!     type Handlers = UnorderedHandlers<Self>;     // any number of observers
//!     type Directory = UnorderedAddresses<Self>;   // hash-map addressing
//!     type Lock = Reentrant;                       // handlers may re-enter
//!     type Storage = GlobalStorage;                // one bus per process
//! }
//! impl WithEventQueue for DocBus {}                // opt in to queueing
//! ```
//!
//! All policy selection happens at compile time; the dispatch paths are
//! monomorphized per bus type and carry no dynamic policy dispatch.

use std::fmt::Debug;
use std::hash::Hash;

use crate::address::Directory;
use crate::handler::HandlerSet;
use crate::sync::{LockPolicy, StoragePolicy};

/// Requirements on an address-id type.
///
/// Ordered directories additionally require `Ord`; the id type's `Ord` impl
/// *is* the bus's address ordering, so a custom delivery order is expressed
/// as a newtype with a custom `Ord`.
pub trait BusId: Clone + Eq + Hash + Debug + 'static {}

impl<T: Clone + Eq + Hash + Debug + 'static> BusId for T {}

/// The address id of a single-address bus.
///
/// Single-address buses have exactly one implicit address; `NoId` is the
/// placeholder key for it. [`Bus::connect`] and the keyless dispatch calls
/// are only available when `AddressId = NoId`.
///
/// [`Bus::connect`]: crate::Bus::connect
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoId;

/// Compile-time configuration of one bus type.
///
/// Implementations are zero-sized marker structs; the bus never instantiates
/// them. The associated types select the storage and concurrency policies:
///
/// - `Interface` - the event trait object handlers implement. For buses
///   stored in [`GlobalStorage`] it must be `Send + Sync` (write
///   `dyn MyEvents + Send + Sync`); thread-local buses may use plain
///   `dyn MyEvents`.
/// - `AddressId` - the key type addressing handler subsets, or [`NoId`]
///   for single-address buses.
/// - `Handlers` - how many handlers one address holds and in what order:
///   [`SingleHandler`], [`UnorderedHandlers`], or [`OrderedHandlers`].
/// - `Directory` - how addresses are stored: [`SingleAddress`],
///   [`UnorderedAddresses`], or [`OrderedAddresses`].
/// - `Lock` - the context lock: [`SingleThreaded`], [`Locked`], or
///   [`Reentrant`]. With `Locked`, same-thread reentrant use of the same
///   bus deadlocks; that is a documented contract of the configuration,
///   not a bug, and the bus never upgrades the lock behind your back.
/// - `Storage` - where the context singleton lives: [`GlobalStorage`]
///   (one per process) or [`ThreadLocalStorage`] (one per thread; the only
///   choice for `SingleThreaded` buses, whose context is `!Sync`).
///
/// [`SingleHandler`]: crate::SingleHandler
/// [`UnorderedHandlers`]: crate::UnorderedHandlers
/// [`OrderedHandlers`]: crate::OrderedHandlers
/// [`SingleAddress`]: crate::SingleAddress
/// [`UnorderedAddresses`]: crate::UnorderedAddresses
/// [`OrderedAddresses`]: crate::OrderedAddresses
/// [`SingleThreaded`]: crate::SingleThreaded
/// [`Locked`]: crate::Locked
/// [`Reentrant`]: crate::Reentrant
/// [`GlobalStorage`]: crate::GlobalStorage
/// [`ThreadLocalStorage`]: crate::ThreadLocalStorage
pub trait BusConfig: Sized + 'static {
    /// The event interface handlers implement.
    type Interface: ?Sized + 'static;
    /// The type that addresses handler subsets on the bus.
    type AddressId: BusId;
    /// Handler storage at one address.
    type Handlers: HandlerSet<Self>;
    /// Address storage for the whole bus.
    type Directory: Directory<Self>;
    /// The context lock kind.
    type Lock: LockPolicy;
    /// Where the per-bus-type context singleton lives.
    type Storage: StoragePolicy<Self>;
}

/// Marker trait enabling the queue subsystem for a bus type.
///
/// The queueing calls (`queue_broadcast`, `queue_dispatch`, `queue_function`,
/// `execute_queued`, ...) only exist on buses whose config implements this
/// marker, so queueing on a non-queued bus is a compile error rather than a
/// runtime one.
pub trait WithEventQueue: BusConfig {}
