//! `typebus` - a compile-time-configurable typed event bus.
//!
//! A bus is declared, not constructed: a zero-sized config type implements
//! [`BusConfig`], binding an event trait to an addressing policy, a
//! handler-ordering policy, a lock policy, and a storage policy. All calls
//! are associated functions on [`Bus`]; the per-bus singleton context is
//! located through the storage policy on every call.
//!
//! ```
//! use std::sync::Arc;
//! use typebus::{
//!     Bus, BusConfig, GlobalStorage, Reentrant, UnorderedAddresses, UnorderedHandlers,
//! };
//!
//! trait DocEvents {
//!     fn on_saved(&self, path: &str);
//! }
//!
//! struct DocBus;
//!
//! impl BusConfig for DocBus {
//!     type Interface = dyn DocEvents + Send + Sync;
//!     type AddressId = u64;
//!     type Handlers = UnorderedHandlers<Self>;
//!     type Directory = UnorderedAddresses<Self>;
//!     type Lock = Reentrant;
//!     type Storage = GlobalStorage;
//! }
//!
//! struct Logger;
//!
//! impl DocEvents for Logger {
//!     fn on_saved(&self, _path: &str) {}
//! }
//!
//! let logger: Arc<dyn DocEvents + Send + Sync> = Arc::new(Logger);
//! Bus::<DocBus>::connect_at(7, logger.clone()).unwrap();
//! Bus::<DocBus>::dispatch(&7, |h| h.on_saved("notes.txt"));
//! Bus::<DocBus>::broadcast(|h| h.on_saved("all.txt"));
//! Bus::<DocBus>::disconnect_from(&7, &logger).unwrap();
//! # Bus::<DocBus>::reset();
//! ```
//!
//! Beyond immediate dispatch the bus offers reverse and result-capturing
//! delivery, cached address pointers ([`Bus::bind`]), routing interceptors
//! ([`Router`]), and an opt-in deferred queue ([`WithEventQueue`]).

mod address;
mod bus;
mod config;
mod error;
mod handler;
mod sync;

pub use address::{AddressNode, Directory, OrderedAddresses, SingleAddress, UnorderedAddresses};
pub use bus::{AddressPtr, Bus, Connection, Context, RouteInfo, Router, RouterDecision};
pub use config::{BusConfig, BusId, NoId, WithEventQueue};
pub use error::{ConnectError, DisconnectError};
pub use handler::{
    DispatchOrder, HandlerRef, HandlerSet, OrderedHandlers, SingleHandler, UnorderedHandlers,
};
pub use sync::{
    GlobalStorage, Locked, LockPolicy, Reentrant, SingleThreaded, StoragePolicy,
    ThreadLocalStorage,
};
