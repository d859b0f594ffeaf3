//! The bus itself - contexts, dispatch, routing, and queueing.
//!
//! ```text
//!                         Bus::<C> (zero-sized API surface)
//!                                     |
//!                          C::Storage::with_context
//!                                     |
//!                    +----------- Context<C> ------------+
//!                    |                |                  |
//!              C::Lock cell     event queue        function queue
//!                    |
//!          +---- BusState<C> ----+
//!          |                     |
//!    C::Directory          router chain
//!          |
//!    AddressNode ("id" -> handler set, pin count)
//! ```
//!
//! All calls are associated functions on [`Bus`]; there is no bus object to
//! construct or pass around. The context singleton is found through the
//! config's storage policy on every call.

mod connection;
mod context;
mod dispatch;
mod queue;
mod router;

pub use connection::Connection;
pub use context::Context;
pub use dispatch::{AddressPtr, Bus};
pub use router::{RouteInfo, Router, RouterDecision};
