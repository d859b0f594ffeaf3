//! Handler storage - the per-address subscriber sets.
//!
//! One address on a bus owns one handler set. Three policies exist:
//!
//! - [`SingleHandler`] - at most one handler; a second connect is rejected.
//! - [`UnorderedHandlers`] - any number, dispatch order unspecified.
//! - [`OrderedHandlers`] - any number, dispatched by [`DispatchOrder`] key,
//!   ties broken by connection order (stable).
//!
//! ## Iteration safety
//!
//! Dispatch may trigger reentrant connects and disconnects on the very set
//! being walked, so sets are never iterated with a live iterator. Instead a
//! walker holds the *key* of the entry it last visited and asks the set for
//! the next strictly-greater (or strictly-smaller, in reverse) key after
//! every invocation. A handler removed mid-walk is simply never found again;
//! a handler removed and re-connected during its own invocation gets a fresh
//! key past the end of the walk order and is visited again, exactly like a
//! re-appended list node. Neighbors are never skipped or double-invoked.

mod order;
mod set;

pub use order::DispatchOrder;
pub use set::{HandlerRef, HandlerSet, OrderedHandlers, SingleHandler, UnorderedHandlers};
