//! Concurrency policies - how a bus context is locked and where it lives.
//!
//! The two policy families compose freely, with one compile-time-enforced
//! exception: a [`SingleThreaded`] context contains a bare `RefCell` and is
//! therefore `!Sync`, which rules out [`GlobalStorage`] (its registry
//! requires `Send + Sync` contexts). The combination simply does not
//! implement the storage trait, so misuse fails at the type level.
//!
//! ```text
//!                 GlobalStorage      ThreadLocalStorage
//! SingleThreaded       -                   yes
//! Locked              yes                  yes
//! Reentrant           yes                  yes
//! ```

mod lock;
mod storage;

pub use lock::{Locked, LockPolicy, Reentrant, SingleThreaded};
pub use storage::{GlobalStorage, StoragePolicy, ThreadLocalStorage};
