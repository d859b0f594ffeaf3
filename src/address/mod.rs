//! Address storage - the id-to-handler-set directory of a bus.
//!
//! Each connected address owns one [`AddressNode`]: the id, the handler set,
//! and a pin count. Nodes are `Arc`-shared so that cached address pointers
//! and in-flight walks keep a node alive independently of the directory.
//!
//! A node is *linked* while the directory maps its id to it. Linking happens
//! on first connect (or on [`Bus::bind`]); unlinking happens when the last
//! handler disconnects, except while a whole-bus walk has the node pinned,
//! in which case the walker unlinks it after unpinning. An unlinked node is
//! invisible to id lookup but stays valid for anyone still holding its `Arc`;
//! dispatch through such a pointer is a no-op.
//!
//! [`Bus::bind`]: crate::Bus::bind

mod directory;
mod node;

pub use directory::{Directory, OrderedAddresses, SingleAddress, UnorderedAddresses};
pub use node::AddressNode;
