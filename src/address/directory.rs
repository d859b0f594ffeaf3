use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::address::AddressNode;
use crate::config::BusConfig;

/// Address storage for a whole bus.
///
/// `unlink` removes the mapping only if the given node is still the mapped
/// one; a stale unlink of a node that was already replaced under the same id
/// is a no-op.
pub trait Directory<C: BusConfig>: Default + 'static {
    fn find(&self, id: &C::AddressId) -> Option<Arc<AddressNode<C>>>;

    fn get_or_create(&mut self, id: &C::AddressId) -> Arc<AddressNode<C>>;

    fn unlink(&mut self, node: &Arc<AddressNode<C>>);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all linked nodes in forward delivery order. The returned
    /// `Arc`s keep the nodes alive across directory mutations.
    fn nodes(&self) -> Vec<Arc<AddressNode<C>>>;
}

/// Exactly one implicit address; lookups ignore the id.
///
/// The policy for single-address buses (`AddressId = NoId`), though any id
/// type works: whichever id reaches `get_or_create` first names the node.
pub struct SingleAddress<C: BusConfig> {
    node: Option<Arc<AddressNode<C>>>,
}

impl<C: BusConfig> Default for SingleAddress<C> {
    fn default() -> Self {
        SingleAddress { node: None }
    }
}

impl<C: BusConfig> Directory<C> for SingleAddress<C> {
    fn find(&self, _id: &C::AddressId) -> Option<Arc<AddressNode<C>>> {
        self.node.clone()
    }

    fn get_or_create(&mut self, id: &C::AddressId) -> Arc<AddressNode<C>> {
        self.node
            .get_or_insert_with(|| AddressNode::new(id.clone()))
            .clone()
    }

    fn unlink(&mut self, node: &Arc<AddressNode<C>>) {
        if let Some(current) = &self.node {
            if Arc::ptr_eq(current, node) {
                self.node = None;
            }
        }
    }

    fn len(&self) -> usize {
        usize::from(self.node.is_some())
    }

    fn nodes(&self) -> Vec<Arc<AddressNode<C>>> {
        self.node.clone().into_iter().collect()
    }
}

/// Hash-map addressing; broadcast visits addresses in unspecified order.
pub struct UnorderedAddresses<C: BusConfig> {
    map: HashMap<C::AddressId, Arc<AddressNode<C>>>,
}

impl<C: BusConfig> Default for UnorderedAddresses<C> {
    fn default() -> Self {
        UnorderedAddresses {
            map: HashMap::new(),
        }
    }
}

impl<C: BusConfig> Directory<C> for UnorderedAddresses<C> {
    fn find(&self, id: &C::AddressId) -> Option<Arc<AddressNode<C>>> {
        self.map.get(id).cloned()
    }

    fn get_or_create(&mut self, id: &C::AddressId) -> Arc<AddressNode<C>> {
        self.map
            .entry(id.clone())
            .or_insert_with(|| AddressNode::new(id.clone()))
            .clone()
    }

    fn unlink(&mut self, node: &Arc<AddressNode<C>>) {
        if let Some(current) = self.map.get(node.id()) {
            if Arc::ptr_eq(current, node) {
                self.map.remove(node.id());
            }
        }
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn nodes(&self) -> Vec<Arc<AddressNode<C>>> {
        self.map.values().cloned().collect()
    }
}

/// Tree addressing; broadcast visits addresses in ascending id order.
///
/// The id type's `Ord` impl is the delivery order across addresses.
pub struct OrderedAddresses<C: BusConfig>
where
    C::AddressId: Ord,
{
    map: BTreeMap<C::AddressId, Arc<AddressNode<C>>>,
}

impl<C: BusConfig> Default for OrderedAddresses<C>
where
    C::AddressId: Ord,
{
    fn default() -> Self {
        OrderedAddresses {
            map: BTreeMap::new(),
        }
    }
}

impl<C: BusConfig> Directory<C> for OrderedAddresses<C>
where
    C::AddressId: Ord,
{
    fn find(&self, id: &C::AddressId) -> Option<Arc<AddressNode<C>>> {
        self.map.get(id).cloned()
    }

    fn get_or_create(&mut self, id: &C::AddressId) -> Arc<AddressNode<C>> {
        self.map
            .entry(id.clone())
            .or_insert_with(|| AddressNode::new(id.clone()))
            .clone()
    }

    fn unlink(&mut self, node: &Arc<AddressNode<C>>) {
        if let Some(current) = self.map.get(node.id()) {
            if Arc::ptr_eq(current, node) {
                self.map.remove(node.id());
            }
        }
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn nodes(&self) -> Vec<Arc<AddressNode<C>>> {
        self.map.values().cloned().collect()
    }
}
