use crate::bus::Bus;
use crate::config::{BusConfig, NoId};
use crate::error::ConnectError;
use crate::handler::HandlerRef;

/// A connection that disconnects on drop.
///
/// Scoped alternative to the manual [`Bus::connect_at`] /
/// [`Bus::disconnect_from`] pair: the handler stays connected exactly as
/// long as the guard lives. Dropping the guard after the bus was reset is
/// harmless; the disconnect just finds nothing.
pub struct Connection<C: BusConfig> {
    id: C::AddressId,
    handler: HandlerRef<C>,
}

impl<C: BusConfig> Connection<C> {
    /// Connects `handler` at `id` and returns the guard keeping it there.
    pub fn open(id: C::AddressId, handler: HandlerRef<C>) -> Result<Self, ConnectError> {
        Bus::<C>::connect_at(id.clone(), handler.clone())?;
        Ok(Connection { id, handler })
    }

    pub fn id(&self) -> &C::AddressId {
        &self.id
    }

    pub fn handler(&self) -> &HandlerRef<C> {
        &self.handler
    }
}

impl<C> Connection<C>
where
    C: BusConfig<AddressId = NoId>,
{
    /// [`open`](Self::open) for single-address buses.
    pub fn open_default(handler: HandlerRef<C>) -> Result<Self, ConnectError> {
        Self::open(NoId, handler)
    }
}

impl<C: BusConfig> Drop for Connection<C> {
    fn drop(&mut self) {
        let _ = Bus::<C>::disconnect_from(&self.id, &self.handler);
    }
}
