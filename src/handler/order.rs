/// Dispatch priority for handlers on an ordered bus.
///
/// Buses whose `Handlers` policy is [`OrderedHandlers`] require the event
/// interface to extend this trait. Lower keys are dispatched first; handlers
/// returning equal keys are dispatched in connection order. The key is read
/// once, at connect time, so it must not change while the handler is
/// connected.
///
/// [`OrderedHandlers`]: crate::OrderedHandlers
pub trait DispatchOrder {
    /// Sort key within one address; lower dispatches first.
    fn dispatch_order(&self) -> i64;
}
