use std::cell::RefCell;

use parking_lot::{Mutex, ReentrantMutex};

/// How the mutable bus state (directory + router chain) is guarded.
///
/// Every policy hands the closure a `&RefCell` rather than a `&mut`: the
/// dispatch engine takes short borrows around individual directory
/// operations and drops them before invoking any handler, so reentrant
/// calls from inside a handler can re-borrow. Holding the lock across the
/// whole dispatch (rather than per-borrow) is what makes a concurrent
/// disconnect wait for the walk to finish under [`Locked`] and
/// [`Reentrant`].
pub trait LockPolicy: 'static {
    type Cell<T: 'static>: 'static;

    fn new_cell<T: 'static>(value: T) -> Self::Cell<T>;

    fn with<T: 'static, R>(cell: &Self::Cell<T>, f: impl FnOnce(&RefCell<T>) -> R) -> R;
}

/// No lock at all.
///
/// The cell is a bare `RefCell`, so the context is `!Sync` and the compiler
/// confines the bus to one thread. Pairs with
/// [`ThreadLocalStorage`](crate::ThreadLocalStorage) only.
pub struct SingleThreaded;

impl LockPolicy for SingleThreaded {
    type Cell<T: 'static> = RefCell<T>;

    fn new_cell<T: 'static>(value: T) -> RefCell<T> {
        RefCell::new(value)
    }

    fn with<T: 'static, R>(cell: &RefCell<T>, f: impl FnOnce(&RefCell<T>) -> R) -> R {
        f(cell)
    }
}

/// Plain mutual exclusion, not reentrant.
///
/// Dispatching from inside a handler of the same bus deadlocks; that is the
/// documented contract of choosing this policy over [`Reentrant`], in
/// exchange for the cheaper lock.
pub struct Locked;

impl LockPolicy for Locked {
    type Cell<T: 'static> = Mutex<RefCell<T>>;

    fn new_cell<T: 'static>(value: T) -> Mutex<RefCell<T>> {
        Mutex::new(RefCell::new(value))
    }

    fn with<T: 'static, R>(cell: &Mutex<RefCell<T>>, f: impl FnOnce(&RefCell<T>) -> R) -> R {
        let guard = cell.lock();
        f(&*guard)
    }
}

/// Mutual exclusion that the owning thread may re-acquire.
///
/// The policy for buses whose handlers dispatch, connect, or disconnect on
/// the same bus from inside an event.
pub struct Reentrant;

impl LockPolicy for Reentrant {
    type Cell<T: 'static> = ReentrantMutex<RefCell<T>>;

    fn new_cell<T: 'static>(value: T) -> ReentrantMutex<RefCell<T>> {
        ReentrantMutex::new(RefCell::new(value))
    }

    fn with<T: 'static, R>(
        cell: &ReentrantMutex<RefCell<T>>,
        f: impl FnOnce(&RefCell<T>) -> R,
    ) -> R {
        let guard = cell.lock();
        f(&*guard)
    }
}
