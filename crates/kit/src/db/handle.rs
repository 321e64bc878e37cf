use std::sync::{Arc, Mutex, PoisonError, Weak};

use tracing::{debug, info};

/// A lazily opened connection shared by every [`Database`](super::Database) built from it.
///
/// The slot only keeps a weak reference: the connection closes when the last owner drops it,
/// and the next [`acquire`](Self::acquire) opens a fresh one.
#[derive(Debug)]
pub struct HandleSlot<C> {
    slot: Mutex<Weak<C>>,
}

impl<C> Default for HandleSlot<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> HandleSlot<C> {
    pub const fn new() -> Self {
        Self { slot: Mutex::new(Weak::new()) }
    }

    /// Returns the live handle, or opens one with `connect` if none is alive.
    pub fn acquire<E>(&self, connect: impl FnOnce() -> Result<C, E>) -> Result<Arc<C>, E> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(live) = slot.upgrade() {
            debug!(owners = Arc::strong_count(&live), "reusing database handle");
            return Ok(live);
        }

        let handle = Arc::new(connect()?);
        *slot = Arc::downgrade(&handle);
        info!("database handle opened");
        Ok(handle)
    }

    pub fn is_live(&self) -> bool {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).strong_count() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::HandleSlot;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    static OPENED: AtomicUsize = AtomicUsize::new(0);
    static CLOSED: AtomicUsize = AtomicUsize::new(0);

    struct Counted;

    impl Counted {
        fn open() -> Result<Self, Infallible> {
            OPENED.fetch_add(1, Ordering::SeqCst);
            Ok(Counted)
        }
    }

    impl Drop for Counted {
        fn drop(&mut self) {
            CLOSED.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_handle_is_shared_and_closed_with_last_owner() {
        static SLOT: HandleSlot<Counted> = HandleSlot::new();

        let first = SLOT.acquire(Counted::open).unwrap();
        let second = SLOT.acquire(Counted::open).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(OPENED.load(Ordering::SeqCst), 1);

        drop(first);
        assert!(SLOT.is_live());
        assert_eq!(CLOSED.load(Ordering::SeqCst), 0);

        drop(second);
        assert!(!SLOT.is_live());
        assert_eq!(CLOSED.load(Ordering::SeqCst), 1);

        let _third = SLOT.acquire(Counted::open).unwrap();
        assert_eq!(OPENED.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failed_connect_leaves_slot_empty() {
        let slot: HandleSlot<String> = HandleSlot::new();
        let result = slot.acquire(|| Err::<String, _>("refused"));
        assert_eq!(result.unwrap_err(), "refused");
        assert!(!slot.is_live());
    }
}
