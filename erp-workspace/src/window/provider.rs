//! Scoped access to the window store
//!
//! UI bindings reach the store through an ambient accessor instead of threading
//! it through every call. The accessor only works inside [`WindowProvider::scope`];
//! calling [`window_store`] anywhere else is a wiring bug and panics.

use std::cell::RefCell;
use std::rc::Rc;

use super::store::WindowStore;

/// Shared handle to the store installed by a provider
pub type SharedWindowStore = Rc<RefCell<WindowStore>>;

thread_local! {
    static CURRENT_STORE: RefCell<Option<SharedWindowStore>> = const { RefCell::new(None) };
}

/// Installs a store for the duration of a closure
pub struct WindowProvider {
    store: SharedWindowStore,
}

impl WindowProvider {
    pub fn new(store: WindowStore) -> Self {
        Self {
            store: Rc::new(RefCell::new(store)),
        }
    }

    pub fn store(&self) -> SharedWindowStore {
        Rc::clone(&self.store)
    }

    /// Run `f` with this provider's store reachable through [`window_store`].
    ///
    /// Scopes nest; the previous store is restored when `f` returns.
    pub fn scope<R>(&self, f: impl FnOnce() -> R) -> R {
        let previous = CURRENT_STORE.with(|slot| slot.replace(Some(self.store())));
        let _restore = RestoreGuard(previous);
        f()
    }
}

struct RestoreGuard(Option<SharedWindowStore>);

impl Drop for RestoreGuard {
    fn drop(&mut self) {
        let previous = self.0.take();
        CURRENT_STORE.with(|slot| {
            slot.replace(previous);
        });
    }
}

/// Store of the enclosing provider, if any
pub fn try_window_store() -> Option<SharedWindowStore> {
    CURRENT_STORE.with(|slot| slot.borrow().clone())
}

/// Store of the enclosing provider.
///
/// # Panics
///
/// Panics when called outside [`WindowProvider::scope`].
pub fn window_store() -> SharedWindowStore {
    try_window_store().expect("window_store() must be used within a WindowProvider")
}
