//! In-flight guard
//!
//! At most one fetch per tab may be outstanding. A second attempt while one is
//! running is dropped, not queued; the caller re-triggers if it still needs
//! data.

use std::sync::Arc;

use log::debug;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Single-permit semaphore owned by one tab's fetcher
#[derive(Debug, Clone)]
pub struct InFlightGuard {
    semaphore: Arc<Semaphore>,
}

/// Held for the duration of a fetch; dropping it frees the guard
#[derive(Debug)]
pub struct InFlightPermit {
    _permit: OwnedSemaphorePermit,
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl InFlightGuard {
    pub fn new() -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
        }
    }

    /// Claim the guard without waiting; `None` while another fetch runs
    pub fn try_begin(&self) -> Option<InFlightPermit> {
        match self.semaphore.clone().try_acquire_owned() {
            Ok(permit) => Some(InFlightPermit { _permit: permit }),
            Err(_) => {
                debug!("Fetch already in flight, dropping request");
                None
            }
        }
    }

    pub fn is_busy(&self) -> bool {
        self.semaphore.available_permits() == 0
    }
}
