//! Event callback registry
//!
//! Subscribers register once and are invoked, in registration order, with every
//! raw event the radio delivers. Unsubscription is not supported.

use std::sync::Arc;

use parking_lot::RwLock;
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::errors::{BleError, Result};
use crate::event::RawEvent;

/// Default number of subscriber slots
pub const DEFAULT_REGISTRY_CAPACITY: usize = 10;

/// Receiver of raw radio events, called on the event thread
pub trait EventHandler: Send + Sync {
    fn on_event(&self, event: &RawEvent<'_>);
}

impl<F> EventHandler for F
where
    F: Fn(&RawEvent<'_>) + Send + Sync,
{
    fn on_event(&self, event: &RawEvent<'_>) {
        self(event)
    }
}

type HandlerList = SmallVec<[Arc<dyn EventHandler>; DEFAULT_REGISTRY_CAPACITY]>;

/// Fixed-capacity, append-only list of event handlers
pub struct CallbackRegistry {
    handlers: RwLock<HandlerList>,
    capacity: usize,
}

impl CallbackRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            handlers: RwLock::new(HandlerList::new()),
            capacity,
        }
    }

    /// Append a handler
    ///
    /// Fails with [`BleError::RegistryFull`] once `capacity` handlers are registered;
    /// the registry is unchanged in that case.
    pub fn register(&self, handler: Arc<dyn EventHandler>) -> Result<()> {
        let mut handlers = self.handlers.write();
        if handlers.len() >= self.capacity {
            warn!("Event handler registry full ({} slots)", self.capacity);
            return Err(BleError::RegistryFull {
                capacity: self.capacity,
            });
        }

        handlers.push(handler);
        debug!("Registered event handler {}/{}", handlers.len(), self.capacity);
        Ok(())
    }

    /// Invoke every handler with `event`, in registration order
    pub fn dispatch(&self, event: &RawEvent<'_>) {
        // Snapshot so handlers run without the lock held
        let handlers: HandlerList = self.handlers.read().iter().cloned().collect();
        for handler in &handlers {
            handler.on_event(event);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY_CAPACITY)
    }
}

impl core::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
