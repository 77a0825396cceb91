//! Global bus plus lazily created named buses.

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use tracing::{error, info};

use crate::bus::EventBus;
use crate::error::EventResult;
use crate::event::Event;
use crate::handler::SharedHandler;

const GLOBAL_BUS_NAME: &str = "global";

/// Snapshot of the manager's buses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManagerStats {
    /// Number of named buses (the global bus is not counted)
    pub total_buses: usize,
    /// Event types with subscribers per named bus
    pub buses: BTreeMap<String, Vec<String>>,
    /// Event types with subscribers on the global bus
    pub global_bus: Vec<String>,
}

/// Holds the global bus and any number of named buses.
#[derive(Debug)]
pub struct EventBusManager {
    global: EventBus,
    buses: RwLock<HashMap<String, EventBus>>,
    closed: AtomicBool,
}

impl Default for EventBusManager {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBusManager {
    /// Create a manager with an empty global bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            global: EventBus::new(GLOBAL_BUS_NAME),
            buses: RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// The global bus.
    #[must_use]
    pub const fn global(&self) -> &EventBus {
        &self.global
    }

    /// Named bus, created on first access.
    #[must_use]
    pub fn bus(&self, name: &str) -> EventBus {
        if let Some(bus) = self.buses.read().get(name) {
            return bus.clone();
        }
        let mut buses = self.buses.write();
        buses
            .entry(name.to_string())
            .or_insert_with(|| {
                info!(bus = %name, "Created new event bus");
                EventBus::new(name)
            })
            .clone()
    }

    /// Publish to a named bus.
    ///
    /// # Errors
    ///
    /// Propagates [`EventBus::publish`] errors.
    pub async fn publish(&self, bus_name: &str, event: &Event) -> EventResult {
        self.bus(bus_name).publish(event).await
    }

    /// Publish to the global bus.
    ///
    /// # Errors
    ///
    /// Propagates [`EventBus::publish`] errors.
    pub async fn publish_global(&self, event: &Event) -> EventResult {
        self.global.publish(event).await
    }

    /// Subscribe on a named bus.
    ///
    /// # Errors
    ///
    /// Propagates [`EventBus::subscribe`] errors.
    pub fn subscribe(
        &self,
        bus_name: &str,
        event_type: impl Into<String>,
        handler: SharedHandler,
    ) -> EventResult {
        self.bus(bus_name).subscribe(event_type, handler)
    }

    /// Subscribe on the global bus.
    ///
    /// # Errors
    ///
    /// Propagates [`EventBus::subscribe`] errors.
    pub fn subscribe_global(&self, event_type: impl Into<String>, handler: SharedHandler) -> EventResult {
        self.global.subscribe(event_type, handler)
    }

    /// Close every bus. Calling it again is a no-op.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let buses: Vec<(String, EventBus)> = self.buses.write().drain().collect();
        for (name, bus) in buses {
            if let Err(e) = bus.close() {
                error!(bus = %name, error = %e, "Error closing bus");
            }
        }
        if let Err(e) = self.global.close() {
            error!(error = %e, "Error closing global bus");
        }
        info!("Event bus manager closed");
    }

    /// Event types per bus.
    #[must_use]
    pub fn stats(&self) -> ManagerStats {
        let buses = self.buses.read();
        ManagerStats {
            total_buses: buses.len(),
            buses: buses
                .iter()
                .map(|(name, bus)| (name.clone(), bus.event_types()))
                .collect(),
            global_bus: self.global.event_types(),
        }
    }
}

/// Process-wide manager, created on first use.
pub fn global_manager() -> &'static EventBusManager {
    static MANAGER: OnceLock<EventBusManager> = OnceLock::new();
    MANAGER.get_or_init(EventBusManager::new)
}
