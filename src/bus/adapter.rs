//! Routes decoded bus traffic into a driver.

use super::codec::{decode, ProtocolError};
use super::{Bus, BusError, BusMessage};
use crate::core::Trigger;
use crate::driver::{Driver, Event, MachineId};
use parking_lot::Mutex;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AdapterStats {
    pub delivered: u64,
    pub protocol_errors: u64,
}

#[derive(Default)]
struct Counters {
    delivered: AtomicU64,
    protocol_errors: AtomicU64,
}

/// Decodes payloads for one machine's trigger set and submits them.
struct Route<T> {
    driver: Driver,
    target: MachineId,
    counters: Arc<Counters>,
    _trigger: PhantomData<fn() -> T>,
}

impl<T: Trigger> Route<T> {
    fn deliver(&self, message: &BusMessage) -> Result<(), ProtocolError> {
        match decode::<T>(&message.payload) {
            Ok((trigger, args)) => {
                debug!(
                    topic = %message.topic,
                    machine = %self.target,
                    trigger = trigger.name(),
                    "Inbound message"
                );
                self.counters.delivered.fetch_add(1, Ordering::Relaxed);
                self.driver
                    .submit(Event::remote(trigger.name(), self.target.clone(), args));
                Ok(())
            }
            Err(error) => {
                self.counters.protocol_errors.fetch_add(1, Ordering::Relaxed);
                warn!(
                    topic = %message.topic,
                    machine = %self.target,
                    payload = %String::from_utf8_lossy(&message.payload),
                    error = %error,
                    "Malformed payload dropped"
                );
                Err(error)
            }
        }
    }
}

/// Subscribes a process's inbound topics and forwards what arrives to its driver.
pub struct BusAdapter {
    driver: Driver,
    counters: Arc<Counters>,
    listeners: Mutex<Vec<JoinHandle<()>>>,
}

impl BusAdapter {
    pub fn new(driver: Driver) -> Self {
        Self {
            driver,
            counters: Arc::default(),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn driver(&self) -> &Driver {
        &self.driver
    }

    /// Listen on `filter` and deliver every message to `target`, decoded
    /// against the trigger set `T`. The listener runs on the current tokio
    /// runtime until the subscription ends or the adapter shuts down.
    pub fn route<T: Trigger>(
        &self,
        bus: &dyn Bus,
        filter: &str,
        target: impl Into<MachineId>,
    ) -> Result<(), BusError> {
        let runtime =
            Handle::try_current().map_err(|_| BusError::NoRuntime(filter.to_string()))?;
        let mut subscription = bus.subscribe(filter)?;
        let route = self.route_for::<T>(target.into());

        info!(topic = filter, machine = %route.target, "Listening");
        let listener = runtime.spawn(async move {
            while let Some(message) = subscription.recv().await {
                // malformed payloads are already logged and counted
                let _ = route.deliver(&message);
            }
            debug!(topic = subscription.filter(), "Subscription ended");
        });
        self.listeners.lock().push(listener);
        Ok(())
    }

    /// Decode one message for `target` and submit it, without a listener.
    pub fn deliver<T: Trigger>(
        &self,
        target: impl Into<MachineId>,
        message: &BusMessage,
    ) -> Result<(), ProtocolError> {
        self.route_for::<T>(target.into()).deliver(message)
    }

    pub fn stats(&self) -> AdapterStats {
        AdapterStats {
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            protocol_errors: self.counters.protocol_errors.load(Ordering::Relaxed),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().iter().filter(|l| !l.is_finished()).count()
    }

    /// Stop every listener. The driver is left running.
    pub fn shutdown(&self) {
        for listener in self.listeners.lock().drain(..) {
            listener.abort();
        }
    }

    fn route_for<T: Trigger>(&self, target: MachineId) -> Route<T> {
        Route {
            driver: self.driver.clone(),
            target,
            counters: Arc::clone(&self.counters),
            _trigger: PhantomData,
        }
    }
}

impl Drop for BusAdapter {
    fn drop(&mut self) {
        self.shutdown();
    }
}
