//! Per-machine named timers.
//!
//! A timer belongs to one machine and is identified by `(machine, name)`.
//! When it expires it submits an event whose trigger is the timer's name,
//! through the same path as any externally submitted event.

use crate::core::Args;
use crate::driver::{Event, MachineId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Receives expired timer events. Drivers install one that submits to themselves.
pub type EventSink = Arc<dyn Fn(Event) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    /// Fire once after the delay
    OneShot,
    /// Fire every `delay` until stopped
    Repeating,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimerError {
    #[error("no tokio runtime available to run timer '{name}' for '{machine}'")]
    NoRuntime { machine: MachineId, name: String },
}

type TimerKey = (MachineId, String);

struct ActiveTimer {
    generation: u64,
    task: JoinHandle<()>,
}

struct TimerInner {
    runtime: Option<Handle>,
    sink: EventSink,
    timers: Mutex<HashMap<TimerKey, ActiveTimer>>,
    generation: AtomicU64,
}

/// Timer registry shared by a driver and the actions it runs.
#[derive(Clone)]
pub struct TimerService {
    inner: Arc<TimerInner>,
}

impl TimerService {
    pub fn new(runtime: Option<Handle>, sink: EventSink) -> Self {
        Self {
            inner: Arc::new(TimerInner {
                runtime,
                sink,
                timers: Mutex::new(HashMap::new()),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// A service without runtime or sink, for exercising actions in isolation.
    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        Self::new(None, Arc::new(|_| {}))
    }

    /// Start the timer, replacing (and restarting) any timer with the same name.
    pub fn start(
        &self,
        machine: &MachineId,
        name: &str,
        delay: Duration,
        mode: TimerMode,
    ) -> Result<(), TimerError> {
        let runtime = self
            .inner
            .runtime
            .as_ref()
            .ok_or_else(|| TimerError::NoRuntime {
                machine: machine.clone(),
                name: name.to_string(),
            })?;

        let key: TimerKey = (machine.clone(), name.to_string());
        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed);
        let weak = Arc::downgrade(&self.inner);

        let mut timers = self.inner.timers.lock();
        let task = runtime.spawn(run_timer(weak, key.clone(), generation, delay, mode));
        if let Some(previous) = timers.insert(key, ActiveTimer { generation, task }) {
            previous.task.abort();
        }
        debug!(machine = %machine, timer = name, ?delay, ?mode, "Timer started");
        Ok(())
    }

    /// Stop the timer. Returns `false` if no such timer was running.
    ///
    /// An expiry already submitted before the stop is still delivered.
    pub fn stop(&self, machine: &MachineId, name: &str) -> bool {
        let key: TimerKey = (machine.clone(), name.to_string());
        match self.inner.timers.lock().remove(&key) {
            Some(timer) => {
                timer.task.abort();
                debug!(machine = %machine, timer = name, "Timer stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self, machine: &MachineId, name: &str) -> bool {
        let key: TimerKey = (machine.clone(), name.to_string());
        self.inner.timers.lock().contains_key(&key)
    }

    /// Number of timers currently running, across all machines.
    pub fn active(&self) -> usize {
        self.inner.timers.lock().len()
    }

    /// Stop every timer.
    pub fn shutdown(&self) {
        for (_, timer) in self.inner.timers.lock().drain() {
            timer.task.abort();
        }
    }
}

async fn run_timer(
    inner: Weak<TimerInner>,
    key: TimerKey,
    generation: u64,
    delay: Duration,
    mode: TimerMode,
) {
    loop {
        tokio::time::sleep(delay).await;

        let Some(service) = inner.upgrade() else {
            return;
        };
        let sink = Arc::clone(&service.sink);
        if mode == TimerMode::OneShot {
            let mut timers = service.timers.lock();
            if timers.get(&key).is_some_and(|t| t.generation == generation) {
                timers.remove(&key);
            }
        }
        drop(service);

        let (machine, name) = &key;
        trace!(machine = %machine, timer = %name, "Timer expired");
        sink(Event::remote(name.clone(), machine.clone(), Args::none()));

        if mode == TimerMode::OneShot {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn channel_service() -> (TimerService, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink: EventSink = Arc::new(move |event| {
            let _ = tx.send(event);
        });
        (TimerService::new(Some(Handle::current()), sink), rx)
    }

    #[tokio::test(start_paused = true)]
    async fn one_shot_timer_fires_once_and_clears() {
        let (timers, mut rx) = channel_service();
        let machine = MachineId::from("m");

        timers
            .start(&machine, "t", Duration::from_millis(100), TimerMode::OneShot)
            .unwrap();
        assert!(timers.is_active(&machine, "t"));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.trigger, "t");
        assert_eq!(event.target, machine);
        assert!(!timers.is_active(&machine, "t"));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn repeating_timer_fires_until_stopped() {
        let (timers, mut rx) = channel_service();
        let machine = MachineId::from("m");

        timers
            .start(&machine, "status", Duration::from_millis(1000), TimerMode::Repeating)
            .unwrap();

        for _ in 0..3 {
            assert_eq!(rx.recv().await.unwrap().trigger, "status");
        }
        assert!(timers.stop(&machine, "status"));
        tokio::time::sleep(Duration::from_millis(5000)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_submitted_before_stop_is_still_delivered() {
        let (timers, mut rx) = channel_service();
        let machine = MachineId::from("m");

        timers
            .start(&machine, "status", Duration::from_millis(1000), TimerMode::Repeating)
            .unwrap();
        tokio::time::sleep(Duration::from_millis(1001)).await;

        assert!(timers.stop(&machine, "status"));
        assert_eq!(rx.try_recv().unwrap().trigger, "status");

        tokio::time::sleep(Duration::from_millis(5000)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn restarting_replaces_the_countdown() {
        let (timers, mut rx) = channel_service();
        let machine = MachineId::from("m");

        timers
            .start(&machine, "t", Duration::from_millis(100), TimerMode::OneShot)
            .unwrap();
        timers
            .start(&machine, "t", Duration::from_millis(300), TimerMode::OneShot)
            .unwrap();
        assert_eq!(timers.active(), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(rx.try_recv().unwrap().trigger, "t");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn stopping_unknown_timer_is_a_no_op() {
        let (timers, _rx) = channel_service();
        assert!(!timers.stop(&MachineId::from("m"), "missing"));
    }

    #[test]
    fn starting_without_runtime_fails() {
        let timers = TimerService::detached();
        let result = timers.start(
            &MachineId::from("m"),
            "t",
            Duration::from_millis(1),
            TimerMode::OneShot,
        );
        assert!(matches!(result, Err(TimerError::NoRuntime { .. })));
    }

    #[tokio::test]
    async fn shutdown_stops_everything() {
        let (timers, _rx) = channel_service();
        let machine = MachineId::from("m");
        timers
            .start(&machine, "a", Duration::from_secs(10), TimerMode::Repeating)
            .unwrap();
        timers
            .start(&machine, "b", Duration::from_secs(10), TimerMode::OneShot)
            .unwrap();

        timers.shutdown();
        assert_eq!(timers.active(), 0);
    }
}
