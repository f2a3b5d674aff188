//! Per-process event driver.
//!
//! A [`Driver`] owns a registry of machines and serializes every event
//! addressed to them. Exactly one event is mid-transition at a time, no
//! matter how many threads call [`Driver::send`]: whoever finds the driver
//! idle drains the queue, everyone else only enqueues.
//!
//! Events queued by actions (through [`ActionContext`](crate::engine::ActionContext))
//! form a run-to-completion chain with the event that produced them: the chain
//! is processed to exhaustion before the next externally submitted event.

mod event;

pub use event::{Event, MachineId, Origin};

use crate::core::Args;
use crate::engine::{ActionContext, Machine, TransitionResult};
use crate::timer::{EventSink, TimerService};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DriverError {
    #[error("machine '{0}' is already registered")]
    DuplicateMachine(MachineId),

    #[error("driver '{0}' has been shut down")]
    Closed(String),
}

/// Counters describing what a driver has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DriverStats {
    pub submitted: u64,
    pub processed: u64,
    pub transitions: u64,
    pub handled: u64,
    pub ignored: u64,
    pub rejected: u64,
    pub unknown_target: u64,
    pub panicked: u64,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    processed: AtomicU64,
    transitions: AtomicU64,
    handled: AtomicU64,
    ignored: AtomicU64,
    rejected: AtomicU64,
    unknown_target: AtomicU64,
    panicked: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> DriverStats {
        DriverStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            transitions: self.transitions.load(Ordering::Relaxed),
            handled: self.handled.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            unknown_target: self.unknown_target.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
        }
    }
}

enum Job {
    Start(MachineId),
    Deliver(Event),
}

#[derive(Default)]
struct JobQueue {
    jobs: VecDeque<Job>,
    processing: bool,
}

struct DriverInner {
    name: String,
    machines: Mutex<HashMap<MachineId, Box<dyn Machine>>>,
    queue: Mutex<JobQueue>,
    timers: TimerService,
    stats: Counters,
    closed: AtomicBool,
}

/// Cloneable handle to a driver. All clones share one registry and queue.
#[derive(Clone)]
pub struct Driver {
    inner: Arc<DriverInner>,
}

impl Driver {
    /// Create a driver. Timers run on the current tokio runtime, if any.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_runtime(name, Handle::try_current().ok())
    }

    /// Create a driver whose timers run on `runtime`. Without a runtime,
    /// starting a timer is logged and has no effect.
    pub fn with_runtime(name: impl Into<String>, runtime: Option<Handle>) -> Self {
        let name = name.into();
        let inner = Arc::new_cyclic(|weak: &Weak<DriverInner>| {
            let weak = weak.clone();
            let sink: EventSink = Arc::new(move |event| {
                if let Some(inner) = weak.upgrade() {
                    Driver { inner }.submit(event);
                }
            });
            DriverInner {
                name,
                machines: Mutex::new(HashMap::new()),
                queue: Mutex::new(JobQueue::default()),
                timers: TimerService::new(runtime, sink),
                stats: Counters::default(),
                closed: AtomicBool::new(false),
            }
        });
        Self { inner }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Register a machine and fire its initial transition ahead of any
    /// queued event. If another thread is draining, the initial transition
    /// runs as soon as that thread's current chain completes.
    pub fn register<M: Machine>(&self, machine: M) -> Result<(), DriverError> {
        if self.is_closed() {
            return Err(DriverError::Closed(self.inner.name.clone()));
        }
        let id = machine.id().clone();
        {
            let mut machines = self.inner.machines.lock();
            if machines.contains_key(&id) {
                return Err(DriverError::DuplicateMachine(id));
            }
            machines.insert(id.clone(), Box::new(machine));
        }
        debug!(driver = %self.inner.name, machine = %id, "Machine registered");
        self.enqueue(Job::Start(id), true);
        Ok(())
    }

    /// Submit `trigger` for machine `target` from outside the driver.
    pub fn send(&self, trigger: &str, target: impl Into<MachineId>, args: Args) {
        self.submit(Event::remote(trigger, target, args));
    }

    /// Submit a prepared event. Returns once the event is processed, or at
    /// once if another thread is already draining the queue.
    pub fn submit(&self, event: Event) {
        if self.is_closed() {
            debug!(
                driver = %self.inner.name,
                trigger = %event.trigger,
                target = %event.target,
                "Driver closed, event dropped"
            );
            return;
        }
        Counters::bump(&self.inner.stats.submitted);
        self.enqueue(Job::Deliver(event), false);
    }

    /// Current state name of a registered machine.
    pub fn state_of(&self, id: &str) -> Option<&'static str> {
        self.inner.machines.lock().get(id).map(|m| m.state_name())
    }

    /// Read access to a registered machine of concrete type `M`.
    ///
    /// Must not be called from inside an action running on this driver.
    pub fn inspect<M, R>(&self, id: &str, f: impl FnOnce(&M) -> R) -> Option<R>
    where
        M: Machine,
    {
        let machines = self.inner.machines.lock();
        machines
            .get(id)
            .and_then(|machine| machine.as_any().downcast_ref::<M>())
            .map(f)
    }

    pub fn machine_ids(&self) -> Vec<MachineId> {
        self.inner.machines.lock().keys().cloned().collect()
    }

    pub fn stats(&self) -> DriverStats {
        self.inner.stats.snapshot()
    }

    pub fn timers(&self) -> &TimerService {
        &self.inner.timers
    }

    /// True when nothing is queued or being processed.
    pub fn is_idle(&self) -> bool {
        let queue = self.inner.queue.lock();
        !queue.processing && queue.jobs.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Stop all timers and refuse further events. Queued events are discarded.
    pub fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.timers.shutdown();
        let discarded = {
            let mut queue = self.inner.queue.lock();
            let discarded = queue.jobs.len();
            queue.jobs.clear();
            discarded
        };
        info!(driver = %self.inner.name, discarded, "Driver shut down");
    }

    fn enqueue(&self, job: Job, front: bool) {
        {
            let mut queue = self.inner.queue.lock();
            if front {
                queue.jobs.push_front(job);
            } else {
                queue.jobs.push_back(job);
            }
            if queue.processing {
                return;
            }
            queue.processing = true;
        }
        self.drain();
    }

    fn drain(&self) {
        loop {
            let job = {
                let mut queue = self.inner.queue.lock();
                match queue.jobs.pop_front() {
                    Some(job) if !self.is_closed() => job,
                    _ => {
                        queue.jobs.clear();
                        queue.processing = false;
                        return;
                    }
                }
            };
            self.run_to_completion(job);
        }
    }

    fn run_to_completion(&self, job: Job) {
        let mut chain = VecDeque::new();
        match job {
            Job::Start(id) => self.guarded(&id, |driver| driver.start(&id, &mut chain)),
            Job::Deliver(event) => chain.push_back(event),
        }
        while let Some(event) = chain.pop_front() {
            let target = event.target.clone();
            self.guarded(&target, |driver| driver.dispatch(event, &mut chain));
        }
    }

    /// Run one step, containing any panic raised by an action so the driver
    /// keeps serving other events.
    fn guarded(&self, machine: &MachineId, step: impl FnOnce(&Self)) {
        if catch_unwind(AssertUnwindSafe(|| step(self))).is_err() {
            Counters::bump(&self.inner.stats.panicked);
            error!(
                driver = %self.inner.name,
                machine = %machine,
                "Action panicked; event abandoned"
            );
        }
    }

    fn start(&self, id: &MachineId, chain: &mut VecDeque<Event>) {
        let mut machines = self.inner.machines.lock();
        let Some(machine) = machines.get_mut(id) else {
            return;
        };
        let mut ctx = ActionContext::new(id, chain, &self.inner.timers);
        let result = machine.start(&mut ctx);
        if let TransitionResult::Transitioned { to, .. } = result {
            info!(
                driver = %self.inner.name,
                machine = %id,
                state = to,
                "Machine started"
            );
        }
    }

    fn dispatch(&self, event: Event, chain: &mut VecDeque<Event>) {
        let stats = &self.inner.stats;
        let mut machines = self.inner.machines.lock();
        let Some(machine) = machines.get_mut(&event.target) else {
            Counters::bump(&stats.unknown_target);
            warn!(
                driver = %self.inner.name,
                trigger = %event.trigger,
                target = %event.target,
                origin = ?event.origin,
                "Event addressed to unknown machine dropped"
            );
            return;
        };

        let mut ctx = ActionContext::new(&event.target, chain, &self.inner.timers);
        let result = machine.fire(&event.trigger, &event.args, &mut ctx);
        Counters::bump(&stats.processed);

        match result {
            TransitionResult::Transitioned { from, to } => {
                Counters::bump(&stats.transitions);
                info!(
                    machine = %event.target,
                    trigger = %event.trigger,
                    from,
                    to,
                    "Transition"
                );
            }
            TransitionResult::Handled { state } => {
                Counters::bump(&stats.handled);
                debug!(
                    machine = %event.target,
                    trigger = %event.trigger,
                    state,
                    "Handled in state"
                );
            }
            TransitionResult::Ignored { state } => {
                Counters::bump(&stats.ignored);
                debug!(
                    machine = %event.target,
                    trigger = %event.trigger,
                    state,
                    "Trigger ignored in state"
                );
            }
            TransitionResult::Rejected { .. } => {
                Counters::bump(&stats.rejected);
            }
        }
    }
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("name", &self.inner.name)
            .field("stats", &self.stats())
            .finish()
    }
}
