use std::any::{Any, TypeId};
use std::cell::Cell;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::process::Suspension;
use crate::{Clock, ComponentId, Outcome, ProcessId, Resume};

/// Identifies a single scheduled event, so that it can be cancelled before it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventHandle(u64);

/// Entry type stored in the scheduler, including the event value, component ID, and the time when
/// it is supposed to occur.
///
/// Entries are ordered by time, and entries occurring at the same time by the order in which they
/// were scheduled.
#[derive(Debug)]
pub struct EventEntry {
    time: Reverse<Duration>,
    sequence: Reverse<u64>,
    component: usize,
    inner: Box<dyn Any>,
    event_type: TypeId,
    process: Option<ProcessId>,
}

impl EventEntry {
    /// Tries to downcast the event entry to one holding an event of type `E`.
    /// If fails, returns `None`.
    #[must_use]
    pub fn downcast<E: fmt::Debug + 'static>(&self) -> Option<EventEntryTyped<'_, E>> {
        if self.event_type == TypeId::of::<E>() {
            self.inner
                .downcast_ref::<E>()
                .map(|event| EventEntryTyped {
                    time: self.time.0,
                    component_id: ComponentId::new(self.component),
                    component_idx: self.component,
                    event,
                })
        } else {
            None
        }
    }

    /// The time at which the event occurs.
    #[must_use]
    pub fn time(&self) -> Duration {
        self.time.0
    }

    /// The handle under which the event was scheduled.
    #[must_use]
    pub fn handle(&self) -> EventHandle {
        EventHandle(self.sequence.0)
    }

    /// Index of the component the event is meant for.
    #[must_use]
    pub fn component_idx(&self) -> usize {
        self.component
    }
}

impl PartialEq for EventEntry {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.sequence == other.sequence
    }
}

impl Eq for EventEntry {}

impl PartialOrd for EventEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.time, self.sequence).cmp(&(other.time, other.sequence))
    }
}

/// Event entry with the event downcast to its concrete type.
#[derive(Debug)]
pub struct EventEntryTyped<'e, E: fmt::Debug> {
    /// The time of the event.
    pub time: Duration,
    /// The receiving component.
    pub component_id: ComponentId<E>,
    /// Index of the receiving component.
    pub component_idx: usize,
    /// The event itself.
    pub event: &'e E,
}

/// Trait implemented by objects maintaining the current simulation time.
pub trait Time {
    /// Return the current simulation time.
    fn time(&self) -> Duration;
}

/// This struct has only immutable access to the simulation clock exposed.
#[derive(Clone)]
pub struct ClockRef {
    clock: Clock,
}

impl From<Clock> for ClockRef {
    fn from(clock: Clock) -> Self {
        Self { clock }
    }
}

impl Time for ClockRef {
    fn time(&self) -> Duration {
        self.clock.get()
    }
}

impl ClockRef {
    /// Return the current simulation time.
    #[must_use]
    pub fn time(&self) -> Duration {
        self.clock.get()
    }
}

/// Scheduler is used to keep the current time and information about the upcoming events.
///
/// The clock only moves forward: it is set to the time of each dispatched event, and events can
/// only be scheduled with non-negative delays.
pub struct Scheduler {
    events: BinaryHeap<EventEntry>,
    clock: Clock,
    next_sequence: u64,
    pending: HashSet<u64>,
    suspended: HashMap<ProcessId, Suspension>,
    next_process: usize,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            events: BinaryHeap::new(),
            clock: Rc::new(Cell::new(Duration::default())),
            next_sequence: 0,
            pending: HashSet::new(),
            suspended: HashMap::new(),
            next_process: 0,
        }
    }
}

impl Time for Scheduler {
    fn time(&self) -> Duration {
        self.clock.get()
    }
}

impl Scheduler {
    fn push(
        &mut self,
        delay: Duration,
        component: usize,
        inner: Box<dyn Any>,
        event_type: TypeId,
        process: Option<ProcessId>,
    ) -> EventHandle {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.pending.insert(sequence);
        self.events.push(EventEntry {
            time: Reverse(self.time().saturating_add(delay)),
            sequence: Reverse(sequence),
            component,
            inner,
            event_type,
            process,
        });
        EventHandle(sequence)
    }

    /// Schedules `event` to be executed for `component` at `self.time() + delay`.
    pub fn schedule<E: 'static>(
        &mut self,
        delay: Duration,
        component: ComponentId<E>,
        event: E,
    ) -> EventHandle {
        self.push(
            delay,
            component.id,
            Box::new(event),
            TypeId::of::<E>(),
            None,
        )
    }

    /// Schedules `event` to be executed for `component` at `self.time()`.
    pub fn schedule_immediately<E: 'static>(
        &mut self,
        component: ComponentId<E>,
        event: E,
    ) -> EventHandle {
        self.schedule(Duration::default(), component, event)
    }

    /// Cancels a scheduled event. Returns `false` if the event has already been dispatched or
    /// cancelled, in which case nothing happens.
    pub fn cancel(&mut self, handle: EventHandle) -> bool {
        self.pending.remove(&handle.0)
    }

    /// Checks if the event is still waiting to be dispatched.
    #[must_use]
    pub fn is_pending(&self, handle: EventHandle) -> bool {
        self.pending.contains(&handle.0)
    }

    /// Returns the current simulation time.
    #[must_use]
    pub fn time(&self) -> Duration {
        self.clock.get()
    }

    /// Returns a structure with immutable access to the simulation time.
    #[must_use]
    pub fn clock(&self) -> ClockRef {
        ClockRef {
            clock: Rc::clone(&self.clock),
        }
    }

    /// Number of events waiting to be dispatched.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.pending.len()
    }

    /// Moves the clock forward to `time`. Does nothing if `time` is in the past.
    pub(crate) fn advance_to(&mut self, time: Duration) {
        if time > self.time() {
            self.clock.set(time);
        }
    }

    fn discard_cancelled(&mut self) {
        while let Some(entry) = self.events.peek() {
            if self.pending.contains(&entry.sequence.0) {
                break;
            }
            self.events.pop();
        }
    }

    /// Returns the time of the next event without dispatching it.
    pub fn peek_time(&mut self) -> Option<Duration> {
        self.discard_cancelled();
        self.events.peek().map(EventEntry::time)
    }

    /// Removes and returns the next scheduled event or `None` if none are left.
    /// The clock is moved to the time of the returned event.
    pub fn pop(&mut self) -> Option<EventEntry> {
        self.discard_cancelled();
        let entry = self.events.pop()?;
        self.pending.remove(&entry.sequence.0);
        if let Some(process) = entry.process {
            let fired = self
                .suspended
                .get(&process)
                .map_or(false, |s| s.handle == entry.handle());
            if fired {
                self.suspended.remove(&process);
            }
        }
        self.clock.set(entry.time.0);
        Some(entry)
    }

    /// Allocates a new process.
    pub fn spawn_process(&mut self) -> ProcessId {
        let id = ProcessId(self.next_process);
        self.next_process += 1;
        id
    }

    /// Suspends `process` for `delay`. Once the delay elapses, `component` receives a [`Resume`]
    /// event at `point` with [`Outcome::TimedOut`]; if the process is interrupted first, it
    /// receives the same event with [`Outcome::Interrupted`] instead.
    ///
    /// The component's event type only needs to be constructible from [`Resume<P>`], so that a
    /// component can mix process resumptions with its other events.
    ///
    /// A process can only have one outstanding suspension. Suspending a process that is already
    /// suspended cancels the previous suspension without resuming it.
    pub fn suspend_for<P, E>(
        &mut self,
        process: ProcessId,
        delay: Duration,
        component: ComponentId<E>,
        point: P,
    ) -> EventHandle
    where
        P: Clone + 'static,
        E: From<Resume<P>> + 'static,
    {
        if let Some(previous) = self.suspended.remove(&process) {
            log::error!("Process {} suspended twice; dropping earlier timer", process);
            self.cancel(previous.handle);
        }
        let interrupted: Box<dyn Any> = Box::new(E::from(Resume {
            process,
            point: point.clone(),
            outcome: Outcome::Interrupted,
        }));
        let handle = self.push(
            delay,
            component.id,
            Box::new(E::from(Resume {
                process,
                point,
                outcome: Outcome::TimedOut,
            })),
            TypeId::of::<E>(),
            Some(process),
        );
        self.suspended.insert(
            process,
            Suspension {
                handle,
                component: component.id,
                interrupted,
                event_type: TypeId::of::<E>(),
            },
        );
        handle
    }

    /// Checks if the process is waiting on a timer.
    #[must_use]
    pub fn is_suspended(&self, process: ProcessId) -> bool {
        self.suspended.contains_key(&process)
    }

    /// Interrupts a suspended process: its timer is cancelled, and the owning component is
    /// resumed at the current time with [`Outcome::Interrupted`].
    ///
    /// Returns `false` and does nothing if the process has no outstanding suspension, e.g.,
    /// because its timer has already fired or it has already been interrupted.
    pub fn interrupt(&mut self, process: ProcessId) -> bool {
        match self.suspended.remove(&process) {
            Some(suspension) => {
                self.cancel(suspension.handle);
                self.push(
                    Duration::default(),
                    suspension.component,
                    suspension.interrupted,
                    suspension.event_type,
                    None,
                );
                true
            }
            None => false,
        }
    }
}
