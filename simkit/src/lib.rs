#![warn(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::default_trait_access)]

//! A small discrete-event simulation kernel: a virtual clock with an ordered, cancellable event
//! queue, typed components reacting to events, a keyed state store with FIFO queues, and
//! suspendable processes that can be interrupted.
//!
//! # Examples
//!
//! ```
//! # use simkit::*;
//! # use std::time::Duration;
//! struct Ticker {
//!     ticks: Key<usize>,
//! }
//!
//! impl Component for Ticker {
//!     type Event = ();
//!
//!     fn process_event(
//!         &mut self,
//!         self_id: ComponentId<()>,
//!         _event: &(),
//!         scheduler: &mut Scheduler,
//!         state: &mut State,
//!     ) {
//!         *state.get_mut(self.ticks).unwrap() += 1;
//!         scheduler.schedule(Duration::from_secs(1), self_id, ());
//!     }
//! }
//!
//! let mut sim = Simulation::default();
//! let ticks = sim.state.insert(0_usize);
//! let ticker = sim.add_component(Ticker { ticks });
//! sim.schedule(Duration::default(), ticker, ());
//! sim.run_until(Some(Duration::from_secs(5)));
//! assert_eq!(sim.state.get(ticks), Some(&5));
//! assert_eq!(sim.scheduler.time(), Duration::from_secs(5));
//! ```

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// Simulation clock.
pub type Clock = Rc<Cell<Duration>>;

pub use component::{Component, ComponentId, Components};
pub use process::{Outcome, ProcessId, Resume};
pub use queue::Queue;
pub use scheduler::{ClockRef, EventEntry, EventHandle, Scheduler, Time};
pub use state::{Key, QueueId, State};

mod component;
mod process;
mod queue;
mod scheduler;
mod state;

/// Bundles the state, the scheduler, and the registered components of one simulation run.
#[derive(Default)]
pub struct Simulation {
    /// Values and queues shared between components.
    pub state: State,
    /// Maintains the clock and the upcoming events.
    pub scheduler: Scheduler,
    components: Components,
}

impl Simulation {
    /// Registers a new component and returns its ID.
    pub fn add_component<E: fmt::Debug + 'static, C: Component<Event = E> + 'static>(
        &mut self,
        component: C,
    ) -> ComponentId<E> {
        self.components.add_component(component)
    }

    /// Creates a new unbounded queue in the state.
    pub fn add_queue<V: 'static>(&mut self) -> QueueId<V> {
        self.state.new_queue()
    }

    /// Schedules `event` for `component` at `self.scheduler.time() + delay`.
    pub fn schedule<E: fmt::Debug + 'static>(
        &mut self,
        delay: Duration,
        component: ComponentId<E>,
        event: E,
    ) -> EventHandle {
        self.scheduler.schedule(delay, component, event)
    }

    /// Dispatches the next due event. Returns `false` if there were no events left.
    pub fn step(&mut self) -> bool {
        if let Some(entry) = self.scheduler.pop() {
            self.components
                .process_event_entry(entry, &mut self.scheduler, &mut self.state);
            true
        } else {
            false
        }
    }

    /// Dispatches events in `(time, sequence)` order until no events are left or the next event
    /// is due at or after `limit`. When a limit is given, the clock is then moved up to it, so
    /// that a subsequent call continues where this one stopped.
    ///
    /// Returns the simulation time at exit.
    pub fn run_until(&mut self, limit: Option<Duration>) -> Duration {
        loop {
            match self.scheduler.peek_time() {
                None => break,
                Some(time) if limit.map_or(false, |limit| time >= limit) => break,
                Some(_) => {
                    self.step();
                }
            }
        }
        if let Some(limit) = limit {
            self.scheduler.advance_to(limit);
        }
        self.scheduler.time()
    }
}
