//! Suspendable processes.
//!
//! A process is a unit of execution owned by some component, e.g., the lifecycle of one entity.
//! It suspends itself with [`Scheduler::suspend_for`], naming the point `P` at which it wants to
//! be resumed. The component then receives a [`Resume`] event once the timer expires, or earlier
//! if another party calls [`Scheduler::interrupt`]. The [`Outcome`] tells the two apart.
//!
//! A process has at most one outstanding suspension at a time.
//!
//! [`Scheduler::suspend_for`]: crate::Scheduler::suspend_for
//! [`Scheduler::interrupt`]: crate::Scheduler::interrupt

use std::any::{Any, TypeId};
use std::fmt;

use crate::EventHandle;

/// Identifies a process within a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(pub(crate) usize);

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// How a suspension has been resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The requested delay has elapsed.
    TimedOut,
    /// Another party has interrupted the process before the delay elapsed.
    Interrupted,
}

/// Event delivered to a component when one of its processes resumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resume<P> {
    /// The resumed process.
    pub process: ProcessId,
    /// The point at which the process continues.
    pub point: P,
    /// Whether the timer expired or the process was interrupted.
    pub outcome: Outcome,
}

impl<P> Resume<P> {
    /// Checks if the suspension ended because the timer expired.
    #[must_use]
    pub fn timed_out(&self) -> bool {
        self.outcome == Outcome::TimedOut
    }
}

/// Outstanding suspension of a process. The interrupted event is prepared at suspension time,
/// since the scheduler cannot construct a typed event later on.
pub(crate) struct Suspension {
    pub(crate) handle: EventHandle,
    pub(crate) component: usize,
    pub(crate) interrupted: Box<dyn Any>,
    pub(crate) event_type: TypeId,
}
