use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crate::{EventEntry, Scheduler, State};

/// Identifies a simulation component.
///
/// The ID is generic over the event type of the component, so that the scheduler can only ever
/// schedule events the component knows how to process.
pub struct ComponentId<E> {
    pub(crate) id: usize,
    _marker: PhantomData<E>,
}

impl<E> ComponentId<E> {
    pub(crate) fn new(id: usize) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }
}

impl<E> Clone for ComponentId<E> {
    fn clone(&self) -> Self {
        Self::new(self.id)
    }
}

impl<E> Copy for ComponentId<E> {}

impl<E> PartialEq for ComponentId<E> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<E> Eq for ComponentId<E> {}

impl<E> Hash for ComponentId<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<E> fmt::Debug for ComponentId<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentId({})", self.id)
    }
}

/// Interface of simulation components.
pub trait Component {
    /// Type of events this component reacts to.
    type Event;

    /// Reacts to `event`. The component can schedule new events and mutate the shared state.
    fn process_event(
        &mut self,
        self_id: ComponentId<Self::Event>,
        event: &Self::Event,
        scheduler: &mut Scheduler,
        state: &mut State,
    );
}

trait ProcessEventEntry {
    fn process_event_entry(&mut self, entry: EventEntry, scheduler: &mut Scheduler, state: &mut State);
}

impl<E, C> ProcessEventEntry for C
where
    E: fmt::Debug + 'static,
    C: Component<Event = E>,
{
    fn process_event_entry(
        &mut self,
        entry: EventEntry,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) {
        match entry.downcast::<E>() {
            Some(typed) => {
                log::trace!("[{:?}] {:?} <- {:?}", typed.time, typed.component_id, typed.event);
                self.process_event(typed.component_id, typed.event, scheduler, state);
            }
            None => log::error!(
                "Event entry for component {} has an unexpected type",
                entry.component_idx()
            ),
        }
    }
}

/// Container holding type-erased components.
#[derive(Default)]
pub struct Components {
    components: Vec<Box<dyn ProcessEventEntry>>,
}

impl Components {
    /// Registers a new component and returns its ID.
    pub fn add_component<E: fmt::Debug + 'static, C: Component<Event = E> + 'static>(
        &mut self,
        component: C,
    ) -> ComponentId<E> {
        let id = self.components.len();
        self.components.push(Box::new(component));
        ComponentId::new(id)
    }

    /// Passes the event entry to the component it was scheduled for.
    pub fn process_event_entry(
        &mut self,
        entry: EventEntry,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) {
        match self.components.get_mut(entry.component_idx()) {
            Some(component) => component.process_event_entry(entry, scheduler, state),
            None => log::error!("No component with ID {}", entry.component_idx()),
        }
    }

    /// Number of registered components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Checks if no components are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}
