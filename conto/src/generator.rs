use std::cell::RefCell;
use std::rc::Rc;

use simkit::{Component, ComponentId, Key, Scheduler, State};

use crate::contact::Event as ContactEvent;
use crate::{secs, Contact, ContactId, ContactLog, ContactType, Sampler};

/// Contact generator events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Schedules the first arrival.
    Start,
    /// A contact arrives; the next arrival is scheduled.
    Arrive,
}

/// Generates contacts at intervals drawn from the sampler, until it runs out of them.
///
/// Each new contact is registered in the contact log and handed over to the contact flow at its
/// arrival time. Contact IDs are consecutive, starting at 1.
pub struct ContactGenerator {
    sampler: Rc<RefCell<dyn Sampler>>,
    contact_type: ContactType,
    log: Key<ContactLog>,
    flow: ComponentId<ContactEvent>,
    counter: usize,
}

impl ContactGenerator {
    /// Creates a generator of contacts of `contact_type`.
    #[must_use]
    pub fn new(
        sampler: Rc<RefCell<dyn Sampler>>,
        contact_type: ContactType,
        log: Key<ContactLog>,
        flow: ComponentId<ContactEvent>,
    ) -> Self {
        Self {
            sampler,
            contact_type,
            log,
            flow,
            counter: 0,
        }
    }

    fn schedule_next(&self, self_id: ComponentId<Event>, scheduler: &mut Scheduler) {
        let next = self.sampler.borrow_mut().interarrival();
        match next {
            Some(interval) => {
                scheduler.schedule(secs(interval), self_id, Event::Arrive);
            }
            None => log::debug!("No more contacts after {}", self.counter),
        }
    }
}

impl Component for ContactGenerator {
    type Event = Event;

    fn process_event(
        &mut self,
        self_id: ComponentId<Self::Event>,
        event: &Self::Event,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) {
        if let Event::Arrive = event {
            self.counter += 1;
            let now = scheduler.time();
            let contact = Contact::new(
                ContactId::from(self.counter),
                self.contact_type,
                now,
                scheduler,
            );
            log::info!("{} arrived at T+{:.0}s", contact, now.as_secs_f64());
            let id = contact.id();
            state
                .get_mut(self.log)
                .expect("Contact log not found in state")
                .open(contact);
            scheduler.schedule_immediately(self.flow, ContactEvent::Arrive(id));
        }
        self.schedule_next(self_id, scheduler);
    }
}
