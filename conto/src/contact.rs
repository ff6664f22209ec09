//! Contacts and their lifecycle.
//!
//! Every contact owns two processes. The *lifecycle* process walks through the menu, the call with
//! an optional hold, and the wrap-up. The *patience* process is the abandonment timer, started at
//! arrival. Answering a contact interrupts its patience, and its menu if the customer is still in
//! it; patience running out first makes the contact leave the queue.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use simkit::{Component, ComponentId, Outcome, ProcessId, Resume, Scheduler, State};

use crate::{
    secs, Agent, AgentId, AgentStatus, CenterKeys, ContactId, ContactType, Desk, Error,
    HandlingPlan, Result, Route, Sampler, Skill,
};

/// Contact statuses.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumVariantNames,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    /// Navigating the menu.
    Arrival,
    /// Waiting for an agent.
    Queued,
    /// Offered to an agent.
    Ringing,
    /// Being handled.
    InProgress,
    /// Handled; the agent is finishing up.
    WrapUp,
    /// Finished successfully.
    Completed,
    /// Left before being answered.
    Abandoned,
}

impl ContactStatus {
    /// Parses a status, rejecting anything outside of the fixed set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContactStatus`] listing the accepted values.
    pub fn parse(value: &str) -> Result<Self> {
        Self::from_str(value).map_err(|_| Error::contact_status(value))
    }

    /// Checks if this is one of the final statuses.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Abandoned)
    }

    /// Checks if the lifecycle permits moving from this status to `next`.
    #[must_use]
    pub fn can_become(self, next: ContactStatus) -> bool {
        use ContactStatus::{Abandoned, Arrival, Completed, InProgress, Queued, Ringing, WrapUp};
        match self {
            Arrival => matches!(next, Queued | Ringing | InProgress | Abandoned),
            Queued => matches!(next, Ringing | InProgress | Abandoned),
            Ringing => matches!(next, InProgress | Abandoned),
            InProgress => matches!(next, WrapUp | Completed),
            WrapUp => next == Completed,
            Completed | Abandoned => false,
        }
    }
}

/// Handling decided when a contact is answered.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Handling {
    call: Duration,
    hold: Option<(Duration, Duration)>,
    wrap_up: Duration,
}

impl Handling {
    /// Scales the call by the agent's proficiency and decides whether to hold: only calls are
    /// held, and only if the call lasts more than twice the hold.
    fn new(plan: &HandlingPlan, contact_type: ContactType, proficiency: f64) -> Self {
        let call = plan.call * proficiency;
        let hold = if contact_type == ContactType::Call && plan.hold_wanted && call > plan.hold * 2.0
        {
            Some((secs(plan.hold_timing), secs(plan.hold)))
        } else {
            None
        };
        Self {
            call: secs(call),
            hold,
            wrap_up: secs(plan.wrap_up),
        }
    }
}

/// A customer contacting the center.
#[derive(Debug)]
pub struct Contact {
    id: ContactId,
    contact_type: ContactType,
    skill: Option<Skill>,
    status: ContactStatus,
    arrival_time: Duration,
    answer_time: Option<Duration>,
    handled_by: Option<AgentId>,
    duration: Duration,
    hold_count: usize,
    hold_duration: Duration,
    wait_time: Duration,
    lifecycle: ProcessId,
    patience: ProcessId,
    handling: Option<Handling>,
}

impl Contact {
    /// Creates a contact arriving at `arrival_time`, with its processes spawned in `scheduler`.
    #[must_use]
    pub fn new(
        id: ContactId,
        contact_type: ContactType,
        arrival_time: Duration,
        scheduler: &mut Scheduler,
    ) -> Self {
        Self {
            id,
            contact_type,
            skill: None,
            status: ContactStatus::Arrival,
            arrival_time,
            answer_time: None,
            handled_by: None,
            duration: Duration::default(),
            hold_count: 0,
            hold_duration: Duration::default(),
            wait_time: Duration::default(),
            lifecycle: scheduler.spawn_process(),
            patience: scheduler.spawn_process(),
            handling: None,
        }
    }

    /// Contact ID.
    #[must_use]
    pub fn id(&self) -> ContactId {
        self.id
    }

    /// Contact type.
    #[must_use]
    pub fn contact_type(&self) -> ContactType {
        self.contact_type
    }

    /// Skill selected in the menu.
    #[must_use]
    pub fn skill(&self) -> Option<Skill> {
        self.skill
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> ContactStatus {
        self.status
    }

    /// Time of arrival.
    #[must_use]
    pub fn arrival_time(&self) -> Duration {
        self.arrival_time
    }

    /// Time of answer.
    #[must_use]
    pub fn answer_time(&self) -> Option<Duration> {
        self.answer_time
    }

    /// Agent handling the contact.
    #[must_use]
    pub fn handled_by(&self) -> Option<AgentId> {
        self.handled_by
    }

    /// Time from arrival to completion, known once completed.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Number of holds.
    #[must_use]
    pub fn hold_count(&self) -> usize {
        self.hold_count
    }

    /// Total time on hold.
    #[must_use]
    pub fn hold_duration(&self) -> Duration {
        self.hold_duration
    }

    /// Time from arrival to answer.
    #[must_use]
    pub fn wait_time(&self) -> Duration {
        self.wait_time
    }

    /// Process running the menu, the call, and the wrap-up.
    #[must_use]
    pub fn lifecycle(&self) -> ProcessId {
        self.lifecycle
    }

    /// Process running the abandonment timer.
    #[must_use]
    pub fn patience(&self) -> ProcessId {
        self.patience
    }

    /// Moves the contact to `status`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] if the lifecycle does not permit the change; the
    /// contact is left untouched.
    pub fn set_status(&mut self, status: ContactStatus) -> Result<()> {
        if self.status.can_become(status) {
            self.status = status;
            Ok(())
        } else {
            Err(Error::InvalidTransition {
                contact: self.id,
                from: self.status,
                to: status,
            })
        }
    }

    /// Parses and sets the status.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is unknown or the change is not permitted.
    pub fn assign_status(&mut self, status: &str) -> Result<()> {
        self.set_status(ContactStatus::parse(status)?)
    }

    /// Attaches a skill, which must be one of the skills offered by the center.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSkill`] if the skill is not offered.
    pub fn set_skill(&mut self, skill: Skill, offered: &[Skill]) -> Result<()> {
        if offered.contains(&skill) {
            self.skill = Some(skill);
            Ok(())
        } else {
            Err(Error::skill(&skill.to_string(), offered))
        }
    }

    /// Parses and attaches a skill.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSkill`] if the skill is unknown or not offered.
    pub fn assign_skill(&mut self, skill: &str, offered: &[Skill]) -> Result<()> {
        self.set_skill(Skill::parse(skill, offered)?, offered)
    }

    /// Marks the contact as answered by `agent` at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] if the contact is not waiting to be answered.
    pub fn answer(&mut self, agent: AgentId, now: Duration) -> Result<()> {
        self.set_status(ContactStatus::InProgress)?;
        self.answer_time = Some(now);
        self.wait_time = now.saturating_sub(self.arrival_time);
        self.handled_by = Some(agent);
        log::debug!("{} answered at T+{:.0}s", self, now.as_secs_f64());
        Ok(())
    }

    /// Accounts for one hold.
    pub fn hold(&mut self, duration: Duration) {
        self.hold_count += 1;
        self.hold_duration += duration;
    }

    /// Marks the contact as completed at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] unless the contact is in progress or in wrap-up.
    pub fn complete(&mut self, now: Duration) -> Result<()> {
        self.set_status(ContactStatus::Completed)?;
        self.duration = now.saturating_sub(self.arrival_time);
        Ok(())
    }

    fn completion_message(&self) -> String {
        let mut message = format!(
            "{} queued for {:.0}s, assigned to skill {}, handled by agent {} in {:.0}s",
            self,
            self.wait_time.as_secs_f64(),
            self.skill.map_or_else(|| String::from("none"), |s| s.to_string()),
            self.handled_by
                .map_or_else(|| String::from("none"), |a| a.to_string()),
            self.duration.as_secs_f64()
        );
        if self.hold_count > 0 {
            message.push_str(&format!(
                " ({} {} for {:.0}s)",
                self.hold_count,
                if self.hold_count > 1 { "holds" } else { "hold" },
                self.hold_duration.as_secs_f64()
            ));
        }
        message
    }
}

impl fmt::Display for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.contact_type.title(), self.id)
    }
}

/// Point at which a contact's process resumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// The abandonment timer; runs on the patience process.
    Patience,
    /// Menu navigation finished.
    Menu,
    /// The agent puts the customer on hold.
    Hold,
    /// The customer is taken off hold.
    OffHold,
    /// The call itself is over.
    Talk,
    /// The wrap-up is over.
    WrapUp,
}

/// Resumption point of a contact's process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// The contact.
    pub contact: ContactId,
    /// Where it continues.
    pub stage: Stage,
}

impl Step {
    fn new(contact: ContactId, stage: Stage) -> Self {
        Self { contact, stage }
    }
}

/// Contact flow events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A new contact has arrived and is registered in the contact log.
    Arrive(ContactId),
    /// The agent should pick up the oldest queued contact if they are available.
    Dequeue(AgentId),
    /// One of the contact processes resumes.
    Resume(Resume<Step>),
}

impl From<Resume<Step>> for Event {
    fn from(resume: Resume<Step>) -> Self {
        Event::Resume(resume)
    }
}

/// Drives the contacts through their lifecycle:
///
/// 1. At arrival, the abandonment timer starts and the contact is routed to an available agent.
/// 2. Without one, the contact joins the queue and the customer navigates the menu, after which
///    the contact gets a skill. An agent freed in the meantime takes the contact straight out of
///    the menu.
/// 3. An answered contact is handled for a call duration, possibly with a hold in the middle.
/// 4. The agent and the contact wrap up for the same duration, after which the contact is
///    completed and the agent, if still available, picks up the oldest queued contact.
///
/// If patience runs out before the contact is answered, it is abandoned and leaves the queue.
pub struct ContactFlow {
    sampler: Rc<RefCell<dyn Sampler>>,
    route: Box<dyn Route>,
    skills: Vec<Skill>,
    keys: CenterKeys,
    desk: ComponentId<Resume<AgentId>>,
}

impl ContactFlow {
    /// Creates the flow for the contacts in `keys.log`, routing among `keys.agents`.
    #[must_use]
    pub fn new(
        sampler: Rc<RefCell<dyn Sampler>>,
        route: Box<dyn Route>,
        skills: Vec<Skill>,
        keys: CenterKeys,
        desk: ComponentId<Resume<AgentId>>,
    ) -> Self {
        Self {
            sampler,
            route,
            skills,
            keys,
            desk,
        }
    }

    fn contact<'s>(&self, state: &'s mut State, id: ContactId) -> Result<&'s mut Contact> {
        state
            .get_mut(self.keys.log)
            .expect("Contact log not found in state")
            .get_mut(id)
            .ok_or(Error::UnknownContact(id))
    }

    fn agent<'s>(&self, state: &'s mut State, id: AgentId) -> Result<&'s mut Agent> {
        state
            .get_mut(self.keys.agents)
            .expect("Agents not found in state")
            .get_mut(usize::from(id))
            .ok_or(Error::UnknownAgent(id))
    }

    fn arrive(
        &self,
        self_id: ComponentId<Event>,
        id: ContactId,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<()> {
        let patience = secs(self.sampler.borrow_mut().patience());
        let contact = self.contact(state, id)?;
        scheduler.suspend_for(
            contact.patience(),
            patience,
            self_id,
            Step::new(id, Stage::Patience),
        );
        let agents = state
            .get(self.keys.agents)
            .expect("Agents not found in state");
        match self.route.select(agents) {
            Some(agent) => self.answer(self_id, id, agent, scheduler, state),
            None => self.enqueue(self_id, id, scheduler, state),
        }
    }

    /// Appends the contact to the queue and starts the menu.
    fn enqueue(
        &self,
        self_id: ComponentId<Event>,
        id: ContactId,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<()> {
        let menu = secs(self.sampler.borrow_mut().menu_time());
        let contact = self.contact(state, id)?;
        scheduler.suspend_for(contact.lifecycle(), menu, self_id, Step::new(id, Stage::Menu));
        log::debug!(
            "{} queued at T+{:.0}s",
            contact,
            scheduler.time().as_secs_f64()
        );
        if state.send(self.keys.queue, id).is_err() {
            log::error!("Queue is full; {} is lost", id);
        }
        Ok(())
    }

    fn select_skill(&self, id: ContactId, state: &mut State) -> Result<()> {
        let skill = self.sampler.borrow_mut().skill(&self.skills);
        if let Some(skill) = skill {
            self.contact(state, id)?.set_skill(skill, &self.skills)?;
        }
        Ok(())
    }

    fn menu_done(&self, id: ContactId, state: &mut State) -> Result<()> {
        self.select_skill(id, state)?;
        self.contact(state, id)?.set_status(ContactStatus::Queued)
    }

    /// Answers the contact by the agent, interrupting the contact's patience, and starts the
    /// handling. A contact taken out of the menu gets its skill now.
    fn answer(
        &self,
        self_id: ComponentId<Event>,
        id: ContactId,
        agent_id: AgentId,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<()> {
        let now = scheduler.time();
        if !self.agent(state, agent_id)?.is_available() {
            return Err(Error::AgentUnavailable(agent_id));
        }
        let contact = self.contact(state, id)?;
        let in_menu = contact.status() == ContactStatus::Arrival;
        contact.answer(agent_id, now)?;
        scheduler.interrupt(contact.patience());
        let (lifecycle, contact_type) = (contact.lifecycle(), contact.contact_type());
        if in_menu {
            scheduler.interrupt(lifecycle);
            self.select_skill(id, state)?;
        }

        let agent = self.agent(state, agent_id)?;
        agent.set_status(AgentStatus::Busy, now);
        let plan = self.sampler.borrow_mut().handling();
        let handling = Handling::new(&plan, contact_type, agent.proficiency());
        self.contact(state, id)?.handling = Some(handling);

        match handling.hold {
            Some((timing, _)) => {
                scheduler.suspend_for(lifecycle, timing, self_id, Step::new(id, Stage::Hold));
            }
            None => {
                scheduler.suspend_for(
                    lifecycle,
                    handling.call,
                    self_id,
                    Step::new(id, Stage::Talk),
                );
            }
        }
        Ok(())
    }

    fn hold(
        &self,
        self_id: ComponentId<Event>,
        id: ContactId,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<()> {
        let contact = self.contact(state, id)?;
        let duration = match contact.handling.and_then(|h| h.hold) {
            Some((_, duration)) => duration,
            None => {
                return Err(Error::InvalidParameter(format!(
                    "{} put on hold without a planned hold",
                    contact
                )))
            }
        };
        log::debug!(
            "{} placed on hold at T+{:.0}s",
            contact,
            scheduler.time().as_secs_f64()
        );
        contact.hold(duration);
        scheduler.suspend_for(
            contact.lifecycle(),
            duration,
            self_id,
            Step::new(id, Stage::OffHold),
        );
        Ok(())
    }

    fn off_hold(
        &self,
        self_id: ComponentId<Event>,
        id: ContactId,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<()> {
        let contact = self.contact(state, id)?;
        log::debug!(
            "{} taken off hold at T+{:.0}s",
            contact,
            scheduler.time().as_secs_f64()
        );
        let remainder = match contact.handling {
            Some(Handling {
                call,
                hold: Some((_, hold)),
                ..
            }) => call.saturating_sub(hold),
            _ => Duration::default(),
        };
        scheduler.suspend_for(
            contact.lifecycle(),
            remainder,
            self_id,
            Step::new(id, Stage::Talk),
        );
        Ok(())
    }

    /// The call is over: the agent's wrap-up timer is started before the contact's own, so that
    /// the agent is available again by the time the contact completes.
    fn talk_done(
        &self,
        self_id: ComponentId<Event>,
        id: ContactId,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<()> {
        let contact = self.contact(state, id)?;
        contact.set_status(ContactStatus::WrapUp)?;
        log::debug!(
            "{} entered wrap-up at T+{:.0}s",
            contact,
            scheduler.time().as_secs_f64()
        );
        let wrap_up = contact.handling.map(|h| h.wrap_up).unwrap_or_default();
        let lifecycle = contact.lifecycle();
        if let Some(agent) = contact.handled_by() {
            Desk::start_wrap_up(self.desk, self.agent(state, agent)?, wrap_up, scheduler);
        }
        scheduler.suspend_for(lifecycle, wrap_up, self_id, Step::new(id, Stage::WrapUp));
        Ok(())
    }

    fn complete(
        &self,
        self_id: ComponentId<Event>,
        id: ContactId,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<()> {
        let contact = self.contact(state, id)?;
        contact.complete(scheduler.time())?;
        log::info!("{}", contact.completion_message());
        let agent = contact.handled_by();
        self.finish(id, state)?;
        if let Some(agent) = agent {
            self.dequeue(self_id, agent, scheduler, state)?;
        }
        Ok(())
    }

    /// Patience ran out. Only contacts still in the menu or in the queue are abandoned; for
    /// others this is a benign race with answering. Patience and menu ending at the same instant
    /// abandon the contact, since the patience timer is always started first.
    fn abandon(&self, id: ContactId, scheduler: &mut Scheduler, state: &mut State) -> Result<()> {
        let contact = match state
            .get_mut(self.keys.log)
            .expect("Contact log not found in state")
            .get_mut(id)
        {
            Some(contact) => contact,
            None => {
                log::debug!("Patience of finished contact {} ran out", id);
                return Ok(());
            }
        };
        match contact.status() {
            ContactStatus::Arrival | ContactStatus::Queued => {
                scheduler.interrupt(contact.lifecycle());
                if !state.remove_from_queue(self.keys.queue, &id) {
                    log::debug!("Contact {} abandoned outside of the queue", id);
                }
            }
            status => {
                log::debug!("Patience of contact {} ran out while {}", id, status);
                return Ok(());
            }
        }
        let contact = self.contact(state, id)?;
        contact.set_status(ContactStatus::Abandoned)?;
        log::info!(
            "{} abandoned after {:.0}s",
            contact,
            scheduler
                .time()
                .saturating_sub(contact.arrival_time())
                .as_secs_f64()
        );
        self.finish(id, state)
    }

    /// Folds a contact in a terminal state into the contact center and agent statistics.
    fn finish(&self, id: ContactId, state: &mut State) -> Result<()> {
        let record = state
            .get_mut(self.keys.log)
            .expect("Contact log not found in state")
            .close(id)
            .cloned()
            .ok_or(Error::UnknownContact(id))?;
        if let Some(agent) = record.handled_by {
            self.agent(state, agent)?.statistics_mut().add(&record);
        }
        Ok(())
    }

    /// Hands the oldest queued contact to the agent, if the agent is available.
    fn dequeue(
        &self,
        self_id: ComponentId<Event>,
        agent: AgentId,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<()> {
        if !self.agent(state, agent)?.is_available() {
            return Ok(());
        }
        match state.recv(self.keys.queue) {
            Some(next) => self.answer(self_id, next, agent, scheduler, state),
            None => Ok(()),
        }
    }

    fn resume(
        &self,
        self_id: ComponentId<Event>,
        resume: &Resume<Step>,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) -> Result<()> {
        let Step { contact, stage } = resume.point;
        match (stage, resume.outcome) {
            (Stage::Patience, Outcome::TimedOut) => self.abandon(contact, scheduler, state),
            (Stage::Patience, Outcome::Interrupted) => Ok(()),
            (stage, Outcome::Interrupted) => {
                log::debug!("Contact {} interrupted at {:?}", contact, stage);
                Ok(())
            }
            (Stage::Menu, Outcome::TimedOut) => self.menu_done(contact, state),
            (Stage::Hold, Outcome::TimedOut) => self.hold(self_id, contact, scheduler, state),
            (Stage::OffHold, Outcome::TimedOut) => {
                self.off_hold(self_id, contact, scheduler, state)
            }
            (Stage::Talk, Outcome::TimedOut) => self.talk_done(self_id, contact, scheduler, state),
            (Stage::WrapUp, Outcome::TimedOut) => {
                self.complete(self_id, contact, scheduler, state)
            }
        }
    }
}

impl Component for ContactFlow {
    type Event = Event;

    fn process_event(
        &mut self,
        self_id: ComponentId<Self::Event>,
        event: &Self::Event,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) {
        let result = match event {
            Event::Arrive(contact) => self.arrive(self_id, *contact, scheduler, state),
            Event::Dequeue(agent) => self.dequeue(self_id, *agent, scheduler, state),
            Event::Resume(resume) => self.resume(self_id, resume, scheduler, state),
        };
        if let Err(err) = result {
            log::error!("[T+{:.0}s] {}", scheduler.time().as_secs_f64(), err);
        }
    }
}
