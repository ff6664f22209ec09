use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use simkit::{Component, ComponentId, Key, Outcome, ProcessId, Resume, Scheduler, State};

use crate::{AgentId, AgentStatistics, Error, Result, Skill};

/// Agent statuses.
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
pub enum AgentStatus {
    /// Ready to take a contact.
    Available,
    /// Handling a contact.
    Busy,
    /// Finishing paperwork after a contact.
    WrapUp,
    /// Logged in but not taking contacts.
    NotAvailable,
    /// Logged out.
    Offline,
}

impl AgentStatus {
    /// Parses a status, rejecting anything outside of the fixed set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAgentStatus`] listing the accepted values.
    pub fn parse(value: &str) -> Result<Self> {
        Self::from_str(value).map_err(|_| Error::agent_status(value))
    }

    /// Checks if an external change from this status to `next` is permitted. `Busy` and `WrapUp`
    /// are driven only by contacts, and a busy agent cannot be taken away from their contact.
    #[must_use]
    pub fn accepts_external(self, next: AgentStatus) -> bool {
        use AgentStatus::{Available, Busy, NotAvailable, Offline};
        self != Busy && matches!(next, Available | NotAvailable | Offline)
    }
}

/// A person handling contacts.
///
/// The agent's status is changed by the contacts they answer and release, by their own wrap-up
/// timer (see [`Desk`]), and externally. Every status change stamps the time of the change, which
/// routing uses to find the agent who has been idle the longest.
#[derive(Debug)]
pub struct Agent {
    id: AgentId,
    name: String,
    status: AgentStatus,
    skills: Vec<Skill>,
    proficiency: f64,
    last_status_change: Duration,
    process: ProcessId,
    statistics: AgentStatistics,
}

impl Agent {
    /// Creates an available agent.
    ///
    /// `proficiency` scales the duration of contacts handled by this agent: `1.0` is nominal,
    /// while greater values mean slower handling. `process` is the agent's wrap-up process.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the proficiency is not a positive number.
    pub fn new(
        id: AgentId,
        name: impl Into<String>,
        skills: Vec<Skill>,
        proficiency: f64,
        process: ProcessId,
        now: Duration,
    ) -> Result<Self> {
        if !(proficiency.is_finite() && proficiency > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "proficiency of agent {} must be positive, but is {}",
                id, proficiency
            )));
        }
        let agent = Self {
            id,
            name: name.into(),
            status: AgentStatus::Available,
            skills,
            proficiency,
            last_status_change: now,
            process,
            statistics: AgentStatistics::default(),
        };
        log::debug!("Agent {} created", agent);
        Ok(agent)
    }

    /// Agent ID.
    #[must_use]
    pub fn id(&self) -> AgentId {
        self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> AgentStatus {
        self.status
    }

    /// Checks if the agent can take a contact.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.status == AgentStatus::Available
    }

    /// Skills the agent possesses.
    #[must_use]
    pub fn skills(&self) -> &[Skill] {
        &self.skills
    }

    /// Handle time multiplier.
    #[must_use]
    pub fn proficiency(&self) -> f64 {
        self.proficiency
    }

    /// Time of the last accepted status change.
    #[must_use]
    pub fn last_status_change(&self) -> Duration {
        self.last_status_change
    }

    /// The process running the agent's wrap-up timer.
    #[must_use]
    pub fn process(&self) -> ProcessId {
        self.process
    }

    /// Statistics of the contacts handled by this agent.
    #[must_use]
    pub fn statistics(&self) -> &AgentStatistics {
        &self.statistics
    }

    pub(crate) fn statistics_mut(&mut self) -> &mut AgentStatistics {
        &mut self.statistics
    }

    /// Sets the status and stamps the time of the change.
    pub fn set_status(&mut self, status: AgentStatus, now: Duration) {
        self.status = status;
        self.last_status_change = now;
        log::debug!(
            "{} changed status to {} at T+{:.0}s",
            self,
            status,
            now.as_secs_f64()
        );
    }

    /// Parses and sets the status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAgentStatus`] for unknown values; the agent is left untouched.
    pub fn assign_status(&mut self, status: &str, now: Duration) -> Result<()> {
        self.set_status(AgentStatus::parse(status)?, now);
        Ok(())
    }
}

impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}

/// Runs the wrap-up timers of all agents.
///
/// A wrap-up timer is started by the contact an agent has just finished, see
/// [`Desk::start_wrap_up`]. Once it expires, the agent becomes available again. An external status
/// change interrupts the timer, in which case the assigned status stays.
pub struct Desk {
    agents: Key<Vec<Agent>>,
}

impl Desk {
    /// Creates a desk for the agents stored under `agents`.
    #[must_use]
    pub fn new(agents: Key<Vec<Agent>>) -> Self {
        Self { agents }
    }

    /// Puts a busy agent in wrap-up for `duration`. Agents whose status has been changed
    /// externally during the contact keep their status. Returns `true` if the timer was started.
    pub fn start_wrap_up(
        desk: ComponentId<Resume<AgentId>>,
        agent: &mut Agent,
        duration: Duration,
        scheduler: &mut Scheduler,
    ) -> bool {
        if agent.status() != AgentStatus::Busy {
            log::debug!("{} is {}; skipping wrap-up", agent, agent.status());
            return false;
        }
        agent.set_status(AgentStatus::WrapUp, scheduler.time());
        scheduler.suspend_for(agent.process(), duration, desk, agent.id());
        true
    }
}

impl Component for Desk {
    type Event = Resume<AgentId>;

    fn process_event(
        &mut self,
        _self_id: ComponentId<Self::Event>,
        event: &Self::Event,
        scheduler: &mut Scheduler,
        state: &mut State,
    ) {
        let agent = match state
            .get_mut(self.agents)
            .expect("Agents not found in state")
            .get_mut(usize::from(event.point))
        {
            Some(agent) => agent,
            None => {
                log::error!("Wrap-up finished for unknown agent {}", event.point);
                return;
            }
        };
        match event.outcome {
            Outcome::TimedOut if agent.status() == AgentStatus::WrapUp => {
                agent.set_status(AgentStatus::Available, scheduler.time());
            }
            Outcome::TimedOut => log::debug!("{} left wrap-up early", agent),
            Outcome::Interrupted => log::trace!("Wrap-up timer of {} interrupted", agent),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::{fixture, rstest};
    use simkit::Simulation;

    #[fixture]
    fn agent() -> Agent {
        let process = Scheduler::default().spawn_process();
        Agent::new(AgentId(1), "Ada", Skill::ALL.to_vec(), 1.0, process, Duration::default())
            .unwrap()
    }

    #[rstest]
    fn test_status_changes_stamp_time(mut agent: Agent) {
        assert_eq!(agent.status(), AgentStatus::Available);
        agent.set_status(AgentStatus::Busy, Duration::from_secs(3));
        assert_eq!(agent.last_status_change(), Duration::from_secs(3));
        assert!(agent
            .assign_status("not_available", Duration::from_secs(7))
            .is_ok());
        assert_eq!(agent.status(), AgentStatus::NotAvailable);
        assert_eq!(agent.last_status_change(), Duration::from_secs(7));
    }

    #[rstest]
    fn test_rejected_status_leaves_agent_untouched(mut agent: Agent) {
        agent.set_status(AgentStatus::Busy, Duration::from_secs(3));
        let err = agent.assign_status("napping", Duration::from_secs(9));
        assert!(matches!(err, Err(Error::InvalidAgentStatus { .. })));
        assert_eq!(agent.status(), AgentStatus::Busy);
        assert_eq!(agent.last_status_change(), Duration::from_secs(3));
    }

    #[rstest(
        from,
        to,
        accepted,
        case(AgentStatus::Available, AgentStatus::Offline, true),
        case(AgentStatus::Available, AgentStatus::NotAvailable, true),
        case(AgentStatus::WrapUp, AgentStatus::Offline, true),
        case(AgentStatus::Offline, AgentStatus::Available, true),
        case(AgentStatus::Busy, AgentStatus::Offline, false),
        case(AgentStatus::Busy, AgentStatus::Available, false),
        case(AgentStatus::Available, AgentStatus::Busy, false),
        case(AgentStatus::Available, AgentStatus::WrapUp, false)
    )]
    fn test_external_status_changes(from: AgentStatus, to: AgentStatus, accepted: bool) {
        assert_eq!(from.accepts_external(to), accepted);
    }

    #[rstest(proficiency, case(0.0), case(-1.0), case(f64::NAN))]
    fn test_non_positive_proficiency(proficiency: f64) {
        let process = Scheduler::default().spawn_process();
        let agent = Agent::new(AgentId(0), "X", vec![], proficiency, process, Duration::default());
        assert!(matches!(agent, Err(Error::InvalidParameter(_))));
    }

    #[rstest]
    fn test_display(agent: Agent) {
        assert_eq!(agent.to_string(), "Ada#1");
    }

    #[test]
    fn test_wrap_up_timer() {
        let mut sim = Simulation::default();
        let process = sim.scheduler.spawn_process();
        let mut agent =
            Agent::new(AgentId(0), "A", vec![], 1.0, process, Duration::default()).unwrap();
        agent.set_status(AgentStatus::Busy, Duration::default());
        let agents = sim.state.insert(Vec::new());
        let desk = sim.add_component(Desk::new(agents));

        assert!(Desk::start_wrap_up(
            desk,
            &mut agent,
            Duration::from_secs(10),
            &mut sim.scheduler
        ));
        assert_eq!(agent.status(), AgentStatus::WrapUp);
        assert!(!Desk::start_wrap_up(
            desk,
            &mut agent,
            Duration::from_secs(10),
            &mut sim.scheduler
        ));
        sim.state.get_mut(agents).unwrap().push(agent);

        sim.run_until(Some(Duration::from_secs(9)));
        assert_eq!(sim.state.get(agents).unwrap()[0].status(), AgentStatus::WrapUp);
        sim.run_until(None);
        let agent = &sim.state.get(agents).unwrap()[0];
        assert_eq!(agent.status(), AgentStatus::Available);
        assert_eq!(agent.last_status_change(), Duration::from_secs(10));
    }

    #[test]
    fn test_interrupted_wrap_up_keeps_assigned_status() {
        let mut sim = Simulation::default();
        let process = sim.scheduler.spawn_process();
        let mut agent =
            Agent::new(AgentId(0), "A", vec![], 1.0, process, Duration::default()).unwrap();
        agent.set_status(AgentStatus::Busy, Duration::default());
        let agents = sim.state.insert(Vec::new());
        let desk = sim.add_component(Desk::new(agents));
        Desk::start_wrap_up(desk, &mut agent, Duration::from_secs(10), &mut sim.scheduler);
        sim.state.get_mut(agents).unwrap().push(agent);

        sim.run_until(Some(Duration::from_secs(4)));
        let agent = &mut sim.state.get_mut(agents).unwrap()[0];
        assert!(sim.scheduler.interrupt(agent.process()));
        agent.set_status(AgentStatus::Offline, Duration::from_secs(4));
        sim.run_until(None);
        let agent = &sim.state.get(agents).unwrap()[0];
        assert_eq!(agent.status(), AgentStatus::Offline);
        assert_eq!(agent.last_status_change(), Duration::from_secs(4));
    }
}
