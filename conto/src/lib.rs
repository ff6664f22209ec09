//! Contact center simulation.
//!
//! Contacts arrive on a virtual clock and are routed to agents. Contacts that find no available
//! agent wait in a FIFO queue while navigating a menu. Every contact races an abandonment timer against being answered; answered contacts
//! may be put on hold, and finish with a wrap-up period during which their agent is unavailable.
//!
//! The whole run is driven by [`simkit`]: each contact and each agent owns a suspendable process,
//! and all random timings come from an injected [`Sampler`], so a run is reproducible for a fixed
//! seed.
//!
//! ```
//! # use conto::*;
//! # use std::time::Duration;
//! let sampler = FixedSampler::new(vec![0.0, 5.0])
//!     .with_patience(1000.0)
//!     .with_menu_time(0.0)
//!     .with_plan(HandlingPlan::fixed(100.0, 10.0));
//! let config = Config { agent_count: 1, ..Config::default() };
//! let mut center = ContactCenter::with_sampler(&config, sampler)?;
//! center.start(None);
//! assert_eq!(center.statistics().handled, 2);
//! assert_eq!(center.now(), Duration::from_secs(220));
//! # Ok::<(), conto::Error>(())
//! ```

#![warn(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::default_trait_access,
    clippy::inline_always
)]

use std::cell::RefCell;
use std::rc::Rc;
use std::str::FromStr;
use std::time::Duration;

use derive_more::{Display, From, Into};
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use simkit::{ComponentId, Key, QueueId, Simulation};

mod agent;
pub use agent::{Agent, AgentStatus, Desk};

mod contact;
pub use contact::{Contact, ContactFlow, ContactStatus, Event as ContactEvent, Stage, Step};

mod config;
pub use config::{Config, MenuConfig, Patience};

mod error;
pub use error::{Error, Result};

mod generator;
pub use generator::{ContactGenerator, Event as GeneratorEvent};

mod contact_log;
pub use contact_log::{ContactLog, ContactRecord};

mod routing;
pub use routing::{LongestIdle, Route};

mod sampler;
pub use sampler::{FixedSampler, HandlingPlan, RandomSampler, Sampler};

mod statistics;
pub use statistics::{AgentStatistics, ContactStatistics};

/// Agent ID.
#[derive(
    From,
    Into,
    Debug,
    PartialEq,
    PartialOrd,
    Eq,
    Ord,
    Serialize,
    Deserialize,
    Copy,
    Clone,
    Hash,
    Display,
)]
pub struct AgentId(usize);

/// Contact ID.
#[derive(
    From,
    Into,
    Debug,
    PartialEq,
    PartialOrd,
    Eq,
    Ord,
    Serialize,
    Deserialize,
    Copy,
    Clone,
    Hash,
    Display,
)]
pub struct ContactId(usize);

/// Channel through which a contact reaches the center.
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
pub enum ContactType {
    /// Phone call; the only type that can be put on hold.
    Call,
    /// Chat.
    Chat,
    /// Email.
    Email,
}

impl ContactType {
    /// Parses a contact type, rejecting anything outside of the fixed set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContactType`] listing the accepted values.
    pub fn parse(value: &str) -> Result<Self> {
        Self::from_str(value).map_err(|_| Error::contact_type(value))
    }

    fn title(self) -> &'static str {
        match self {
            Self::Call => "Call",
            Self::Chat => "Chat",
            Self::Email => "Email",
        }
    }
}

/// Skill tag attached to a contact after menu navigation.
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
pub enum Skill {
    /// Customer service.
    #[strum(serialize = "cs")]
    #[serde(rename = "cs")]
    CustomerService,
    /// Sales.
    Sales,
    /// International.
    International,
}

impl Skill {
    /// All skills.
    pub const ALL: [Skill; 3] = [Skill::CustomerService, Skill::Sales, Skill::International];

    /// Parses a skill and checks that it is one of the `allowed` skills.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSkill`] if the value is unknown or not allowed.
    pub fn parse(value: &str, allowed: &[Skill]) -> Result<Self> {
        Self::from_str(value)
            .ok()
            .filter(|skill| allowed.contains(skill))
            .ok_or_else(|| Error::skill(value, allowed))
    }
}

/// Converts seconds to simulation time. Negative and NaN values become zero.
#[must_use]
pub fn secs(seconds: f64) -> Duration {
    if seconds.is_nan() || seconds <= 0.0 {
        Duration::default()
    } else if seconds >= Duration::MAX.as_secs_f64() {
        Duration::MAX
    } else {
        Duration::from_secs_f64(seconds)
    }
}

/// IDs of the values and queues the components share through the simulation state.
#[derive(Debug, Clone, Copy)]
pub struct CenterKeys {
    /// All agents, indexed by [`AgentId`].
    pub agents: Key<Vec<Agent>>,
    /// Contacts waiting for an agent, oldest first.
    pub queue: QueueId<ContactId>,
    /// Live and finished contacts.
    pub log: Key<ContactLog>,
}

/// The contact center: agent roster, queue, routing, and the simulation driving them.
pub struct ContactCenter {
    simulation: Simulation,
    keys: CenterKeys,
    flow: ComponentId<ContactEvent>,
    generator: ComponentId<GeneratorEvent>,
    started: bool,
}

impl ContactCenter {
    /// Builds a contact center drawing its timings from a [`RandomSampler`] seeded with
    /// `config.seed`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: &Config) -> Result<Self> {
        let sampler = RandomSampler::from_config(config)?;
        Self::with_sampler(config, sampler)
    }

    /// Builds a contact center drawing its timings from `sampler`, routing to the longest idle
    /// agent.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_sampler<S: Sampler + 'static>(config: &Config, sampler: S) -> Result<Self> {
        Self::with_route(config, sampler, LongestIdle)
    }

    /// Builds a contact center with a custom routing policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_route<S, R>(config: &Config, sampler: S, route: R) -> Result<Self>
    where
        S: Sampler + 'static,
        R: Route + 'static,
    {
        config.validate()?;
        let sampler: Rc<RefCell<dyn Sampler>> = Rc::new(RefCell::new(sampler));
        let mut simulation = Simulation::default();
        let now = simulation.scheduler.time();
        let agents = (0..config.agent_count)
            .map(|id| {
                Agent::new(
                    AgentId(id),
                    format!("Agent {}", id),
                    config.skills.clone(),
                    config.proficiency,
                    simulation.scheduler.spawn_process(),
                    now,
                )
            })
            .collect::<Result<Vec<_>>>()?;
        let keys = CenterKeys {
            agents: simulation.state.insert(agents),
            queue: simulation.add_queue(),
            log: simulation.state.insert(ContactLog::default()),
        };
        let desk = simulation.add_component(Desk::new(keys.agents));
        let flow = simulation.add_component(ContactFlow::new(
            Rc::clone(&sampler),
            Box::new(route),
            config.skills.clone(),
            keys,
            desk,
        ));
        let generator = simulation.add_component(ContactGenerator::new(
            sampler,
            config.contact_type,
            keys.log,
            flow,
        ));
        log::debug!("Contact center created with {} agents", config.agent_count);
        Ok(Self {
            simulation,
            keys,
            flow,
            generator,
            started: false,
        })
    }

    fn ensure_started(&mut self) {
        if !self.started {
            log::info!("Starting contact center");
            self.started = true;
            self.simulation
                .schedule(Duration::default(), self.generator, GeneratorEvent::Start);
        }
    }

    /// Runs the simulation until the clock reaches `until`, or until no events are left if
    /// `until` is `None`. Returns the simulation time at exit.
    ///
    /// With a random sampler arrivals never stop, so the horizon must be given.
    pub fn start(&mut self, until: Option<Duration>) -> Duration {
        self.ensure_started();
        self.simulation.run_until(until)
    }

    /// Same as [`ContactCenter::start`] with a horizon, reporting progress on `pb`.
    pub fn run_with_progress(&mut self, until: Duration, pb: &ProgressBar) -> Duration {
        self.ensure_started();
        while let Some(time) = self.simulation.scheduler.peek_time() {
            if time >= until {
                break;
            }
            self.simulation.step();
            let secs = self.now().as_secs();
            if pb.position() < secs {
                pb.set_position(secs);
                let log = self.log();
                pb.set_message(&format!(
                    "[T+{time}s] [Q={queued}] [L={live}] [F={finished}]",
                    time = secs,
                    queued = self.simulation.state.len(self.keys.queue),
                    live = log.live_contacts(),
                    finished = log.finished().len(),
                ));
            }
        }
        let time = self.simulation.run_until(Some(until));
        pb.set_position(time.as_secs());
        time
    }

    /// Dispatches a single event. Returns `false` if there were none left.
    pub fn step(&mut self) -> bool {
        self.ensure_started();
        self.simulation.step()
    }

    /// Current simulation time.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.simulation.scheduler.time()
    }

    fn log(&self) -> &ContactLog {
        self.simulation
            .state
            .get(self.keys.log)
            .expect("Contact log not found in state")
    }

    /// Aggregated statistics over all finished contacts.
    #[must_use]
    pub fn statistics(&self) -> &ContactStatistics {
        self.log().statistics()
    }

    /// All agents, ordered by ID.
    #[must_use]
    pub fn agents(&self) -> &[Agent] {
        self.simulation
            .state
            .get(self.keys.agents)
            .expect("Agents not found in state")
    }

    /// Returns the agent with the given ID.
    #[must_use]
    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents().get(usize::from(id))
    }

    /// Changes the status of an agent from outside of the simulation, e.g., to take them offline.
    ///
    /// A pending wrap-up timer is cancelled, so the agent keeps the assigned status. An agent
    /// made available picks up the oldest queued contact right away.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownAgent`] if there is no such agent, or
    /// [`Error::StatusChangeRefused`] if the agent is busy or the status is one that only contacts
    /// assign; the agent is left untouched.
    pub fn set_agent_status(&mut self, id: AgentId, status: AgentStatus) -> Result<()> {
        let now = self.now();
        let agent = self
            .simulation
            .state
            .get_mut(self.keys.agents)
            .expect("Agents not found in state")
            .get_mut(usize::from(id))
            .ok_or(Error::UnknownAgent(id))?;
        if !agent.status().accepts_external(status) {
            return Err(Error::StatusChangeRefused {
                agent: id,
                from: agent.status(),
                to: status,
            });
        }
        if self.simulation.scheduler.interrupt(agent.process()) {
            log::debug!("Wrap-up of {} cut short", agent);
        }
        agent.set_status(status, now);
        if status == AgentStatus::Available {
            self.simulation
                .schedule(Duration::default(), self.flow, ContactEvent::Dequeue(id));
        }
        Ok(())
    }

    /// Parses `status` and assigns it to the agent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAgentStatus`] for unknown values, leaving the agent untouched, or any
    /// error of [`ContactCenter::set_agent_status`].
    pub fn assign_agent_status(&mut self, id: AgentId, status: &str) -> Result<()> {
        let status = AgentStatus::parse(status)?;
        self.set_agent_status(id, status)
    }

    /// Contacts currently waiting in the queue, oldest first.
    #[must_use]
    pub fn queued(&self) -> Vec<ContactId> {
        self.simulation
            .state
            .queue(self.keys.queue)
            .iter()
            .copied()
            .collect()
    }

    /// Status of a live or finished contact.
    #[must_use]
    pub fn contact_status(&self, id: ContactId) -> Option<ContactStatus> {
        self.log().status(id)
    }

    /// Returns a contact that has not reached a terminal state yet.
    #[must_use]
    pub fn contact(&self, id: ContactId) -> Option<&Contact> {
        self.log().get(id)
    }

    /// Records of all finished contacts, in order of completion.
    #[must_use]
    pub fn finished(&self) -> &[ContactRecord] {
        self.log().finished()
    }

    /// Writes records of all finished contacts in CSV format.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_contacts<W: std::io::Write>(&self, writer: W) -> Result<()> {
        self.log().write_csv(writer)
    }
}
