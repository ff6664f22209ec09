//! Sources of random timings.
//!
//! All randomness of a simulation run goes through a single [`Sampler`], which is shared by the
//! contact generator and the contact flow. [`RandomSampler`] draws from the distributions of the
//! contact center model using a seeded generator, while [`FixedSampler`] replays constant timings
//! for deterministic runs.

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaChaRng;
use rand_distr::{Bernoulli, Distribution, Exp, Normal, Weibull};

use crate::{Config, Error, Patience, Result, Skill};

/// Standard deviation of the call duration.
const CALL_STD_DEV: f64 = 90.0;

/// Shape of the Weibull patience distribution.
const PATIENCE_SHAPE: f64 = 1.5;

/// Lowest upper bound of the delay before a hold.
const MIN_HOLD_TIMING: f64 = 5.0;

/// Timings of a single contact's handling, drawn when the contact is answered. In seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandlingPlan {
    /// Nominal call duration, before the agent's proficiency is applied.
    pub call: f64,
    /// Duration of the hold, if one is taken.
    pub hold: f64,
    /// Time from answer to the start of the hold.
    pub hold_timing: f64,
    /// Wrap-up duration, shared by the contact and the agent.
    pub wrap_up: f64,
    /// Whether the customer should be put on hold, provided the contact qualifies for it.
    pub hold_wanted: bool,
}

impl HandlingPlan {
    /// A plan without hold.
    #[must_use]
    pub fn fixed(call: f64, wrap_up: f64) -> Self {
        Self {
            call,
            hold: 0.0,
            hold_timing: 0.0,
            wrap_up,
            hold_wanted: false,
        }
    }

    /// A plan with a hold of `hold` seconds starting `hold_timing` seconds into the call.
    #[must_use]
    pub fn with_hold(self, hold_timing: f64, hold: f64) -> Self {
        Self {
            hold,
            hold_timing,
            hold_wanted: true,
            ..self
        }
    }
}

/// Implementors provide all random timings of a simulation run.
pub trait Sampler {
    /// Time until the next contact arrives, or `None` if no more contacts arrive.
    fn interarrival(&mut self) -> Option<f64>;

    /// How long a newly arrived contact is willing to wait before abandoning.
    fn patience(&mut self) -> f64;

    /// How long the menu navigation takes.
    fn menu_time(&mut self) -> f64;

    /// Skill selected in the menu among the skills offered by the center.
    fn skill(&mut self, skills: &[Skill]) -> Option<Skill>;

    /// Handling timings of an answered contact.
    fn handling(&mut self) -> HandlingPlan;
}

enum PatienceDistribution {
    Weibull(Weibull<f64>),
    Exponential(Exp<f64>),
}

/// Draws timings from the distributions of the contact center model:
///
/// - inter-arrival times are exponential with the configured contact rate,
/// - patience is Weibull with shape 1.5 scaled by the average abandon time, or exponential,
/// - the menu takes a normally distributed time, but no less than the configured minimum,
/// - calls are normally distributed around the average handle time, floored at zero,
/// - holds are uniform between half and double the average hold time,
/// - wrap-ups are exponential with the average wrap-up time.
pub struct RandomSampler<R> {
    rng: R,
    arrivals: Exp<f64>,
    patience: PatienceDistribution,
    menu: Normal<f64>,
    menu_min: f64,
    call: Normal<f64>,
    hold_time: f64,
    wrap_up: Option<Exp<f64>>,
    hold: Bernoulli,
}

fn invalid<E: std::fmt::Debug>(what: &'static str) -> impl Fn(E) -> Error {
    move |err| Error::InvalidParameter(format!("{}: {:?}", what, err))
}

impl RandomSampler<ChaChaRng> {
    /// Creates a sampler using a ChaCha generator seeded with `config.seed`.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the distributions cannot be constructed from the configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_rng(ChaChaRng::seed_from_u64(config.seed), config)
    }
}

impl<R: Rng> RandomSampler<R> {
    /// Creates a sampler drawing from `rng`.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the distributions cannot be constructed from the configuration.
    pub fn with_rng(rng: R, config: &Config) -> Result<Self> {
        config.validate()?;
        let patience = match config.patience {
            Patience::Weibull => PatienceDistribution::Weibull(
                Weibull::new(config.abandon_time, PATIENCE_SHAPE)
                    .map_err(invalid("abandon time"))?,
            ),
            Patience::Exponential => PatienceDistribution::Exponential(
                Exp::new(1.0 / config.abandon_time).map_err(invalid("abandon time"))?,
            ),
        };
        let wrap_up = if config.wrap_up_time > 0.0 {
            Some(Exp::new(1.0 / config.wrap_up_time).map_err(invalid("wrap-up time"))?)
        } else {
            None
        };
        Ok(Self {
            rng,
            arrivals: Exp::new(config.contact_rate).map_err(invalid("contact rate"))?,
            patience,
            menu: Normal::new(config.menu.mean, config.menu.std_dev)
                .map_err(invalid("menu time"))?,
            menu_min: config.menu.min,
            call: Normal::new(config.handle_time, CALL_STD_DEV).map_err(invalid("handle time"))?,
            hold_time: config.hold_time,
            wrap_up,
            hold: Bernoulli::new(config.hold_probability).map_err(invalid("hold probability"))?,
        })
    }

    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.rng.gen::<f64>()
    }
}

impl<R: Rng> Sampler for RandomSampler<R> {
    fn interarrival(&mut self) -> Option<f64> {
        Some(self.arrivals.sample(&mut self.rng))
    }

    fn patience(&mut self) -> f64 {
        match &self.patience {
            PatienceDistribution::Weibull(dist) => dist.sample(&mut self.rng),
            PatienceDistribution::Exponential(dist) => dist.sample(&mut self.rng),
        }
    }

    fn menu_time(&mut self) -> f64 {
        self.menu.sample(&mut self.rng).max(self.menu_min)
    }

    fn skill(&mut self, skills: &[Skill]) -> Option<Skill> {
        skills.choose(&mut self.rng).copied()
    }

    fn handling(&mut self) -> HandlingPlan {
        let call = self.call.sample(&mut self.rng).max(0.0);
        let hold = self.uniform(self.hold_time / 2.0, self.hold_time * 2.0);
        let hold_timing = self.uniform(
            call / 2.0,
            MIN_HOLD_TIMING.max(call - self.hold_time * 2.0),
        );
        let wrap_up = match &self.wrap_up {
            Some(dist) => dist.sample(&mut self.rng),
            None => 0.0,
        };
        HandlingPlan {
            call,
            hold,
            hold_timing,
            wrap_up,
            hold_wanted: self.hold.sample(&mut self.rng),
        }
    }
}

/// Replays constant timings and a scripted list of inter-arrival times.
///
/// Once the inter-arrival times run out, no more contacts arrive.
#[derive(Debug, Clone)]
pub struct FixedSampler {
    arrivals: VecDeque<f64>,
    patience: f64,
    menu_time: f64,
    skill: Option<Skill>,
    plan: HandlingPlan,
}

impl FixedSampler {
    /// Creates a sampler with the given inter-arrival times. By default, contacts have 120 seconds
    /// of patience, skip the menu, and are handled for 300 seconds plus 60 seconds of wrap-up
    /// without hold.
    pub fn new(arrivals: impl IntoIterator<Item = f64>) -> Self {
        Self {
            arrivals: arrivals.into_iter().collect(),
            patience: 120.0,
            menu_time: 0.0,
            skill: None,
            plan: HandlingPlan::fixed(300.0, 60.0),
        }
    }

    /// Sets the patience of every contact.
    #[must_use]
    pub fn with_patience(mut self, patience: f64) -> Self {
        self.patience = patience;
        self
    }

    /// Sets the menu navigation time.
    #[must_use]
    pub fn with_menu_time(mut self, menu_time: f64) -> Self {
        self.menu_time = menu_time;
        self
    }

    /// Selects this skill whenever it is offered. Otherwise, the first offered skill is selected.
    #[must_use]
    pub fn with_skill(mut self, skill: Skill) -> Self {
        self.skill = Some(skill);
        self
    }

    /// Sets the handling plan of every contact.
    #[must_use]
    pub fn with_plan(mut self, plan: HandlingPlan) -> Self {
        self.plan = plan;
        self
    }
}

impl Sampler for FixedSampler {
    fn interarrival(&mut self) -> Option<f64> {
        self.arrivals.pop_front()
    }

    fn patience(&mut self) -> f64 {
        self.patience
    }

    fn menu_time(&mut self) -> f64 {
        self.menu_time
    }

    fn skill(&mut self, skills: &[Skill]) -> Option<Skill> {
        self.skill
            .filter(|skill| skills.contains(skill))
            .or_else(|| skills.first().copied())
    }

    fn handling(&mut self) -> HandlingPlan {
        self.plan
    }
}
