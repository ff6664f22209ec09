use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::{ContactType, Error, Result, Skill};

/// Distribution of the time a contact waits before abandoning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Patience {
    /// Weibull with shape 1.5, scaled by the average abandon time.
    Weibull,
    /// Exponential with the average abandon time as mean.
    Exponential,
}

impl Default for Patience {
    fn default() -> Self {
        Self::Weibull
    }
}

/// Menu navigation time: normal, but no shorter than `min`. In seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuConfig {
    /// Mean navigation time.
    pub mean: f64,
    /// Standard deviation of the navigation time.
    pub std_dev: f64,
    /// Shortest navigation time.
    pub min: f64,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            mean: 10.0,
            std_dev: 3.0,
            min: 1.0,
        }
    }
}

/// Contact center parameters. Times are in seconds, rates per second.
///
/// Every field has a default, so a JSON configuration only needs to list what it changes:
///
/// ```
/// # use conto::Config;
/// let config = Config::from_json(r#"{"agent_count": 3, "menu": {"mean": 5.0}}"#)?;
/// assert_eq!(config.agent_count, 3);
/// assert_eq!(config.menu.std_dev, 3.0);
/// # Ok::<(), conto::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of agents.
    pub agent_count: usize,
    /// Average number of arriving contacts per second.
    pub contact_rate: f64,
    /// Average call duration.
    pub handle_time: f64,
    /// Probability that an eligible call is put on hold.
    pub hold_probability: f64,
    /// Average hold duration.
    pub hold_time: f64,
    /// Average time before a waiting contact abandons.
    pub abandon_time: f64,
    /// Average wrap-up duration.
    pub wrap_up_time: f64,
    /// Skills offered in the menu.
    pub skills: Vec<Skill>,
    /// Type of all arriving contacts.
    pub contact_type: ContactType,
    /// Patience distribution.
    pub patience: Patience,
    /// Menu navigation time.
    pub menu: MenuConfig,
    /// Proficiency of every agent; call durations are multiplied by it, so greater values mean
    /// slower handling.
    pub proficiency: f64,
    /// Random seed.
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            agent_count: 10,
            contact_rate: 5.0 / 60.0,
            handle_time: 300.0,
            hold_probability: 0.5,
            hold_time: 30.0,
            abandon_time: 120.0,
            wrap_up_time: 60.0,
            skills: Skill::ALL.to_vec(),
            contact_type: ContactType::Call,
            patience: Patience::default(),
            menu: MenuConfig::default(),
            proficiency: 1.0,
            seed: 0,
        }
    }
}

fn non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidParameter(format!(
            "{} must be a non-negative number but is {}",
            name, value
        )))
    }
}

fn positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidParameter(format!(
            "{} must be a positive number but is {}",
            name, value
        )))
    }
}

impl Config {
    /// Parses a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the parameters are invalid.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails, the JSON is malformed, or the parameters are invalid.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that all parameters are within their domains.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] naming the first offending parameter.
    pub fn validate(&self) -> Result<()> {
        positive("contact_rate", self.contact_rate)?;
        positive("abandon_time", self.abandon_time)?;
        positive("proficiency", self.proficiency)?;
        non_negative("handle_time", self.handle_time)?;
        non_negative("hold_time", self.hold_time)?;
        non_negative("wrap_up_time", self.wrap_up_time)?;
        non_negative("menu.mean", self.menu.mean)?;
        non_negative("menu.std_dev", self.menu.std_dev)?;
        non_negative("menu.min", self.menu.min)?;
        if !(0.0..=1.0).contains(&self.hold_probability) {
            return Err(Error::InvalidParameter(format!(
                "hold_probability must be within [0, 1] but is {}",
                self.hold_probability
            )));
        }
        Ok(())
    }
}
