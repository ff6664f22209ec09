use std::io;

use strum::VariantNames;
use thiserror::Error;

use crate::{AgentId, AgentStatus, ContactId, ContactStatus, ContactType, Skill};

/// Errors raised by the contact center model.
///
/// Invalid values are rejected at the point of assignment; the entity they were meant for is left
/// untouched.
#[derive(Error, Debug)]
pub enum Error {
    /// Agent status outside of [`AgentStatus`].
    #[error("invalid agent status \"{value}\"; must be one of: {expected}")]
    InvalidAgentStatus {
        /// Rejected value.
        value: String,
        /// Accepted values.
        expected: String,
    },

    /// Contact status outside of [`ContactStatus`].
    #[error("invalid contact status \"{value}\"; must be one of: {expected}")]
    InvalidContactStatus {
        /// Rejected value.
        value: String,
        /// Accepted values.
        expected: String,
    },

    /// Contact type outside of [`ContactType`].
    #[error("invalid contact type \"{value}\"; must be one of: {expected}")]
    InvalidContactType {
        /// Rejected value.
        value: String,
        /// Accepted values.
        expected: String,
    },

    /// Skill that is unknown or not offered by the contact center.
    #[error("invalid skill \"{value}\"; must be one of: {expected}")]
    InvalidSkill {
        /// Rejected value.
        value: String,
        /// Accepted values.
        expected: String,
    },

    /// Status change not permitted by the contact lifecycle.
    #[error("contact {contact} cannot change status from {from} to {to}")]
    InvalidTransition {
        /// The contact.
        contact: ContactId,
        /// Current status.
        from: ContactStatus,
        /// Requested status.
        to: ContactStatus,
    },

    /// Simulation parameter out of its domain.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// No agent with this ID.
    #[error("unknown agent {0}")]
    UnknownAgent(AgentId),

    /// External status change refused: busy agents keep their status until the contact releases
    /// them, and only `available`, `not_available` and `offline` can be assigned.
    #[error("agent {agent} cannot change status from {from} to {to}")]
    StatusChangeRefused {
        /// The agent.
        agent: AgentId,
        /// Current status.
        from: AgentStatus,
        /// Requested status.
        to: AgentStatus,
    },

    /// The agent cannot take a contact in their current status.
    #[error("agent {0} is not available")]
    AgentUnavailable(AgentId),

    /// No live contact with this ID.
    #[error("unknown contact {0}")]
    UnknownContact(ContactId),

    /// Malformed JSON configuration.
    #[error("unable to parse configuration")]
    Config(#[from] serde_json::Error),

    /// Failure while writing the contact log.
    #[error("unable to write contact log")]
    Csv(#[from] csv::Error),

    /// I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Result type of the contact center model.
pub type Result<T> = std::result::Result<T, Error>;

fn expected<T: VariantNames>() -> String {
    T::VARIANTS.join(", ")
}

impl Error {
    pub(crate) fn agent_status(value: &str) -> Self {
        Self::InvalidAgentStatus {
            value: value.to_string(),
            expected: expected::<AgentStatus>(),
        }
    }

    pub(crate) fn contact_status(value: &str) -> Self {
        Self::InvalidContactStatus {
            value: value.to_string(),
            expected: expected::<ContactStatus>(),
        }
    }

    pub(crate) fn contact_type(value: &str) -> Self {
        Self::InvalidContactType {
            value: value.to_string(),
            expected: expected::<ContactType>(),
        }
    }

    pub(crate) fn skill(value: &str, allowed: &[Skill]) -> Self {
        Self::InvalidSkill {
            value: value.to_string(),
            expected: itertools::join(allowed, ", "),
        }
    }
}
