//! Routing decides which agent answers a contact leaving the menu or the queue.

use crate::{Agent, AgentId};

/// Policy selecting an agent among all agents of the center.
pub trait Route {
    /// Returns the agent that should answer the next contact, or `None` if no agent can.
    ///
    /// Only agents for which [`Agent::is_available`] is true may be selected.
    fn select(&self, agents: &[Agent]) -> Option<AgentId>;
}

/// Selects the available agent who has been idle the longest, i.e., whose status changed the
/// earliest. Ties are broken by the lowest agent ID.
#[derive(Debug, Default, Clone, Copy)]
pub struct LongestIdle;

impl Route for LongestIdle {
    fn select(&self, agents: &[Agent]) -> Option<AgentId> {
        agents
            .iter()
            .filter(|agent| agent.is_available())
            .min_by_key(|agent| (agent.last_status_change(), agent.id()))
            .map(Agent::id)
    }
}
