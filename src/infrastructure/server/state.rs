use crate::agent::Agent;
use crate::model::ModelProvider;
use std::sync::Arc;

pub(crate) struct ServerState<P: ModelProvider> {
    agent: Arc<Agent<P>>,
    default_max_attempts: usize,
}

impl<P: ModelProvider> ServerState<P> {
    pub(crate) fn new(agent: Arc<Agent<P>>, default_max_attempts: usize) -> Self {
        Self {
            agent,
            default_max_attempts,
        }
    }

    pub(crate) fn agent(&self) -> Arc<Agent<P>> {
        Arc::clone(&self.agent)
    }

    pub(crate) fn default_max_attempts(&self) -> usize {
        self.default_max_attempts
    }
}
