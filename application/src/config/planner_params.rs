//! Planner loop parameters.

use atelier_domain::{DEFAULT_MAX_ITERATIONS, Model};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Static parameters of the planner loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerParams {
    /// Reasoning model driving the loop.
    pub model: Model,
    /// Iteration budget; a turn without a tool call still consumes one.
    pub max_iterations: usize,
    /// Interval between heartbeat events while the loop is running.
    pub heartbeat_interval: Duration,
    /// Maximum search results requested per `web_search` call.
    pub search_limit: usize,
}

impl Default for PlannerParams {
    fn default() -> Self {
        Self {
            model: Model::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            heartbeat_interval: Duration::from_secs(30),
            search_limit: 5,
        }
    }
}

impl PlannerParams {
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = PlannerParams::default();
        assert_eq!(params.max_iterations, 15);
        assert_eq!(params.heartbeat_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_builders() {
        let params = PlannerParams::default()
            .with_max_iterations(3)
            .with_heartbeat_interval(Duration::from_secs(5));
        assert_eq!(params.max_iterations, 3);
        assert_eq!(params.heartbeat_interval.as_secs(), 5);
    }
}
