use serde::{Deserialize, Serialize};

/// What to do when one mutation cannot be applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnMutationError {
    /// Log it and continue with the next mutation.
    #[default]
    Skip,
    /// Fail the whole aggregation.
    Abort,
}

/// Aggregate manager settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateConfig {
    pub on_mutation_error: OnMutationError,
    /// Capacity of each aggregate subscriber's channel.
    pub subscriber_capacity: usize,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            on_mutation_error: OnMutationError::Skip,
            subscriber_capacity: 64,
        }
    }
}
