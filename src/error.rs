use thiserror::Error;

/// Errors that stop the current step or trial. Aborts and misses are not
/// errors; they are reported through [`crate::systems::sdk::TrialState`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskError {
    #[error("invalid timing: {0}")]
    InvalidTiming(String),
    #[error("unsupported condition: {0}")]
    UnsupportedCondition(String),
    #[error("invalid action: {0}")]
    InvalidAction(String),
    #[error("malformed config: {0}")]
    Config(String),
}

impl From<serde_json::Error> for TaskError {
    fn from(err: serde_json::Error) -> Self {
        TaskError::Config(err.to_string())
    }
}
