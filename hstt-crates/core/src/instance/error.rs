use thiserror::Error;

/// The reasons why [`InstanceBuilder::build`](super::InstanceBuilder::build) rejects an instance.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstanceError {
    #[error("the instance has no times")]
    NoTimes,
    #[error("{context} refers to an unknown {kind} with index {index}")]
    UnknownReference {
        context: String,
        kind: &'static str,
        index: usize,
    },
    #[error("event '{event}' has duration zero")]
    ZeroDuration { event: String },
    #[error("event '{event}' of duration {duration} cannot start at its preassigned time {time}")]
    PreassignedTimeOutOfRange {
        event: String,
        duration: usize,
        time: usize,
    },
    #[error("{context} expects resource type '{expected}' but was given resource '{resource}'")]
    ResourceTypeMismatch {
        context: String,
        expected: String,
        resource: String,
    },
    #[error("constraint '{constraint}' has minimum {minimum} above maximum {maximum}")]
    InvalidLimits {
        constraint: String,
        minimum: i64,
        maximum: i64,
    },
    #[error("constraint '{constraint}' has negative weight {weight}")]
    NegativeWeight { constraint: String, weight: i64 },
}
