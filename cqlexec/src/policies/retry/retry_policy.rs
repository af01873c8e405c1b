use cqlexec_cql::Consistency;

use crate::errors::RequestError;

/// Information about a failed request
pub struct RequestInfo<'a> {
    /// The error with which the request failed
    pub error: &'a RequestError,
    /// If set to `true` the request can be safely applied multiple times.
    /// If set to `false` it is unknown whether it can.
    pub is_idempotent: bool,
    /// Consistency with which the request failed
    pub consistency: Consistency,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    RetrySameHost(Option<Consistency>), // None means that the same consistency should be used as before
    RetryNextHost(Option<Consistency>), // ditto
    DontRetry,
    IgnoreWriteError,
}

/// Specifies a policy used to decide when to retry a request
pub trait RetryPolicy: std::fmt::Debug + Send + Sync {
    /// Called for each new request, starts a session of deciding about retries
    fn new_session(&self) -> Box<dyn RetrySession>;
}

/// Used throughout a single request to decide when to retry it
pub trait RetrySession: Send + Sync {
    /// Called after the request failed - decide what to do next
    fn decide_should_retry(&mut self, request_info: RequestInfo) -> RetryDecision;

    /// Reset before using for a new request
    fn reset(&mut self);
}
