//! Per-request options and their resolution against execution profiles.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use cqlexec_cql::{ColumnType, Consistency, ProtocolVersion, SerialConsistency};

use super::execution_profile::{ExecutionProfile, ProfileManager, DEFAULT_PROFILE_NAME};
use crate::errors::{BadQuery, ExecutionError, TypeHintParseError};
use crate::policies::load_balancing::{LoadBalancingPolicy, RoutingInfo};
use crate::policies::retry::RetryPolicy;
use crate::policies::timestamp_generator::TimestampGenerator;

/// Selects the execution profile of a request, by name or by instance.
#[derive(Debug, Clone)]
pub enum ProfileSelector {
    Name(String),
    Profile(ExecutionProfile),
}

impl From<&str> for ProfileSelector {
    fn from(name: &str) -> Self {
        ProfileSelector::Name(name.to_owned())
    }
}

impl From<String> for ProfileSelector {
    fn from(name: String) -> Self {
        ProfileSelector::Name(name)
    }
}

impl From<ExecutionProfile> for ProfileSelector {
    fn from(profile: ExecutionProfile) -> Self {
        ProfileSelector::Profile(profile)
    }
}

/// Type hints of bound values, by position or by parameter name.
///
/// Requests carry hints as strings (e.g. `"map<text,int>"`); resolution
/// parses them into [`ColumnType`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeHints<T = String> {
    Positional(Vec<Option<T>>),
    Named(Vec<(String, T)>),
}

impl<T> TypeHints<T> {
    pub fn positional<I, H>(hints: I) -> Self
    where
        I: IntoIterator<Item = Option<H>>,
        H: Into<T>,
    {
        TypeHints::Positional(hints.into_iter().map(|h| h.map(Into::into)).collect())
    }

    pub fn named<I, N, H>(hints: I) -> Self
    where
        I: IntoIterator<Item = (N, H)>,
        N: Into<String>,
        H: Into<T>,
    {
        TypeHints::Named(
            hints
                .into_iter()
                .map(|(n, h)| (n.into(), h.into()))
                .collect(),
        )
    }

    /// Hint of the value at `index`. Always `None` for named hints.
    pub fn get(&self, index: usize) -> Option<&T> {
        match self {
            TypeHints::Positional(hints) => hints.get(index)?.as_ref(),
            TypeHints::Named(_) => None,
        }
    }

    /// Hint of the parameter `name`, matched case-insensitively.
    /// Always `None` for positional hints.
    pub fn get_by_name(&self, name: &str) -> Option<&T> {
        match self {
            TypeHints::Positional(_) => None,
            TypeHints::Named(hints) => hints
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, h)| h),
        }
    }

    pub(crate) fn iter_mut(&mut self) -> Box<dyn Iterator<Item = &mut T> + '_> {
        match self {
            TypeHints::Positional(hints) => Box::new(hints.iter_mut().flatten()),
            TypeHints::Named(hints) => Box::new(hints.iter_mut().map(|(_, h)| h)),
        }
    }
}

impl TypeHints<String> {
    /// Parses every hint, failing on the first malformed one.
    pub fn parse(&self) -> Result<TypeHints<ColumnType>, TypeHintParseError> {
        Ok(match self {
            TypeHints::Positional(hints) => TypeHints::Positional(
                hints
                    .iter()
                    .map(|h| h.as_deref().map(ColumnType::parse).transpose())
                    .collect::<Result<_, _>>()?,
            ),
            TypeHints::Named(hints) => TypeHints::Named(
                hints
                    .iter()
                    .map(|(n, h)| Ok((n.clone(), ColumnType::parse(h)?)))
                    .collect::<Result<_, TypeHintParseError>>()?,
            ),
        })
    }
}

/// Options supplied with a single request. Unset options are taken from
/// the selected execution profile, then from the default profile.
#[derive(Clone, Default)]
pub struct QueryOptions {
    pub execution_profile: Option<ProfileSelector>,
    pub consistency: Option<Consistency>,
    pub serial_consistency: Option<SerialConsistency>,
    /// Zero disables the client-side timeout.
    pub read_timeout: Option<Duration>,
    pub retry_policy: Option<Arc<dyn RetryPolicy>>,
    pub is_idempotent: Option<bool>,
    /// Prepares the statement before executing it.
    pub prepare: Option<bool>,
    pub keyspace: Option<String>,
    /// Client-side write timestamp, in microseconds.
    pub timestamp: Option<i64>,
    /// Precomputed routing key. Takes precedence over every other routing option.
    pub routing_key: Option<Bytes>,
    /// Positions of the partition key components among the bound values.
    pub routing_indexes: Option<Vec<usize>>,
    /// Names of the partition key components, for named values.
    pub routing_names: Option<Vec<String>>,
    pub hints: Option<TypeHints>,
    /// Batch only: whether the batch goes through the batch log. Defaults to true.
    pub logged: Option<bool>,
    /// Batch only: whether the batch updates counters.
    pub counter: Option<bool>,
}

impl fmt::Debug for QueryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryOptions")
            .field("execution_profile", &self.execution_profile)
            .field("consistency", &self.consistency)
            .field("serial_consistency", &self.serial_consistency)
            .field("read_timeout", &self.read_timeout)
            .field("retry_policy", &self.retry_policy)
            .field("is_idempotent", &self.is_idempotent)
            .field("prepare", &self.prepare)
            .field("keyspace", &self.keyspace)
            .field("timestamp", &self.timestamp)
            .field("routing_key", &self.routing_key)
            .field("routing_indexes", &self.routing_indexes)
            .field("routing_names", &self.routing_names)
            .field("hints", &self.hints)
            .field("logged", &self.logged)
            .field("counter", &self.counter)
            .finish()
    }
}

/// Client-wide defaults for options which are not part of execution profiles.
#[derive(Debug, Clone, Default)]
pub struct DefaultQueryOptions {
    pub is_idempotent: bool,
    pub prepare: bool,
    /// Keyspace used when a request does not name one.
    pub keyspace: Option<String>,
}

/// Effective options of a single request.
///
/// Created once per request by merging, in increasing precedence, the
/// default profile, the selected profile and the request's own options.
/// Handed to the request handler and never shared between requests.
#[derive(Clone)]
#[non_exhaustive]
pub struct ResolvedExecutionOptions {
    pub profile_name: String,
    pub consistency: Consistency,
    pub serial_consistency: SerialConsistency,
    pub read_timeout: Duration,
    pub retry_policy: Arc<dyn RetryPolicy>,
    pub load_balancing_policy: Arc<dyn LoadBalancingPolicy>,
    pub is_idempotent: bool,
    pub prepare: bool,
    pub keyspace: Option<String>,
    /// Only set when the protocol version supports client timestamps.
    pub timestamp: Option<i64>,
    pub routing_key: Option<Bytes>,
    pub routing_indexes: Option<Vec<usize>>,
    pub routing_names: Option<Vec<String>>,
    pub hints: Option<TypeHints<ColumnType>>,
    pub logged: bool,
    pub counter: bool,
}

impl ResolvedExecutionOptions {
    /// Merges request options with the profiles.
    ///
    /// Fails on an unknown profile name or on a malformed type hint.
    /// The timestamp is left as given by the caller; see
    /// [`assign_timestamp`](Self::assign_timestamp).
    pub fn resolve(
        options: &QueryOptions,
        profiles: &ProfileManager,
        defaults: &DefaultQueryOptions,
    ) -> Result<Self, ExecutionError> {
        let (profile_name, profile) = match &options.execution_profile {
            None => (DEFAULT_PROFILE_NAME.to_owned(), profiles.base().clone()),
            Some(ProfileSelector::Name(name)) => {
                let profile = profiles
                    .get(name)
                    .ok_or_else(|| BadQuery::ExecutionProfileNotFound(name.clone()))?;
                (name.clone(), profiles.base().overlay(profile))
            }
            Some(ProfileSelector::Profile(profile)) => (
                profile.name().to_owned(),
                profiles.base().overlay(profile),
            ),
        };

        let hints = options.hints.as_ref().map(TypeHints::parse).transpose()?;

        Ok(ResolvedExecutionOptions {
            profile_name,
            consistency: options.consistency.unwrap_or(profile.consistency),
            serial_consistency: options
                .serial_consistency
                .unwrap_or(profile.serial_consistency),
            read_timeout: options.read_timeout.unwrap_or(profile.read_timeout),
            retry_policy: options
                .retry_policy
                .clone()
                .unwrap_or(profile.retry_policy),
            load_balancing_policy: profile.load_balancing_policy,
            is_idempotent: options.is_idempotent.unwrap_or(defaults.is_idempotent),
            prepare: options.prepare.unwrap_or(defaults.prepare),
            keyspace: options
                .keyspace
                .clone()
                .or_else(|| defaults.keyspace.clone()),
            timestamp: options.timestamp,
            routing_key: options.routing_key.clone(),
            routing_indexes: options.routing_indexes.clone(),
            routing_names: options.routing_names.clone(),
            hints,
            logged: options.logged.unwrap_or(true),
            counter: options.counter.unwrap_or(false),
        })
    }

    /// Settles the client timestamp once the protocol version is known.
    ///
    /// Protocol versions without client timestamps get none. Otherwise a
    /// caller-supplied timestamp is kept, or one is drawn from the
    /// generator, if any.
    pub fn assign_timestamp(
        &mut self,
        version: ProtocolVersion,
        generator: Option<&dyn TimestampGenerator>,
    ) {
        if !version.supports_timestamps() {
            self.timestamp = None;
        } else if self.timestamp.is_none() {
            self.timestamp = generator.map(|g| g.next_timestamp());
        }
    }

    /// Read timeout, `None` if disabled.
    pub fn effective_read_timeout(&self) -> Option<Duration> {
        (!self.read_timeout.is_zero()).then_some(self.read_timeout)
    }

    pub fn routing_info(&self) -> RoutingInfo<'_> {
        RoutingInfo {
            consistency: self.consistency,
            keyspace: self.keyspace.as_deref(),
            routing_key: self.routing_key.as_deref(),
        }
    }
}

impl fmt::Debug for ResolvedExecutionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedExecutionOptions")
            .field("profile_name", &self.profile_name)
            .field("consistency", &self.consistency)
            .field("serial_consistency", &self.serial_consistency)
            .field("read_timeout", &self.read_timeout)
            .field("retry_policy", &self.retry_policy)
            .field("load_balancing_policy", &self.load_balancing_policy.name())
            .field("is_idempotent", &self.is_idempotent)
            .field("prepare", &self.prepare)
            .field("keyspace", &self.keyspace)
            .field("timestamp", &self.timestamp)
            .field("routing_key", &self.routing_key)
            .field("hints", &self.hints)
            .finish_non_exhaustive()
    }
}
