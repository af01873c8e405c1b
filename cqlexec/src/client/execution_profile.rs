//! `ExecutionProfile` is a named grouping of configurable options regarding
//! request execution.
//!
//! Profiles can be created to represent different workloads, which thanks to them
//! can be run conveniently on a single client. A profile only carries the options
//! it sets; the ones left unset are inherited from the profile named `"default"`,
//! which in turn inherits from the client-wide defaults.
//!
//! ### Example
//! ```
//! use cqlexec::client::execution_profile::{ExecutionProfile, ProfileDefaults, ProfileManager};
//! use cqlexec::Consistency;
//! use std::time::Duration;
//!
//! let analytics = ExecutionProfile::builder("analytics")
//!     .consistency(Consistency::All)
//!     .read_timeout(Duration::from_secs(60))
//!     .build();
//!
//! let manager = ProfileManager::new(ProfileDefaults::default(), [analytics]).unwrap();
//! assert!(manager.get("analytics").is_some());
//! assert!(manager.get("default").is_some());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use cqlexec_cql::{Consistency, SerialConsistency};

use crate::errors::ClientBuildError;
use crate::policies::load_balancing::LoadBalancingPolicy;
use crate::policies::retry::RetryPolicy;

/// Name of the profile every other profile inherits from.
pub const DEFAULT_PROFILE_NAME: &str = "default";

pub(crate) mod defaults {
    use std::sync::Arc;
    use std::time::Duration;

    use cqlexec_cql::{Consistency, SerialConsistency};

    use crate::policies::load_balancing::{LoadBalancingPolicy, RoundRobinPolicy};
    use crate::policies::retry::{FallthroughRetryPolicy, RetryPolicy};

    pub(crate) fn consistency() -> Consistency {
        Consistency::LocalOne
    }
    pub(crate) fn serial_consistency() -> SerialConsistency {
        SerialConsistency::Serial
    }
    pub(crate) fn read_timeout() -> Duration {
        Duration::from_secs(12)
    }
    pub(crate) fn load_balancing_policy() -> Arc<dyn LoadBalancingPolicy> {
        Arc::new(RoundRobinPolicy::new())
    }
    pub(crate) fn retry_policy() -> Arc<dyn RetryPolicy> {
        Arc::new(FallthroughRetryPolicy::new())
    }
}

/// Client-wide execution settings, every field set.
///
/// A read timeout of zero disables the timeout.
#[derive(Clone)]
pub struct ProfileDefaults {
    pub consistency: Consistency,
    pub serial_consistency: SerialConsistency,
    pub read_timeout: Duration,
    pub retry_policy: Arc<dyn RetryPolicy>,
    pub load_balancing_policy: Arc<dyn LoadBalancingPolicy>,
}

impl Default for ProfileDefaults {
    fn default() -> Self {
        ProfileDefaults {
            consistency: defaults::consistency(),
            serial_consistency: defaults::serial_consistency(),
            read_timeout: defaults::read_timeout(),
            retry_policy: defaults::retry_policy(),
            load_balancing_policy: defaults::load_balancing_policy(),
        }
    }
}

impl ProfileDefaults {
    /// Returns the settings of `profile`, falling back to `self` for unset ones.
    pub(crate) fn overlay(&self, profile: &ExecutionProfile) -> ProfileDefaults {
        let p = &profile.0;
        ProfileDefaults {
            consistency: p.consistency.unwrap_or(self.consistency),
            serial_consistency: p.serial_consistency.unwrap_or(self.serial_consistency),
            read_timeout: p.read_timeout.unwrap_or(self.read_timeout),
            retry_policy: p
                .retry_policy
                .clone()
                .unwrap_or_else(|| self.retry_policy.clone()),
            load_balancing_policy: p
                .load_balancing_policy
                .clone()
                .unwrap_or_else(|| self.load_balancing_policy.clone()),
        }
    }
}

impl fmt::Debug for ProfileDefaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileDefaults")
            .field("consistency", &self.consistency)
            .field("serial_consistency", &self.serial_consistency)
            .field("read_timeout", &self.read_timeout)
            .field("retry_policy", &self.retry_policy)
            .field("load_balancing_policy", &self.load_balancing_policy.name())
            .finish()
    }
}

/// `ExecutionProfileBuilder` is used to create new `ExecutionProfile`s
/// # Example
///
/// ```
/// # use cqlexec::client::execution_profile::ExecutionProfile;
/// # use cqlexec::policies::retry::FallthroughRetryPolicy;
/// # use std::sync::Arc;
/// let profile: ExecutionProfile = ExecutionProfile::builder("oltp")
///     .retry_policy(Arc::new(FallthroughRetryPolicy::new()))
///     .build();
/// ```
#[derive(Clone)]
pub struct ExecutionProfileBuilder {
    name: String,
    consistency: Option<Consistency>,
    serial_consistency: Option<SerialConsistency>,
    read_timeout: Option<Duration>,
    retry_policy: Option<Arc<dyn RetryPolicy>>,
    load_balancing_policy: Option<Arc<dyn LoadBalancingPolicy>>,
}

impl ExecutionProfileBuilder {
    pub fn consistency(mut self, consistency: Consistency) -> Self {
        self.consistency = Some(consistency);
        self
    }

    pub fn serial_consistency(mut self, serial_consistency: SerialConsistency) -> Self {
        self.serial_consistency = Some(serial_consistency);
        self
    }

    /// Sets the client-side read timeout. Zero disables the timeout.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn retry_policy(mut self, retry_policy: Arc<dyn RetryPolicy>) -> Self {
        self.retry_policy = Some(retry_policy);
        self
    }

    /// Sets the load balancing policy. It is initialised when the client
    /// connects, once per distinct policy instance.
    pub fn load_balancing_policy(
        mut self,
        load_balancing_policy: Arc<dyn LoadBalancingPolicy>,
    ) -> Self {
        self.load_balancing_policy = Some(load_balancing_policy);
        self
    }

    pub fn build(self) -> ExecutionProfile {
        ExecutionProfile(Arc::new(ExecutionProfileInner {
            name: self.name,
            consistency: self.consistency,
            serial_consistency: self.serial_consistency,
            read_timeout: self.read_timeout,
            retry_policy: self.retry_policy,
            load_balancing_policy: self.load_balancing_policy,
        }))
    }
}

/// A named, immutable set of execution options. Cheap to clone.
#[derive(Clone)]
pub struct ExecutionProfile(Arc<ExecutionProfileInner>);

struct ExecutionProfileInner {
    name: String,
    consistency: Option<Consistency>,
    serial_consistency: Option<SerialConsistency>,
    read_timeout: Option<Duration>,
    retry_policy: Option<Arc<dyn RetryPolicy>>,
    load_balancing_policy: Option<Arc<dyn LoadBalancingPolicy>>,
}

impl ExecutionProfile {
    pub fn builder(name: impl Into<String>) -> ExecutionProfileBuilder {
        ExecutionProfileBuilder {
            name: name.into(),
            consistency: None,
            serial_consistency: None,
            read_timeout: None,
            retry_policy: None,
            load_balancing_policy: None,
        }
    }

    /// Creates a builder having all options set to the ones in this profile.
    pub fn to_builder(&self) -> ExecutionProfileBuilder {
        let p = &self.0;
        ExecutionProfileBuilder {
            name: p.name.clone(),
            consistency: p.consistency,
            serial_consistency: p.serial_consistency,
            read_timeout: p.read_timeout,
            retry_policy: p.retry_policy.clone(),
            load_balancing_policy: p.load_balancing_policy.clone(),
        }
    }

    fn from_defaults(name: &str, d: &ProfileDefaults) -> Self {
        ExecutionProfile::builder(name)
            .consistency(d.consistency)
            .serial_consistency(d.serial_consistency)
            .read_timeout(d.read_timeout)
            .retry_policy(d.retry_policy.clone())
            .load_balancing_policy(d.load_balancing_policy.clone())
            .build()
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn get_consistency(&self) -> Option<Consistency> {
        self.0.consistency
    }

    pub fn get_serial_consistency(&self) -> Option<SerialConsistency> {
        self.0.serial_consistency
    }

    pub fn get_read_timeout(&self) -> Option<Duration> {
        self.0.read_timeout
    }

    pub fn get_retry_policy(&self) -> Option<&Arc<dyn RetryPolicy>> {
        self.0.retry_policy.as_ref()
    }

    pub fn get_load_balancing_policy(&self) -> Option<&Arc<dyn LoadBalancingPolicy>> {
        self.0.load_balancing_policy.as_ref()
    }
}

impl fmt::Debug for ExecutionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.0;
        f.debug_struct("ExecutionProfile")
            .field("name", &p.name)
            .field("consistency", &p.consistency)
            .field("serial_consistency", &p.serial_consistency)
            .field("read_timeout", &p.read_timeout)
            .field("retry_policy", &p.retry_policy)
            .field(
                "load_balancing_policy",
                &p.load_balancing_policy.as_ref().map(|lbp| lbp.name()),
            )
            .finish()
    }
}

/// Holds the execution profiles of a client.
///
/// A profile named [`DEFAULT_PROFILE_NAME`] always exists. When the user
/// supplies one, its unset options are taken from the client-wide
/// defaults; otherwise it is synthesized from them.
#[derive(Debug)]
pub struct ProfileManager {
    base: ProfileDefaults,
    profiles: HashMap<String, ExecutionProfile>,
}

impl ProfileManager {
    pub fn new(
        global: ProfileDefaults,
        profiles: impl IntoIterator<Item = ExecutionProfile>,
    ) -> Result<Self, ClientBuildError> {
        let mut by_name = HashMap::new();
        for profile in profiles {
            let name = profile.name().to_owned();
            if by_name.insert(name.clone(), profile).is_some() {
                return Err(ClientBuildError::DuplicateExecutionProfile(name));
            }
        }

        let base = match by_name.get(DEFAULT_PROFILE_NAME) {
            Some(user_default) => global.overlay(user_default),
            None => global,
        };
        by_name.insert(
            DEFAULT_PROFILE_NAME.to_owned(),
            ExecutionProfile::from_defaults(DEFAULT_PROFILE_NAME, &base),
        );

        Ok(ProfileManager {
            base,
            profiles: by_name,
        })
    }

    /// Fully resolved settings of the default profile.
    pub fn base(&self) -> &ProfileDefaults {
        &self.base
    }

    pub fn get(&self, name: &str) -> Option<&ExecutionProfile> {
        self.profiles.get(name)
    }

    pub fn default_profile(&self) -> Option<&ExecutionProfile> {
        self.get(DEFAULT_PROFILE_NAME)
    }

    pub fn profiles(&self) -> impl Iterator<Item = &ExecutionProfile> {
        self.profiles.values()
    }

    /// Distinct load balancing policy instances used by any profile.
    pub fn load_balancing_policies(&self) -> Vec<Arc<dyn LoadBalancingPolicy>> {
        let mut policies: Vec<Arc<dyn LoadBalancingPolicy>> =
            vec![self.base.load_balancing_policy.clone()];
        for lbp in self.profiles().filter_map(|p| p.get_load_balancing_policy()) {
            if !policies.iter().any(|known| same_instance(known, lbp)) {
                policies.push(lbp.clone());
            }
        }
        policies
    }
}

fn same_instance<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}
