use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, trace, warn};

use super::lifecycle::ShutdownSignal;
use crate::cluster::{Host, Metadata};
use crate::errors::SchemaAgreementError;

/// Interval between schema version comparisons.
pub(crate) const DEFAULT_SCHEMA_AGREEMENT_INTERVAL: Duration = Duration::from_millis(200);
/// Maximum time spent waiting for schema agreement.
pub(crate) const DEFAULT_MAX_SCHEMA_AGREEMENT_WAIT: Duration = Duration::from_secs(10);

/// Polls the cluster until all hosts report the same schema version.
pub(crate) struct SchemaAgreementWaiter<'a> {
    metadata: &'a dyn Metadata,
    interval: Duration,
    max_wait: Duration,
}

impl<'a> SchemaAgreementWaiter<'a> {
    pub(crate) fn new(metadata: &'a dyn Metadata, interval: Duration, max_wait: Duration) -> Self {
        SchemaAgreementWaiter {
            metadata,
            interval,
            max_wait,
        }
    }

    /// Returns whether the schema agreed before the deadline.
    ///
    /// The first comparison is issued immediately. Running out of time is
    /// not an error, the result is then `false`. So is a zero maximum
    /// wait, which disables waiting, and a client shutdown.
    pub(crate) async fn wait(
        &self,
        control_host: &Host,
        hosts_count: usize,
        shutdown: ShutdownSignal,
    ) -> Result<bool, SchemaAgreementError> {
        if hosts_count == 0 {
            return Ok(true);
        }
        if self.max_wait.is_zero() {
            return Ok(false);
        }

        tokio::select! {
            res = timeout(self.max_wait, self.poll_until_agreement(control_host)) => match res {
                Ok(res) => res,
                Err(_) => {
                    warn!(
                        "Schema agreement not reached within {:?}, continuing anyway",
                        self.max_wait
                    );
                    Ok(false)
                }
            },
            _ = shutdown.triggered() => {
                debug!("Client shut down while waiting for schema agreement");
                Ok(false)
            }
        }
    }

    async fn poll_until_agreement(&self, control_host: &Host) -> Result<bool, SchemaAgreementError> {
        let mut polls: usize = 0;
        loop {
            polls += 1;
            if self.metadata.compare_schema_versions(control_host).await? {
                trace!("Schema agreement reached after {} poll(s)", polls);
                return Ok(true);
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}
