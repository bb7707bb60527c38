//! Probe primitive trait and its error type.

use std::time::Duration;

use thiserror::Error;

/// Errors a probe primitive can report.
///
/// The target prober collapses every variant into
/// [`ProbeResult::Unreachable`](crate::collector::ProbeResult::Unreachable);
/// the distinction only feeds log output.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Hostname could not be resolved to an address.
    #[error("failed to resolve '{host}': {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },

    /// ICMP socket could not be created (usually missing privileges).
    #[error("failed to create ICMP client: {0}")]
    Client(#[source] std::io::Error),

    /// None of the echo requests were answered.
    #[error("no reply from {host} after {count} request(s)")]
    NoReply { host: String, count: u32 },

    /// Probe count was zero.
    #[error("probe count must be positive")]
    InvalidCount,

    /// Any other transport failure.
    #[error("probe failed: {0}")]
    Other(String),
}

/// Capability that sends echo requests to one address.
///
/// Implementations send `count` probes spaced at least `interval` apart and
/// return the round-trip time of every answered probe, in send order. A
/// target that answered nothing is an error.
///
/// # Contract
///
/// - At most `count` samples are returned.
/// - No retries beyond `count`; failed probes are simply absent.
/// - Dropping the returned future abandons the remaining probes.
#[async_trait::async_trait]
pub trait Prober: Send + Sync + 'static {
    /// Send `count` probes to `address`, spaced `interval` apart.
    async fn send(
        &self,
        address: &str,
        count: u32,
        interval: Duration,
    ) -> Result<Vec<Duration>, ProbeError>;
}

#[async_trait::async_trait]
impl<P: Prober + ?Sized> Prober for std::sync::Arc<P> {
    async fn send(
        &self,
        address: &str,
        count: u32,
        interval: Duration,
    ) -> Result<Vec<Duration>, ProbeError> {
        (**self).send(address, count, interval).await
    }
}
