//! ICMP echo prober.
//!
//! Sends a sequence of ICMP echo requests to one host and reports the
//! round-trip time of every answered request.

use std::net::IpAddr;
use std::time::Duration;

use surge_ping::{Client, Config, ICMP, PingIdentifier, PingSequence, Pinger};

use crate::collector::{ProbeError, Prober};
use crate::config::DEFAULT_PROBE_TIMEOUT;

/// Echo payload size, matching the classic `ping` default.
const PAYLOAD: [u8; 56] = [0; 56];

/// Upper bound on the sample buffer reserved up front.
const MAX_PREALLOCATED_SAMPLES: u32 = 1024;

/// ICMP echo prober backed by `surge-ping`.
///
/// Raw ICMP sockets usually need elevated privileges (root, `CAP_NET_RAW`,
/// or `net.ipv4.ping_group_range` on Linux). Without them every target
/// reports [`ProbeError::Client`].
#[derive(Debug, Clone)]
pub struct IcmpProber {
    timeout: Duration,
}

impl IcmpProber {
    /// Create a prober waiting at most `timeout` for each echo reply.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for IcmpProber {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}

/// Resolve hostname to IP address.
pub async fn resolve_host(host: &str) -> Result<IpAddr, std::io::Error> {
    // IP literals skip the resolver
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }

    let addrs = tokio::net::lookup_host(format!("{host}:0")).await?;
    addrs
        .into_iter()
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses found"))
}

#[async_trait::async_trait]
impl Prober for IcmpProber {
    async fn send(
        &self,
        address: &str,
        count: u32,
        interval: Duration,
    ) -> Result<Vec<Duration>, ProbeError> {
        if count == 0 {
            return Err(ProbeError::InvalidCount);
        }

        let ip_addr = resolve_host(address)
            .await
            .map_err(|source| ProbeError::Resolve {
                host: address.to_string(),
                source,
            })?;

        let client = match ip_addr {
            IpAddr::V4(_) => Client::new(&Config::default()),
            IpAddr::V6(_) => Client::new(&Config::builder().kind(ICMP::V6).build()),
        }
        .map_err(ProbeError::Client)?;

        let mut pinger = client.pinger(ip_addr, PingIdentifier(rand::random())).await;
        pinger.timeout(self.timeout);

        echo_sequence(&mut pinger, address, count, interval).await
    }
}

/// One echo request/reply exchange.
#[async_trait::async_trait]
trait EchoRequest: Send {
    async fn echo(&mut self, seq: u16) -> Result<Duration, String>;
}

#[async_trait::async_trait]
impl EchoRequest for Pinger {
    async fn echo(&mut self, seq: u16) -> Result<Duration, String> {
        self.ping(PingSequence(seq), &PAYLOAD)
            .await
            .map(|(_, rtt)| rtt)
            .map_err(|e| e.to_string())
    }
}

/// Send `count` echoes, at least `interval` apart, keeping every answered RTT.
async fn echo_sequence<E: EchoRequest>(
    echo: &mut E,
    host: &str,
    count: u32,
    interval: Duration,
) -> Result<Vec<Duration>, ProbeError> {
    let mut samples = Vec::with_capacity(count.min(MAX_PREALLOCATED_SAMPLES) as usize);
    for seq in 0..count {
        if seq > 0 && !interval.is_zero() {
            tokio::time::sleep(interval).await;
        }

        // Sequence numbers wrap at u16::MAX.
        match echo.echo(seq as u16).await {
            Ok(rtt) => {
                tracing::trace!(host = %host, seq, rtt_us = rtt.as_micros(), "Echo reply");
                samples.push(rtt);
            }
            Err(e) => {
                tracing::debug!(host = %host, seq, error = %e, "Echo request unanswered");
            }
        }
    }

    if samples.is_empty() {
        return Err(ProbeError::NoReply {
            host: host.to_string(),
            count,
        });
    }
    Ok(samples)
}
