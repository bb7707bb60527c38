//! ICMP probe primitive.
//!
//! - [`IcmpProber`]: echo request sequences via raw ICMP sockets

mod prober;

pub use prober::{IcmpProber, resolve_host};
