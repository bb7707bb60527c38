//! Emitter-specific error types.

use thiserror::Error;

/// Errors returned when handing a metric point to an emitter.
#[derive(Debug, Error)]
pub enum EmitError {
    /// The receiving side of the channel was dropped.
    #[error("metric channel closed")]
    ChannelClosed,

    /// The channel buffer is full; the point was dropped.
    #[error("metric channel full, point dropped")]
    ChannelFull,

    /// Writing the serialized point failed.
    #[error("failed to write metric: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing the point failed.
    #[error("failed to serialize metric: {0}")]
    Json(#[from] serde_json::Error),
}
