//! Metric emitters.
//!
//! - [`MetricEmitter`]: sink accepting one point at a time
//! - [`ChannelEmitter`]: non-blocking writes into a bounded MPSC channel
//! - [`JsonLinesEmitter`]: one JSON object per line on any writer

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, TrySendError, sync_channel};
use std::sync::{Arc, Mutex};

use super::error::EmitError;
use super::types::MetricPoint;

/// Sink for metric points produced by a collection cycle.
///
/// Implementations must be callable from several threads; the collector
/// emits points of different targets in completion order.
pub trait MetricEmitter: Send + Sync {
    fn emit(&self, point: &MetricPoint) -> Result<(), EmitError>;
}

impl<E: MetricEmitter + ?Sized> MetricEmitter for Arc<E> {
    fn emit(&self, point: &MetricPoint) -> Result<(), EmitError> {
        (**self).emit(point)
    }
}

/// Emitter backed by a bounded channel.
///
/// Writes never block: a full buffer drops the point and counts it.
#[derive(Clone)]
pub struct ChannelEmitter {
    tx: SyncSender<MetricPoint>,
    dropped: Arc<AtomicU64>,
}

impl std::fmt::Debug for ChannelEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelEmitter")
            .field("dropped", &self.dropped())
            .finish_non_exhaustive()
    }
}

impl ChannelEmitter {
    /// Create an emitter and the receiver draining it.
    pub fn channel(capacity: usize) -> (Self, Receiver<MetricPoint>) {
        let (tx, rx) = sync_channel(capacity);
        let emitter = Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (emitter, rx)
    }

    /// Total count of points dropped because the buffer was full or closed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl MetricEmitter for ChannelEmitter {
    fn emit(&self, point: &MetricPoint) -> Result<(), EmitError> {
        match self.tx.try_send(point.clone()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                tracing::warn!(path = %point.path, "Channel full, dropping metric point");
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Err(EmitError::ChannelFull)
            }
            Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Err(EmitError::ChannelClosed)
            }
        }
    }
}

/// Emitter writing newline-delimited JSON.
pub struct JsonLinesEmitter<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesEmitter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Consume the emitter and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|p| p.into_inner())
    }
}

impl<W: Write + Send> MetricEmitter for JsonLinesEmitter<W> {
    fn emit(&self, point: &MetricPoint) -> Result<(), EmitError> {
        let line = serde_json::to_string(point)?;
        let mut out = self.out.lock().unwrap_or_else(|p| p.into_inner());
        writeln!(out, "{line}")?;
        out.flush()?;
        Ok(())
    }
}
