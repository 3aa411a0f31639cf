//! Bounded event queue with a background consumer.
//!
//! Producers (timer mutation call sites) never block: `emit` is a
//! non-blocking enqueue and overflow drops the event with a warning. The
//! consumer drains strictly in arrival order and hands each event to the
//! host, which fans out one blocking task per (plugin, hook) invocation.
//! Ordering between hook invocations, within or across events, is not
//! guaranteed.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::events::Event;

use super::host::PluginHost;

pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Decouples timer mutations from plugin notification.
pub struct EventBus {
    tx: mpsc::Sender<Event>,
    shutdown_tx: watch::Sender<bool>,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

impl EventBus {
    /// Spawn the consumer task and return a handle for producers.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(host: Arc<PluginHost>, capacity: usize) -> Arc<Self> {
        let (tx, mut rx) = mpsc::channel::<Event>(capacity.max(1));
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let consumer = tokio::spawn(async move {
            loop {
                tokio::select! {
                    // Shutdown wins over queued events: nothing dispatches
                    // once it has begun.
                    biased;
                    changed = shutdown_rx.changed() => {
                        // A closed channel means the bus itself is gone.
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    maybe_event = rx.recv() => match maybe_event {
                        Some(event) => host.dispatch(&event),
                        None => break,
                    },
                }
            }
            debug!("event consumer stopped");
        });

        Arc::new(Self {
            tx,
            shutdown_tx,
            consumer: Mutex::new(Some(consumer)),
        })
    }

    /// Non-blocking enqueue. On a full queue the event is dropped with a
    /// warning; after shutdown it is silently discarded.
    pub fn emit(&self, event: Event) {
        if *self.shutdown_tx.borrow() {
            return;
        }
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(event = event.event_type.as_str(), "event queue full, dropping event");
            }
            Err(TrySendError::Closed(event)) => {
                debug!(event = event.event_type.as_str(), "event bus already stopped");
            }
        }
    }

    /// Stop the consumer. Queued events are discarded; in-flight hook
    /// invocations are left to finish on the blocking pool.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let handle = self
            .consumer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventType;

    #[tokio::test]
    async fn emit_without_plugins_is_harmless() {
        let bus = EventBus::start(Arc::new(PluginHost::new()), 4);
        for _ in 0..100 {
            bus.emit(Event::new(EventType::Started));
        }
        bus.shutdown().await;
    }

    #[tokio::test]
    async fn emit_after_shutdown_is_a_no_op() {
        let bus = EventBus::start(Arc::new(PluginHost::new()), 4);
        bus.shutdown().await;
        bus.emit(Event::new(EventType::Stopped));
        // A second shutdown must not hang on the already-taken handle.
        bus.shutdown().await;
    }
}
