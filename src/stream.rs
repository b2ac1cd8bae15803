//! Buffered change streams.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};

use crate::error::{BrokerError, BrokerResult, ListenerResult};
use crate::event::TranslatedDataChangeEvent;
use crate::forward::{DataChangeListener, ListenerRegistration};

/// Listener that buffers events in a bounded channel.
///
/// Never blocks the delivering thread: when the buffer is full the event is
/// dropped and counted.
#[derive(Debug)]
pub(crate) struct ChannelListener {
    tx: RwLock<Option<Sender<TranslatedDataChangeEvent>>>,
    dropped: Arc<AtomicU64>,
}

impl ChannelListener {
    pub(crate) fn bounded(capacity: usize) -> (Self, Receiver<TranslatedDataChangeEvent>) {
        let (tx, rx) = bounded(capacity.max(1));
        let listener = Self {
            tx: RwLock::new(Some(tx)),
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (listener, rx)
    }

    pub(crate) fn dropped_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.dropped)
    }

    /// Release the sender so the receiver disconnects once drained.
    pub(crate) fn disconnect(&self) {
        self.tx.write().unwrap_or_else(PoisonError::into_inner).take();
    }
}

impl DataChangeListener for ChannelListener {
    fn on_data_changed(&self, event: TranslatedDataChangeEvent) -> ListenerResult {
        let guard = self.tx.read().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = guard.as_ref() else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        };

        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
        Ok(())
    }
}

/// A registration whose events are pulled from a buffer.
///
/// Dropping the stream closes the registration.
#[derive(Debug)]
pub struct ChangeStream {
    registration: ListenerRegistration,
    listener: Arc<ChannelListener>,
    rx: Receiver<TranslatedDataChangeEvent>,
    dropped: Arc<AtomicU64>,
}

impl ChangeStream {
    pub(crate) fn new(
        registration: ListenerRegistration,
        listener: Arc<ChannelListener>,
        rx: Receiver<TranslatedDataChangeEvent>,
    ) -> Self {
        let dropped = listener.dropped_counter();
        Self {
            registration,
            listener,
            rx,
            dropped,
        }
    }

    /// The registration backing this stream.
    #[must_use]
    pub const fn registration(&self) -> &ListenerRegistration {
        &self.registration
    }

    /// Events discarded because the buffer was full or the stream closed.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Close the registration.
    ///
    /// Idempotent. Buffered events can still be received; afterwards the
    /// stream reports [`BrokerError::Disconnected`].
    pub fn close(&self) {
        self.registration.close();
        self.listener.disconnect();
    }

    /// Receive the next event (blocking).
    ///
    /// # Errors
    /// [`BrokerError::Disconnected`] once the stream is closed and drained.
    pub fn recv(&self) -> BrokerResult<TranslatedDataChangeEvent> {
        self.rx.recv().map_err(|_| BrokerError::Disconnected)
    }

    /// Receive the next event with a timeout.
    ///
    /// # Errors
    /// [`BrokerError::Timeout`] if nothing arrives in time, or
    /// [`BrokerError::Disconnected`] once closed and drained.
    pub fn recv_timeout(&self, timeout: Duration) -> BrokerResult<TranslatedDataChangeEvent> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => BrokerError::Timeout {
                duration_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            },
            RecvTimeoutError::Disconnected => BrokerError::Disconnected,
        })
    }

    /// Receive a buffered event without blocking.
    #[must_use]
    pub fn try_recv(&self) -> Option<TranslatedDataChangeEvent> {
        self.rx.try_recv().ok()
    }
}

impl Drop for ChangeStream {
    fn drop(&mut self) {
        self.close();
    }
}
