use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use exam_core::IntegritySignal;

/// Fan-out point for integrity signals raised by the host environment.
///
/// Sessions subscribe while live and drop the subscription when they stop,
/// which unregisters them.
#[derive(Debug, Default)]
pub struct SignalHub {
    listeners: Mutex<Vec<mpsc::UnboundedSender<IntegritySignal>>>,
}

/// Receiving end of one registration. Dropping it unregisters the listener.
#[derive(Debug)]
pub struct SignalSubscription {
    rx: mpsc::UnboundedReceiver<IntegritySignal>,
}

impl SignalSubscription {
    pub async fn recv(&mut self) -> Option<IntegritySignal> {
        self.rx.recv().await
    }
}

impl SignalHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn subscribe(&self) -> SignalSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners().push(tx);
        SignalSubscription { rx }
    }

    /// Deliver `signal` to every live listener. Returns how many received it.
    pub fn emit(&self, signal: IntegritySignal) -> usize {
        let mut listeners = self.listeners();
        listeners.retain(|tx| tx.send(signal).is_ok());
        listeners.len()
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        let mut listeners = self.listeners();
        listeners.retain(|tx| !tx.is_closed());
        listeners.len()
    }

    fn listeners(&self) -> MutexGuard<'_, Vec<mpsc::UnboundedSender<IntegritySignal>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
