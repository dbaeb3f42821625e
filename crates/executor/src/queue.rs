use common::models::Signal;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Error, Debug)]
#[error("signal queue is closed, execution service has stopped")]
pub struct QueueClosed(pub Signal);

/// Producer side of the FIFO between the Telegram handler and the executor.
///
/// Unbounded: `enqueue` never waits.
#[derive(Clone)]
pub struct SignalQueue {
    tx: mpsc::UnboundedSender<Signal>,
}

pub struct SignalReceiver {
    rx: mpsc::UnboundedReceiver<Signal>,
}

impl SignalQueue {
    pub fn unbounded() -> (Self, SignalReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, SignalReceiver { rx })
    }

    pub fn enqueue(&self, signal: Signal) -> Result<(), QueueClosed> {
        self.tx.send(signal).map_err(|e| QueueClosed(e.0))
    }
}

impl SignalReceiver {
    /// Next signal in arrival order. `None` once every `SignalQueue` is dropped
    /// and the backlog is drained.
    pub async fn next(&mut self) -> Option<Signal> {
        self.rx.recv().await
    }

    #[cfg(test)]
    pub fn try_next(&mut self) -> Option<Signal> {
        self.rx.try_recv().ok()
    }
}
