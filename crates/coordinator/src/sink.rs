//! The caller's end of a request.

use tokio::sync::oneshot;

use crate::types::Outcome;

pub type ResponseReceiver = oneshot::Receiver<Outcome>;

/// Delivers one [`Outcome`] to the caller that started a request.
///
/// Dropping the [`ResponseReceiver`] detaches the caller; an outcome that
/// finds the sink detached is handed back so it can be persisted instead.
#[derive(Debug)]
pub struct ResponseSink {
    tx: oneshot::Sender<Outcome>,
}

impl ResponseSink {
    pub fn channel() -> (Self, ResponseReceiver) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    pub fn is_attached(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Consumes the sink, so at most one outcome can ever be sent.
    pub fn deliver(self, outcome: Outcome) -> Result<(), Outcome> {
        self.tx.send(outcome)
    }
}
