//! One-shot completion signal.
//!
//! Created when a modal is activated and fulfilled when it is deactivated.
//! Fulfilling twice is a no-op that reports `false`. Dropping the fulfiller
//! without fulfilling resolves the waiter with `None`.

use tokio::sync::oneshot;

pub struct OneShot;

impl OneShot {
    pub fn pair<T>() -> (Fulfiller<T>, Pending<T>) {
        let (tx, rx) = oneshot::channel();
        (Fulfiller { tx: Some(tx) }, Pending { rx })
    }
}

#[derive(Debug)]
pub struct Fulfiller<T> {
    tx: Option<oneshot::Sender<T>>,
}

impl<T> Fulfiller<T> {
    /// Deliver the value. Returns whether this call delivered it.
    pub fn fulfil(&mut self, value: T) -> bool {
        match self.tx.take() {
            // the waiter may have been dropped; the signal still counts as spent
            Some(tx) => {
                let _ = tx.send(value);
                true
            }
            None => false,
        }
    }

    pub fn is_fulfilled(&self) -> bool {
        self.tx.is_none()
    }
}

#[derive(Debug)]
pub struct Pending<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> Pending<T> {
    pub async fn wait(self) -> Option<T> {
        self.rx.await.ok()
    }
}
