//! Wake-up signal between the output reader and request handlers.
//!
//! Handlers take a [`Waiter`] *before* inspecting the line log, so output
//! that arrives between the inspection and the wait is never missed.

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, Default)]
struct SignalState {
    generation: u64,
    closing: bool,
}

/// Broadcasts "new output arrived" and the one-way "closing" transition.
#[derive(Debug)]
pub struct Signal {
    tx: watch::Sender<SignalState>,
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}

impl Signal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SignalState::default());
        Self { tx }
    }

    /// Register interest in the next notification.
    pub fn subscribe(&self) -> Waiter {
        Waiter {
            rx: self.tx.subscribe(),
        }
    }

    /// Wake every current waiter. A no-op when nobody waits.
    pub fn notify(&self) {
        self.tx.send_modify(|state| state.generation = state.generation.wrapping_add(1));
    }

    /// Enter the closing state and wake every waiter. Irreversible.
    pub fn close(&self) {
        self.tx.send_modify(|state| {
            state.closing = true;
            state.generation = state.generation.wrapping_add(1);
        });
    }

    pub fn is_closing(&self) -> bool {
        self.tx.borrow().closing
    }
}

/// A registration taken from [`Signal::subscribe`].
#[derive(Debug)]
pub struct Waiter {
    rx: watch::Receiver<SignalState>,
}

impl Waiter {
    /// Suspend until the next notification.
    ///
    /// Returns `false` once the signal is closing; the caller must stop
    /// waiting for output.
    pub async fn wait(&mut self) -> bool {
        if self.rx.borrow().closing {
            return false;
        }
        if self.rx.changed().await.is_err() {
            return false;
        }
        !self.rx.borrow_and_update().closing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn notify_without_waiters_is_harmless() {
        let signal = Signal::new();
        signal.notify();
        signal.notify();
        assert!(!signal.is_closing());
    }

    #[tokio::test]
    async fn notification_after_subscribe_is_not_lost() {
        let signal = Signal::new();
        let mut waiter = signal.subscribe();
        signal.notify();
        let woke = tokio::time::timeout(Duration::from_secs(1), waiter.wait()).await;
        assert_eq!(woke.ok(), Some(true));
    }

    #[tokio::test]
    async fn late_subscriber_waits_for_next_notification() {
        let signal = Signal::new();
        signal.notify();
        let mut waiter = signal.subscribe();
        let early = tokio::time::timeout(Duration::from_millis(50), waiter.wait()).await;
        assert!(early.is_err(), "must not wake on an already delivered notification");
    }

    #[tokio::test]
    async fn wakes_every_waiter() {
        let signal = Arc::new(Signal::new());
        let mut handles = Vec::new();
        for _ in 0..3 {
            let mut waiter = signal.subscribe();
            handles.push(tokio::spawn(async move { waiter.wait().await }));
        }
        signal.notify();
        for handle in handles {
            assert!(handle.await.unwrap());
        }
    }

    #[tokio::test]
    async fn close_releases_pending_and_future_waits() {
        let signal = Arc::new(Signal::new());
        let mut pending = signal.subscribe();
        let task = tokio::spawn(async move { pending.wait().await });
        signal.close();
        assert!(!task.await.unwrap());

        let mut late = signal.subscribe();
        let outcome = tokio::time::timeout(Duration::from_millis(50), late.wait()).await;
        assert_eq!(outcome.ok(), Some(false));
        assert!(signal.is_closing());
    }
}
