//! One-shot "elected" signal for the scheduler gate.
//!
//! The notifier holds a single oneshot channel. The sending half is taken the
//! first time the node wins, so the result is delivered at most once no matter
//! how many code paths report a win. The receiving half is handed out once to
//! the single consumer. Sending never blocks, and the value is buffered, so a
//! consumer that subscribes after the win still sees it.

use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElectionResult {
    Elected,
}

impl fmt::Display for ElectionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElectionResult::Elected => write!(f, "elected"),
        }
    }
}

pub struct ResultNotifier {
    sender: Mutex<Option<oneshot::Sender<ElectionResult>>>,
    receiver: Mutex<Option<oneshot::Receiver<ElectionResult>>>,
}

impl Default for ResultNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultNotifier {
    pub fn new() -> Self {
        let (tx, rx) = oneshot::channel();
        Self {
            sender: Mutex::new(Some(tx)),
            receiver: Mutex::new(Some(rx)),
        }
    }

    /// Hands out the signal. Only the first caller gets one.
    pub fn subscribe(&self) -> Option<ElectedSignal> {
        self.receiver.lock().take().map(|rx| ElectedSignal { rx })
    }

    /// Publishes the result. Returns `true` only for the call that fired.
    pub fn notify(&self) -> bool {
        match self.sender.lock().take() {
            Some(tx) => {
                // A dropped consumer is not an error: the node is leader either way.
                let _ = tx.send(ElectionResult::Elected);
                true
            }
            None => false,
        }
    }
}

/// Resolves to `Some(ElectionResult::Elected)` when the node becomes leader,
/// or `None` if the election is dropped first.
pub struct ElectedSignal {
    rx: oneshot::Receiver<ElectionResult>,
}

impl Future for ElectedSignal {
    type Output = Option<ElectionResult>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|result| result.ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fires_once() {
        let notifier = ResultNotifier::new();
        let signal = notifier.subscribe().unwrap();
        assert!(notifier.subscribe().is_none());

        assert!(notifier.notify());
        assert!(!notifier.notify());

        assert_eq!(signal.await, Some(ElectionResult::Elected));
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_result() {
        let notifier = ResultNotifier::new();
        notifier.notify();
        let signal = notifier.subscribe().unwrap();
        let result = tokio::time::timeout(Duration::from_millis(100), signal).await;
        assert_eq!(result.unwrap(), Some(ElectionResult::Elected));
    }

    #[tokio::test]
    async fn test_dropped_notifier_resolves_none() {
        let notifier = ResultNotifier::new();
        let signal = notifier.subscribe().unwrap();
        drop(notifier);
        assert_eq!(signal.await, None);
    }

    #[test]
    fn test_notify_without_consumer() {
        let notifier = ResultNotifier::new();
        drop(notifier.subscribe());
        assert!(notifier.notify());
        assert_eq!(ElectionResult::Elected.to_string(), "elected");
    }
}
