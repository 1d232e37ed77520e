//! Success/error notifications for the presentation layer (toasts).

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self { level: Level::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: Level::Error, message: message.into() }
    }
}

#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    /// Nobody listening is fine; the notification is dropped.
    pub fn publish(&self, notification: Notification) {
        debug!(level = ?notification.level, message = %notification.message, "notification");
        let _ = self.tx.send(notification);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.publish(Notification::success(message))
    }

    pub fn error(&self, message: impl Into<String>) {
        self.publish(Notification::error(message))
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_in_order() {
        let notifier = Notifier::default();
        let mut rx = notifier.subscribe();
        notifier.success("Product deleted");
        notifier.error("Error: offline");
        assert_eq!(rx.recv().await.unwrap(), Notification::success("Product deleted"));
        assert_eq!(rx.recv().await.unwrap().level, Level::Error);
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        Notifier::new(1).success("nobody hears this");
    }
}
