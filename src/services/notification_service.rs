use tokio::sync::broadcast;

use crate::{
    constants::NOTIFICATION_CHANNEL_CAPACITY,
    models::{Notification, NotificationKind},
    services::collaborators::NotificationSink,
};

/// Logs every notification and fans it out to WebSocket subscribers
#[derive(Clone)]
pub struct NotificationService {
    sender: broadcast::Sender<Notification>,
}

impl NotificationService {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(NOTIFICATION_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for NotificationService {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationSink for NotificationService {
    fn notify(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Error => tracing::warn!(
                "Notification: {} - {}",
                notification.title,
                notification.message
            ),
            _ => tracing::info!(
                "Notification: {} - {}",
                notification.title,
                notification.message
            ),
        }
        // No subscribers is fine.
        let _ = self.sender.send(notification);
    }
}
