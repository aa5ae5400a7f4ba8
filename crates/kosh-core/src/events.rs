//! Domain change notifications.
//!
//! Persistence writes do not schedule any follow-up work themselves; they
//! emit an event and an external subscriber (sync scheduler, UI refresh)
//! decides what to do and when. Send failures mean nobody is listening,
//! which is fine.

use tokio::sync::broadcast;

/// A change to persisted domain data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// One or more transactions were inserted
    TransactionsChanged { added: usize },
    /// Subscriptions were created or updated
    SubscriptionsChanged { count: usize },
}

/// Broadcast fan-out for [`ChangeEvent`]s. Cheap to clone; every clone
/// publishes into the same channel.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. A lagging or absent subscriber never fails the
    /// write that triggered the event.
    pub fn notify(&self, event: ChangeEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_events() {
        let notifier = ChangeNotifier::new();
        let mut rx = notifier.subscribe();

        notifier.notify(ChangeEvent::TransactionsChanged { added: 3 });
        assert_eq!(
            rx.recv().await.unwrap(),
            ChangeEvent::TransactionsChanged { added: 3 }
        );
    }

    #[test]
    fn notify_without_subscribers_is_a_noop() {
        let notifier = ChangeNotifier::new();
        notifier.notify(ChangeEvent::SubscriptionsChanged { count: 1 });
    }
}
