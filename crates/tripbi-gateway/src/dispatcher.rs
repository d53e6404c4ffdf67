use std::sync::Arc;

use tokio::sync::broadcast;

use tripbi_types::events::GatewayEvent;

/// Fan-out hub for gateway events.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Broadcast channel for gateway events. Every connection receives every
    /// event and filters by its own trip subscriptions.
    broadcast_tx: broadcast::Sender<GatewayEvent>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner { broadcast_tx }),
        }
    }

    /// Subscribe to gateway events. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Broadcast an event to all connected clients.
    pub fn broadcast(&self, event: GatewayEvent) {
        let _ = self.inner.broadcast_tx.send(event);
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_broadcast_reaches_all_subscribers() {
        let dispatcher = Dispatcher::new();
        let mut rx_a = dispatcher.subscribe();
        let mut rx_b = dispatcher.subscribe();

        let trip_id = Uuid::new_v4();
        dispatcher.broadcast(GatewayEvent::TripUpdated { trip_id });

        for rx in [&mut rx_a, &mut rx_b] {
            match rx.recv().await.unwrap() {
                GatewayEvent::TripUpdated { trip_id: got } => assert_eq!(got, trip_id),
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[test]
    fn test_broadcast_without_subscribers_is_a_noop() {
        let dispatcher = Dispatcher::new();
        dispatcher.broadcast(GatewayEvent::TripDeleted {
            trip_id: Uuid::new_v4(),
        });
    }
}
