//! Broadcast router: fan a chat message out to the sender's session peers.
//!
//! Delivery walks the client registry under its lock and *enqueues* the
//! frame on each recipient's outbound queue.  Enqueueing never waits on a
//! socket: every connection has its own writer task draining a bounded
//! queue, so a slow or stalled peer only delays itself, not the other
//! recipients or the sender.  Once a stalled peer's queue is full, further
//! messages for that peer are dropped.

use chat_core::Frame;

use crate::application::client_registry::ClientRegistry;

/// Delivers `frame` to every client in `session` except `exclude`.
///
/// Returns the number of recipients the frame was queued for.  Recipients
/// whose queue is full or whose connection has already gone away are
/// skipped; their own connection task is responsible for unregistering them.
pub async fn deliver(clients: &ClientRegistry, session: &str, frame: &Frame, exclude: &str) -> usize {
    clients
        .with_clients(|all| {
            let mut delivered = 0;
            for client in all.values() {
                if !client.is_in(session) || client.identifier == exclude {
                    continue;
                }
                if client.send(frame.clone()) {
                    delivered += 1;
                }
            }
            delivered
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::client_registry::{
        outbound_queue, ClientConnection, OUTBOUND_CAPACITY,
    };
    use chat_core::MessageType;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    async fn join(
        clients: &ClientRegistry,
        identifier: &str,
        session: Option<&str>,
    ) -> mpsc::Receiver<Frame> {
        let (tx, rx) = outbound_queue();
        clients
            .add(ClientConnection::new(identifier, Uuid::new_v4(), tx))
            .await
            .unwrap();
        clients
            .set_session(identifier, session.map(str::to_string))
            .await
            .unwrap();
        rx
    }

    #[tokio::test]
    async fn test_deliver_reaches_peers_but_not_sender() {
        // Arrange
        let clients = ClientRegistry::new();
        let mut ken = join(&clients, "ken", Some("team")).await;
        let mut andy = join(&clients, "andy", Some("team")).await;
        let mut sam = join(&clients, "sam", Some("team")).await;
        let frame = Frame::new(MessageType::Message, "ken", "hello");

        // Act
        let delivered = deliver(&clients, "team", &frame, "ken").await;

        // Assert
        assert_eq!(delivered, 2);
        assert_eq!(andy.try_recv().unwrap(), frame);
        assert_eq!(sam.try_recv().unwrap(), frame);
        assert!(ken.try_recv().is_err(), "sender must not receive its own message");
    }

    #[tokio::test]
    async fn test_deliver_skips_other_sessions_and_idle_clients() {
        let clients = ClientRegistry::new();
        let _ken = join(&clients, "ken", Some("team")).await;
        let mut other = join(&clients, "andy", Some("other")).await;
        let mut idle = join(&clients, "sam", None).await;
        let frame = Frame::new(MessageType::Message, "ken", "hello");

        let delivered = deliver(&clients, "team", &frame, "ken").await;

        assert_eq!(delivered, 0);
        assert!(other.try_recv().is_err());
        assert!(idle.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_deliver_skips_closed_connections() {
        let clients = ClientRegistry::new();
        let _ken = join(&clients, "ken", Some("team")).await;
        let gone = join(&clients, "andy", Some("team")).await;
        let mut sam = join(&clients, "sam", Some("team")).await;
        drop(gone);
        let frame = Frame::new(MessageType::Message, "ken", "hi");

        let delivered = deliver(&clients, "team", &frame, "ken").await;

        assert_eq!(delivered, 1);
        assert_eq!(sam.try_recv().unwrap().payload, "hi");
    }

    #[tokio::test]
    async fn test_stalled_peer_queue_stays_bounded() {
        // Arrange
        let clients = ClientRegistry::new();
        let _ken = join(&clients, "ken", Some("team")).await;
        let mut stalled = join(&clients, "andy", Some("team")).await;
        let mut reader = join(&clients, "sam", Some("team")).await;
        let frame = Frame::new(MessageType::Message, "ken", "x".repeat(1000));

        // Act: sam keeps up, andy never reads.
        let mut reached_andy = 0;
        for _ in 0..OUTBOUND_CAPACITY * 10 {
            reached_andy += deliver(&clients, "team", &frame, "ken").await - 1;
            assert_eq!(reader.try_recv().unwrap(), frame);
        }

        // Assert
        assert_eq!(reached_andy, OUTBOUND_CAPACITY);
        let mut queued = 0;
        while stalled.try_recv().is_ok() {
            queued += 1;
        }
        assert_eq!(queued, OUTBOUND_CAPACITY);
    }
}
