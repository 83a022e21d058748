//! Connection port: the client that owns the physical link to the CVM.
//!
//! The client handles sockets, authentication and framing. It hands parsed
//! [`Message`]s to whoever holds its single inbound [`Subscription`].

use std::future::Future;

use tokio::sync::mpsc;

use filmscreen_domain::error::ClientError;
use filmscreen_domain::protocol::Message;

/// Client for one CVM controller.
///
/// Implementations keep exactly one inbound slot: calling
/// [`subscribe`](Self::subscribe) again replaces the previous subscription,
/// whose stream then ends.
pub trait ConnectionClient: Send + Sync + 'static {
    /// Open the link and log in.
    ///
    /// Resolves to `Ok(false)` when the transport came up but the device
    /// rejected the credentials.
    fn connect(&self) -> impl Future<Output = Result<bool, ClientError>> + Send;

    /// Send one command to the device.
    fn send(&self, message: Message) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// Whether the link is currently up and authenticated.
    fn is_connected(&self) -> bool;

    /// Drop the link. Further sends fail.
    fn close(&self);

    /// Take the inbound slot.
    fn subscribe(&self) -> Subscription;

    /// Release the inbound slot, ending the current subscription.
    fn unsubscribe(&self);
}

/// Messages a client may hand over before it has to wait for the routing
/// loop. With one slot, the client's read loop stays at most one message
/// ahead of the handler currently running.
pub const INBOUND_CAPACITY: usize = 1;

/// Create a connected sender / subscription pair.
///
/// Clients call this from [`ConnectionClient::subscribe`], keep the sender in
/// their inbound slot and return the subscription.
#[must_use]
pub fn inbound_channel() -> (InboundSender, Subscription) {
    let (tx, rx) = mpsc::channel(INBOUND_CAPACITY);
    (InboundSender(tx), Subscription(rx))
}

/// Client side of the inbound slot.
#[derive(Debug, Clone)]
pub struct InboundSender(mpsc::Sender<Message>);

impl InboundSender {
    /// Hand a parsed message to the subscriber, waiting while the routing
    /// loop is still busy with earlier ones.
    ///
    /// Returns `false` if the subscription has been dropped.
    pub async fn deliver(&self, message: Message) -> bool {
        self.0.send(message).await.is_ok()
    }
}

/// Owned handle on the client's inbound message stream.
///
/// Messages arrive in the order the client produced them.
#[derive(Debug)]
pub struct Subscription(mpsc::Receiver<Message>);

impl Subscription {
    /// Wait for the next message. `None` once the client released the slot.
    pub async fn next(&mut self) -> Option<Message> {
        self.0.recv().await
    }
}
