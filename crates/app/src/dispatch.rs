//! Device dispatch: the single consumer of a CVM client's inbound stream.
//!
//! The dispatch subscribes once to the [`ConnectionClient`] and routes every
//! inbound message to the handler registered for the message's motor
//! address. Outbound commands pass straight through to the client.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

use filmscreen_domain::error::FilmscreenError;
use filmscreen_domain::protocol::{Message, Motor};

use crate::ports::{ConnectionClient, MessageHandler, Subscription};

/// Motor address → handler. At most one handler per address.
#[derive(Default)]
struct RouteTable {
    handlers: Mutex<HashMap<Motor, Arc<dyn MessageHandler>>>,
}

impl RouteTable {
    fn lock(&self) -> MutexGuard<'_, HashMap<Motor, Arc<dyn MessageHandler>>> {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    async fn route(&self, message: &Message) -> Result<(), FilmscreenError> {
        tracing::debug!(motor = %message.motor, ?message, "received state message from CVM");

        // Clone out of the table so the lock is not held across the await.
        let handler = self.lock().get(&message.motor).cloned();
        match handler {
            Some(handler) => handler.handle(message).await,
            None => {
                tracing::trace!(motor = %message.motor, "no handler registered, dropping message");
                Ok(())
            }
        }
    }
}

/// Routes CVM messages to per-motor handlers and forwards commands.
pub struct DeviceDispatch<C> {
    client: Arc<C>,
    routes: Arc<RouteTable>,
    router: Mutex<Option<JoinHandle<()>>>,
    send_timeout: Option<Duration>,
    closed: AtomicBool,
}

impl<C: ConnectionClient> DeviceDispatch<C> {
    /// Subscribe to `client` and start routing its inbound messages.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(client: Arc<C>) -> Self {
        let routes = Arc::new(RouteTable::default());
        let subscription = client.subscribe();
        let router = tokio::spawn(run_router(subscription, Arc::clone(&routes)));

        Self {
            client,
            routes,
            router: Mutex::new(Some(router)),
            send_timeout: None,
            closed: AtomicBool::new(false),
        }
    }

    /// Bound every [`send_command`](Self::send_command) by `timeout`.
    #[must_use]
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = Some(timeout);
        self
    }

    /// Register `handler` for `motor`, replacing any previous handler.
    pub fn register(&self, motor: Motor, handler: Arc<dyn MessageHandler>) {
        if self.routes.lock().insert(motor, handler).is_some() {
            tracing::debug!(%motor, "replaced message handler");
        }
    }

    /// Remove `handler` from `motor`.
    ///
    /// Nothing happens if `motor` is now served by another handler. Returns
    /// whether `handler` was removed.
    pub fn deregister(&self, motor: Motor, handler: &Arc<dyn MessageHandler>) -> bool {
        let mut routes = self.routes.lock();
        match routes.get(&motor) {
            Some(current) if Arc::ptr_eq(current, handler) => {
                routes.remove(&motor);
                true
            }
            _ => false,
        }
    }

    /// Deliver `message` to the handler registered for its motor, if any.
    ///
    /// Unrouted messages are dropped silently.
    ///
    /// # Errors
    ///
    /// Returns whatever the handler returned.
    pub async fn route(&self, message: &Message) -> Result<(), FilmscreenError> {
        self.routes.route(message).await
    }

    /// Send a command through the client, unmodified.
    ///
    /// # Errors
    ///
    /// Returns [`FilmscreenError::Client`] with the client's error, or
    /// [`FilmscreenError::Timeout`] when a send timeout is configured and
    /// elapses first.
    pub async fn send_command(&self, message: Message) -> Result<(), FilmscreenError> {
        tracing::debug!(motor = %message.motor, ?message, "sending command to CVM");
        let send = self.client.send(message);
        let result = match self.send_timeout {
            Some(limit) => tokio::time::timeout(limit, send)
                .await
                .map_err(|_| FilmscreenError::Timeout(limit))?,
            None => send.await,
        };
        result.map_err(FilmscreenError::Client)
    }

    /// Current connectivity as reported by the client.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.client.is_connected()
    }

    /// Release the subscription, close the client and clear the handlers.
    ///
    /// Only the first call has an effect.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.client.unsubscribe();
        self.client.close();
        self.routes.lock().clear();
        if let Some(router) = self.take_router() {
            router.abort();
        }
        tracing::info!("device dispatch closed");
    }

    fn take_router(&self) -> Option<JoinHandle<()>> {
        self.router
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl<C> Drop for DeviceDispatch<C> {
    fn drop(&mut self) {
        let router = self
            .router
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(router) = router {
            router.abort();
        }
    }
}

/// Route messages one at a time, in arrival order, until the client
/// releases the subscription.
async fn run_router(mut subscription: Subscription, routes: Arc<RouteTable>) {
    while let Some(message) = subscription.next().await {
        if let Err(err) = routes.route(&message).await {
            tracing::warn!(motor = %message.motor, error = %err, "failed to handle CVM message");
        }
    }
    tracing::debug!("CVM inbound subscription ended");
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use filmscreen_domain::error::DataFormatError;
    use filmscreen_domain::protocol::{Command, Event, QueryKind, Status};
    use tokio::sync::mpsc;

    use super::*;
    use crate::ports::HandlerFuture;
    use crate::testing::FakeClient;

    /// Forwards every handled message, tagged, to a channel.
    struct Forward {
        tag: &'static str,
        tx: mpsc::UnboundedSender<(&'static str, Message)>,
    }

    impl MessageHandler for Forward {
        fn handle<'a>(&'a self, message: &'a Message) -> HandlerFuture<'a> {
            Box::pin(async move {
                let _ = self.tx.send((self.tag, message.clone()));
                Ok(())
            })
        }
    }

    struct Failing;

    impl MessageHandler for Failing {
        fn handle<'a>(&'a self, _message: &'a Message) -> HandlerFuture<'a> {
            Box::pin(async {
                Err(FilmscreenError::DataFormat(DataFormatError::InvalidPosition(
                    "x".to_string(),
                )))
            })
        }
    }

    fn forward(
        tag: &'static str,
    ) -> (
        Arc<dyn MessageHandler>,
        mpsc::UnboundedReceiver<(&'static str, Message)>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Forward { tag, tx }), rx)
    }

    fn stop(motor: Motor) -> Message {
        Message::event(motor, Event::Status(Status::Stop))
    }

    #[tokio::test]
    async fn should_subscribe_once_on_creation() {
        let client = Arc::new(FakeClient::default());
        let _dispatch = DeviceDispatch::new(Arc::clone(&client));
        assert_eq!(client.subscriptions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn should_route_only_to_matching_address() {
        let client = Arc::new(FakeClient::default());
        let dispatch = DeviceDispatch::new(client);
        let (a, mut rx_a) = forward("a");
        let (b, mut rx_b) = forward("b");
        dispatch.register(Motor::A, a);
        dispatch.register(Motor::B, b);

        dispatch.route(&stop(Motor::B)).await.unwrap();

        assert_eq!(rx_b.try_recv().unwrap().1.motor, Motor::B);
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn should_not_deliver_broadcast_to_motor_handlers() {
        let client = Arc::new(FakeClient::default());
        let dispatch = DeviceDispatch::new(client);
        let (a, mut rx_a) = forward("a");
        dispatch.register(Motor::A, a);

        dispatch.route(&stop(Motor::All)).await.unwrap();

        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn should_deliver_broadcast_to_device_wide_handler() {
        let client = Arc::new(FakeClient::default());
        let dispatch = DeviceDispatch::new(client);
        let (all, mut rx_all) = forward("all");
        dispatch.register(Motor::All, all);

        let recall = Message::command(Motor::All, Command::Recall(2));
        dispatch.route(&recall).await.unwrap();

        assert_eq!(rx_all.try_recv().unwrap().1, recall);
    }

    #[tokio::test]
    async fn should_drop_unrouted_messages_silently() {
        let client = Arc::new(FakeClient::default());
        let dispatch = DeviceDispatch::new(client);
        assert!(dispatch.route(&stop(Motor::C)).await.is_ok());
    }

    #[tokio::test]
    async fn should_replace_handler_on_re_registration() {
        let client = Arc::new(FakeClient::default());
        let dispatch = DeviceDispatch::new(client);
        let (old, mut rx_old) = forward("old");
        let (new, mut rx_new) = forward("new");
        dispatch.register(Motor::D, old);
        dispatch.register(Motor::D, new);

        dispatch.route(&stop(Motor::D)).await.unwrap();

        assert_eq!(rx_new.try_recv().unwrap().0, "new");
        assert!(rx_old.try_recv().is_err());
    }

    #[tokio::test]
    async fn should_stop_routing_after_deregistration() {
        let client = Arc::new(FakeClient::default());
        let dispatch = DeviceDispatch::new(client);
        let (a, mut rx_a) = forward("a");
        dispatch.register(Motor::A, Arc::clone(&a));

        assert!(dispatch.deregister(Motor::A, &a));
        assert!(!dispatch.deregister(Motor::A, &a));
        dispatch.route(&stop(Motor::A)).await.unwrap();

        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn should_keep_replacement_when_stale_handler_deregisters() {
        let client = Arc::new(FakeClient::default());
        let dispatch = DeviceDispatch::new(client);
        let (old, mut rx_old) = forward("old");
        let (new, mut rx_new) = forward("new");
        dispatch.register(Motor::A, Arc::clone(&old));
        dispatch.register(Motor::A, new);

        assert!(!dispatch.deregister(Motor::A, &old));
        dispatch.route(&stop(Motor::A)).await.unwrap();

        assert_eq!(rx_new.try_recv().unwrap().0, "new");
        assert!(rx_old.try_recv().is_err());
    }

    #[tokio::test]
    async fn should_surface_handler_errors_to_caller() {
        let client = Arc::new(FakeClient::default());
        let dispatch = DeviceDispatch::new(client);
        dispatch.register(Motor::A, Arc::new(Failing));

        let result = dispatch.route(&stop(Motor::A)).await;
        assert!(matches!(result, Err(FilmscreenError::DataFormat(_))));
    }

    #[tokio::test]
    async fn should_route_client_messages_in_arrival_order() {
        let client = Arc::new(FakeClient::default());
        let dispatch = DeviceDispatch::new(Arc::clone(&client));
        let (tx, mut rx) = mpsc::unbounded_channel();
        dispatch.register(Motor::A, Arc::new(Forward { tag: "a", tx: tx.clone() }));
        dispatch.register(Motor::B, Arc::new(Forward { tag: "b", tx }));

        assert!(client.emit(stop(Motor::B)).await);
        assert!(client.emit(stop(Motor::A)).await);
        assert!(client.emit(stop(Motor::B)).await);

        let mut tags = Vec::new();
        for _ in 0..3 {
            let (tag, _) = tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .unwrap()
                .unwrap();
            tags.push(tag);
        }
        assert_eq!(tags, vec!["b", "a", "b"]);
    }

    #[tokio::test]
    async fn should_keep_routing_after_handler_error() {
        let client = Arc::new(FakeClient::default());
        let dispatch = DeviceDispatch::new(Arc::clone(&client));
        let (b, mut rx_b) = forward("b");
        dispatch.register(Motor::A, Arc::new(Failing));
        dispatch.register(Motor::B, b);

        client.emit(stop(Motor::A)).await;
        client.emit(stop(Motor::B)).await;

        let (tag, _) = tokio::time::timeout(Duration::from_secs(1), rx_b.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tag, "b");
    }

    /// Holds every message until the test lets it through.
    struct Gated {
        gate: Arc<tokio::sync::Semaphore>,
        handled: Arc<AtomicUsize>,
    }

    impl MessageHandler for Gated {
        fn handle<'a>(&'a self, _message: &'a Message) -> HandlerFuture<'a> {
            Box::pin(async move {
                if let Ok(permit) = self.gate.acquire().await {
                    permit.forget();
                }
                self.handled.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn should_hold_back_client_while_handler_runs() {
        let client = Arc::new(FakeClient::default());
        let dispatch = DeviceDispatch::new(Arc::clone(&client));
        let gate = Arc::new(tokio::sync::Semaphore::new(0));
        let handled = Arc::new(AtomicUsize::new(0));
        dispatch.register(
            Motor::A,
            Arc::new(Gated {
                gate: Arc::clone(&gate),
                handled: Arc::clone(&handled),
            }),
        );

        let delivered = Arc::new(AtomicUsize::new(0));
        let producer = {
            let client = Arc::clone(&client);
            let delivered = Arc::clone(&delivered);
            tokio::spawn(async move {
                for _ in 0..10 {
                    if !client.emit(stop(Motor::A)).await {
                        break;
                    }
                    delivered.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(handled.load(Ordering::SeqCst), 0);
        // One message is in the handler, at most one more is queued.
        assert!(delivered.load(Ordering::SeqCst) <= 2);

        gate.add_permits(10);
        tokio::time::timeout(Duration::from_secs(1), producer)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(delivered.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn should_forward_commands_unmodified() {
        let client = Arc::new(FakeClient::default());
        let dispatch = DeviceDispatch::new(Arc::clone(&client));

        let query = Message::query(Motor::C, QueryKind::Position);
        dispatch.send_command(query.clone()).await.unwrap();

        assert_eq!(*client.sent.lock().unwrap(), vec![query]);
    }

    #[tokio::test]
    async fn should_propagate_client_send_errors() {
        let client = Arc::new(FakeClient::default());
        client.fail_sends.store(true, Ordering::SeqCst);
        let dispatch = DeviceDispatch::new(client);

        let err = dispatch
            .send_command(Message::command(Motor::A, Command::Up))
            .await
            .unwrap_err();
        assert!(matches!(err, FilmscreenError::Client(ref e) if e.to_string() == "broken pipe"));
    }

    #[tokio::test]
    async fn should_time_out_hanging_sends_when_bounded() {
        let client = Arc::new(FakeClient::default());
        client.hang_sends.store(true, Ordering::SeqCst);
        let dispatch =
            DeviceDispatch::new(client).with_send_timeout(Duration::from_millis(10));

        let err = dispatch
            .send_command(Message::command(Motor::A, Command::Stop))
            .await
            .unwrap_err();
        assert!(matches!(err, FilmscreenError::Timeout(_)));
    }

    #[tokio::test]
    async fn should_mirror_client_connectivity() {
        let client = Arc::new(FakeClient::default());
        let dispatch = DeviceDispatch::new(Arc::clone(&client));
        assert!(!dispatch.is_connected());

        client.connect().await.unwrap();
        assert!(dispatch.is_connected());

        client.connected.store(false, Ordering::SeqCst);
        assert!(!dispatch.is_connected());
    }

    #[tokio::test]
    async fn should_release_client_and_clear_table_on_close() {
        let client = Arc::new(FakeClient::default());
        let dispatch = DeviceDispatch::new(Arc::clone(&client));
        let (a, mut rx_a) = forward("a");
        dispatch.register(Motor::A, a);

        dispatch.close();

        assert!(client.closed.load(Ordering::SeqCst));
        assert!(client.inbound.lock().unwrap().is_none());
        dispatch.route(&stop(Motor::A)).await.unwrap();
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn should_tolerate_repeated_close() {
        let client = Arc::new(FakeClient::default());
        let dispatch = DeviceDispatch::new(client);
        dispatch.close();
        dispatch.close();
    }
}
