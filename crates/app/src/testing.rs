//! Test doubles shared by the unit tests of this crate.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use filmscreen_domain::error::ClientError;
use filmscreen_domain::protocol::Message;

use crate::ports::{ConnectionClient, InboundSender, Subscription, inbound_channel};

/// Scriptable [`ConnectionClient`] that records what it is asked to do.
#[derive(Default)]
pub(crate) struct FakeClient {
    pub refuse: AtomicBool,
    pub reject_auth: AtomicBool,
    pub connected: AtomicBool,
    pub closed: AtomicBool,
    pub fail_sends: AtomicBool,
    pub hang_sends: AtomicBool,
    pub sent: Mutex<Vec<Message>>,
    pub inbound: Mutex<Option<InboundSender>>,
    pub subscriptions: AtomicUsize,
}

impl FakeClient {
    pub fn connected() -> Self {
        let client = Self::default();
        client.connected.store(true, Ordering::SeqCst);
        client
    }

    /// Push a device message into the current subscription, waiting for
    /// room like a real read loop would.
    pub async fn emit(&self, message: Message) -> bool {
        let tx = self.inbound.lock().unwrap().clone();
        match tx {
            Some(tx) => tx.deliver(message).await,
            None => false,
        }
    }

    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().unwrap().clone()
    }
}

impl ConnectionClient for FakeClient {
    async fn connect(&self) -> Result<bool, ClientError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err("connection refused".into());
        }
        if self.reject_auth.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(true)
    }

    async fn send(&self, message: Message) -> Result<(), ClientError> {
        if self.hang_sends.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err("broken pipe".into());
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
    }

    fn subscribe(&self) -> Subscription {
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        let (tx, sub) = inbound_channel();
        *self.inbound.lock().unwrap() = Some(tx);
        sub
    }

    fn unsubscribe(&self) {
        self.inbound.lock().unwrap().take();
    }
}
