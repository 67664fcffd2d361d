//! In-process request/reply message bus. One consumer per address; requests
//! carry a single-use reply slot, so a handler can answer at most once and
//! the dispatcher decides what that answer is.

use std::collections::HashMap;
use std::sync::Mutex;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("no consumer registered on address {0:?}")]
    NoConsumer(String),
    #[error("consumer on address {0:?} dropped the request without replying")]
    NoReply(String),
    #[error("request failed with code {code}: {message}")]
    Failure { code: i32, message: String },
}

type Reply = Result<Bytes, (i32, String)>;

pub struct BusMessage {
    body: Bytes,
    reply_to: oneshot::Sender<Reply>,
}

impl BusMessage {
    pub fn body(&self) -> Bytes {
        self.body.clone()
    }

    /// Send the reply. Consumes the message; the reply slot is single-use.
    pub fn reply(self, body: Bytes) {
        // the requester may have given up waiting; nothing to do then
        let _ = self.reply_to.send(Ok(body));
    }

    /// Report a transport-level failure instead of a payload.
    pub fn fail(self, code: i32, message: &str) {
        let _ = self.reply_to.send(Err((code, message.to_string())));
    }
}

#[derive(Default)]
pub struct EventBus {
    consumers: Mutex<HashMap<String, mpsc::UnboundedSender<BusMessage>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the consuming side of an address. A later registration on the
    /// same address replaces the earlier one.
    pub fn consumer(&self, address: &str) -> mpsc::UnboundedReceiver<BusMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.consumers
            .lock()
            .expect("bus consumer registry poisoned")
            .insert(address.to_string(), tx);
        rx
    }

    /// Send a request to an address and wait for the single reply.
    pub async fn request(&self, address: &str, body: Bytes) -> Result<Bytes, BusError> {
        let (reply_to, reply) = oneshot::channel();
        let message = BusMessage { body, reply_to };
        {
            let consumers = self
                .consumers
                .lock()
                .expect("bus consumer registry poisoned");
            let Some(tx) = consumers.get(address) else {
                return Err(BusError::NoConsumer(address.to_string()));
            };
            tx.send(message)
                .map_err(|_| BusError::NoConsumer(address.to_string()))?;
        }
        match reply.await {
            Ok(Ok(body)) => Ok(body),
            Ok(Err((code, message))) => Err(BusError::Failure { code, message }),
            Err(_) => Err(BusError::NoReply(address.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn request_reaches_consumer_and_reply_comes_back() {
        let bus = EventBus::new();
        let mut rx = bus.consumer("echo");
        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                let body = message.body();
                message.reply(body);
            }
        });
        let reply = bus
            .request("echo", Bytes::from_static(b"ping"))
            .await
            .expect("reply");
        assert_eq!(reply, Bytes::from_static(b"ping"));
    }

    #[tokio::test]
    async fn request_to_unknown_address_fails_fast() {
        let bus = EventBus::new();
        let err = bus
            .request("nowhere", Bytes::new())
            .await
            .expect_err("no consumer");
        assert!(matches!(err, BusError::NoConsumer(a) if a == "nowhere"));
    }

    #[tokio::test]
    async fn failed_message_carries_code_and_text() {
        let bus = EventBus::new();
        let mut rx = bus.consumer("failing");
        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                message.fail(500, "unexpected");
            }
        });
        let err = bus
            .request("failing", Bytes::new())
            .await
            .expect_err("failure");
        match err {
            BusError::Failure { code, message } => {
                assert_eq!(code, 500);
                assert_eq!(message, "unexpected");
            }
            other => panic!("expected Failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dropped_message_surfaces_as_no_reply() {
        let bus = EventBus::new();
        let mut rx = bus.consumer("void");
        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                drop(message);
            }
        });
        let err = bus.request("void", Bytes::new()).await.expect_err("dropped");
        assert!(matches!(err, BusError::NoReply(_)));
    }
}
