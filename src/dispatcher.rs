//! Binds a decode → handle → encode pipeline to a bus address. The consumer
//! loop here is the only code that touches the transport: handlers hand back
//! a typed response (or fail), and every inbound message gets exactly one
//! reply no matter how the handler ends.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use prost::Message;
use tracing::{debug, warn};

use crate::bus::EventBus;

/// Subscribe `handler` on `address`. Decode failures, handler errors, and
/// handler panics all reply with `fallback`, or with a plain transport
/// failure when no fallback is supplied; nothing propagates past here.
pub fn bind<Req, Resp, H, Fut>(bus: &EventBus, address: &str, fallback: Option<Resp>, handler: H)
where
    Req: Message + Default + 'static,
    Resp: Message + Clone + 'static,
    H: Fn(Req) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Resp>> + Send + 'static,
{
    let mut rx = bus.consumer(address);
    let address = address.to_string();
    let handler = Arc::new(handler);
    debug!(%address, "binding consumer");

    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let handler = Arc::clone(&handler);
            let fallback = fallback.clone();
            let address = address.clone();
            tokio::spawn(async move {
                let body = message.body();
                let outcome = match Req::decode(body) {
                    Ok(request) => {
                        match AssertUnwindSafe(async { handler(request).await })
                            .catch_unwind()
                            .await
                        {
                            Ok(Ok(response)) => Some(response),
                            Ok(Err(e)) => {
                                warn!(%address, error = %e, "unexpected failure in handler");
                                None
                            }
                            Err(_) => {
                                warn!(%address, "handler panicked");
                                None
                            }
                        }
                    }
                    Err(e) => {
                        warn!(%address, error = %e, "undecodable request");
                        None
                    }
                };
                match outcome {
                    Some(response) => message.reply(response.encode_to_vec().into()),
                    None => match fallback {
                        Some(fallback) => message.reply(fallback.encode_to_vec().into()),
                        None => message.fail(500, "unexpected"),
                    },
                }
            });
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::BusError;
    use bytes::Bytes;

    #[derive(Clone, PartialEq, ::prost::Message)]
    struct Ping {
        #[prost(string, tag = "1")]
        text: String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    struct Pong {
        #[prost(string, tag = "1")]
        text: String,
    }

    fn fallback() -> Pong {
        Pong {
            text: "fallback".into(),
        }
    }

    async fn roundtrip(bus: &EventBus, address: &str, request: Ping) -> Pong {
        let reply = bus
            .request(address, request.encode_to_vec().into())
            .await
            .expect("one reply");
        Pong::decode(reply).expect("decodable reply")
    }

    #[tokio::test]
    async fn replies_with_handler_response() {
        let bus = EventBus::new();
        bind(&bus, "t.ok", Some(fallback()), |request: Ping| async move {
            Ok(Pong {
                text: format!("pong:{}", request.text),
            })
        });
        let pong = roundtrip(&bus, "t.ok", Ping { text: "1".into() }).await;
        assert_eq!(pong.text, "pong:1");
    }

    #[tokio::test]
    async fn handler_error_becomes_fallback_reply() {
        let bus = EventBus::new();
        bind(&bus, "t.err", Some(fallback()), |_: Ping| async move {
            anyhow::bail!("boom")
        });
        let pong = roundtrip(&bus, "t.err", Ping { text: "x".into() }).await;
        assert_eq!(pong, fallback());
    }

    #[tokio::test]
    async fn handler_panic_becomes_fallback_reply() {
        let bus = EventBus::new();
        bind(&bus, "t.panic", Some(fallback()), |_: Ping| async move {
            if true {
                panic!("boom");
            }
            Ok(Pong::default())
        });
        let pong = roundtrip(&bus, "t.panic", Ping { text: "x".into() }).await;
        assert_eq!(pong, fallback());
    }

    #[tokio::test]
    async fn undecodable_request_becomes_fallback_reply() {
        let bus = EventBus::new();
        bind(&bus, "t.garbage", Some(fallback()), |request: Ping| async move {
            Ok(Pong { text: request.text })
        });
        // invalid wire type on field 31
        let reply = bus
            .request("t.garbage", Bytes::from_static(&[0xff, 0xff, 0xff, 0xff]))
            .await
            .expect("one reply even for garbage");
        assert_eq!(Pong::decode(reply).expect("decodable"), fallback());
    }

    #[tokio::test]
    async fn without_fallback_failures_become_transport_errors() {
        let bus = EventBus::new();
        bind(&bus, "t.nofallback", None::<Pong>, |_: Ping| async move {
            anyhow::bail!("boom")
        });
        let err = bus
            .request("t.nofallback", Ping::default().encode_to_vec().into())
            .await
            .expect_err("transport failure");
        match err {
            BusError::Failure { code, message } => {
                assert_eq!(code, 500);
                assert_eq!(message, "unexpected");
            }
            other => panic!("expected Failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn concurrent_requests_each_get_their_own_reply() {
        let bus = Arc::new(EventBus::new());
        bind(&bus, "t.many", Some(fallback()), |request: Ping| async move {
            Ok(Pong { text: request.text })
        });
        let mut tasks = Vec::new();
        for i in 0..32 {
            let bus = Arc::clone(&bus);
            tasks.push(tokio::spawn(async move {
                let request = Ping {
                    text: i.to_string(),
                };
                let reply = bus
                    .request("t.many", request.encode_to_vec().into())
                    .await
                    .expect("reply");
                (i, Pong::decode(reply).expect("decodable"))
            }));
        }
        for task in tasks {
            let (i, pong) = task.await.expect("task");
            assert_eq!(pong.text, i.to_string());
        }
    }
}
