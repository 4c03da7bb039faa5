//! Stub overlay node for integration tests
//!
//! Serves XML-RPC over HTTP on a random loopback port. Every decoded call is
//! recorded and answered by a caller-supplied handler.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use resdisc_common::xmlrpc::{decode_method_call, encode_fault, encode_method_response};
use resdisc_common::Address;
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// What the stub sends back for one call
pub enum StubReply {
    Value(Value),
    Fault(i32, String),
    Status(StatusCode, String),
    Raw(String),
    Delay(Duration, Box<StubReply>),
}

type Handler = Arc<dyn Fn(&str, &[Value]) -> StubReply + Send + Sync>;

/// A recorded call: method name, parameters, request path
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub params: Vec<Value>,
    pub path: String,
}

pub struct StubOverlay {
    addr: SocketAddr,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl StubOverlay {
    /// Starts a stub answering every call with `handler`
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&str, &[Value]) -> StubReply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let handler: Handler = Arc::new(handler);

        let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel();

        let server_calls = calls.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        let Ok((stream, _)) = result else { continue };
                        let io = TokioIo::new(stream);
                        let handler = handler.clone();
                        let calls = server_calls.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                handle(req, handler.clone(), calls.clone())
                            });
                            let _ = http1::Builder::new().serve_connection(io, service).await;
                        });
                    }
                    _ = &mut shutdown_rx => break,
                }
            }
        });

        Self {
            addr,
            calls,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Starts a stub behaving like an overlay node whose own address is
    /// `self_addr` and whose map-reduce tasks all return `start_result`
    pub async fn node(self_addr: &Address, start_result: Value) -> Self {
        let self_text = self_addr.to_string();
        Self::start(move |method, params| {
            if method != "localproxy" {
                return StubReply::Fault(-32601, format!("No handler for {}", method));
            }
            match params.first().and_then(Value::as_str) {
                Some("sys:link.GetNeighbors") => StubReply::Value(json!({
                    "self": self_text,
                    "left": "brunet:node:AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA",
                })),
                Some("mapreduce.Start") => StubReply::Value(start_result.clone()),
                other => StubReply::Fault(-32601, format!("No handler for {:?}", other)),
            }
        })
        .await
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Full XML-RPC endpoint URL
    pub fn url(&self) -> String {
        format!("http://{}/xm.rem", self.addr)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl Drop for StubOverlay {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn handle(
    req: Request<Incoming>,
    handler: Handler,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let path = req.uri().path().to_string();
    let body = req.into_body().collect().await?.to_bytes();

    let (method, params) = match decode_method_call(&String::from_utf8_lossy(&body)) {
        Ok(call) => call,
        Err(e) => return Ok(reply(StatusCode::BAD_REQUEST, e.to_string())),
    };

    calls.lock().unwrap().push(RecordedCall {
        method: method.clone(),
        params: params.clone(),
        path,
    });

    let mut outcome = handler(&method, &params);
    while let StubReply::Delay(delay, inner) = outcome {
        tokio::time::sleep(delay).await;
        outcome = *inner;
    }

    Ok(match outcome {
        StubReply::Value(value) => reply(StatusCode::OK, encode_method_response(&value).unwrap()),
        StubReply::Fault(code, message) => reply(StatusCode::OK, encode_fault(code, &message)),
        StubReply::Status(status, body) => reply(status, body),
        StubReply::Raw(body) => reply(StatusCode::OK, body),
        StubReply::Delay(..) => unreachable!(),
    })
}

fn reply(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/xml")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}
