//! Stub overlay node for the CLI tests
//!
//! Answers `localproxy` calls over HTTP on a random loopback port and records
//! every call it decodes. Only successful replies and faults are needed here;
//! transport-level failures are covered by the client crate's tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

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

pub enum StubReply {
    Value(Value),
    Fault(i32, String),
}

type Handler = Arc<dyn Fn(&str, &[Value]) -> StubReply + Send + Sync>;

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
                        let handler = handler.clone();
                        let calls = server_calls.clone();
                        tokio::spawn(async move {
                            let service = service_fn(move |req| answer(req, handler.clone(), calls.clone()));
                            let _ = http1::Builder::new()
                                .serve_connection(TokioIo::new(stream), service)
                                .await;
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

    /// A node whose own address is `self_addr`; every map-reduce task
    /// returns `start_result`
    pub async fn node(self_addr: &Address, start_result: Value) -> Self {
        let self_text = self_addr.to_string();
        Self::start(move |_, params| match params.first().and_then(Value::as_str) {
            Some("sys:link.GetNeighbors") => StubReply::Value(json!({"self": self_text})),
            Some("mapreduce.Start") => StubReply::Value(start_result.clone()),
            other => StubReply::Fault(-32601, format!("No handler for {:?}", other)),
        })
        .await
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
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

async fn answer(
    req: Request<Incoming>,
    handler: Handler,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let path = req.uri().path().to_string();
    let body = req.into_body().collect().await?.to_bytes();

    let (status, xml) = match decode_method_call(&String::from_utf8_lossy(&body)) {
        Ok((method, params)) => {
            let reply = handler(&method, &params);
            calls.lock().unwrap().push(RecordedCall { method, params, path });
            match reply {
                StubReply::Value(value) => (StatusCode::OK, encode_method_response(&value).unwrap()),
                StubReply::Fault(code, message) => (StatusCode::OK, encode_fault(code, &message)),
            }
        }
        Err(e) => (StatusCode::BAD_REQUEST, e.to_string()),
    };

    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "text/xml")
        .body(Full::new(Bytes::from(xml)))
        .unwrap())
}
