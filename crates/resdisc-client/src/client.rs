use std::time::Duration;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::{Method, Request, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use resdisc_common::error::{ResdiscError, Result};
use resdisc_common::xmlrpc::{decode_method_response, encode_method_call};
use serde_json::Value;
use tracing::debug;

/// Path the overlay's XML-RPC bridge is mounted on.
pub const XMLRPC_PATH: &str = "/xm.rem";

/// Entry point that forwards a call to a service of the local overlay node.
pub const LOCALPROXY_METHOD: &str = "localproxy";

/// Builds the XML-RPC endpoint URL for an overlay node.
///
/// # Example
///
/// ```
/// use resdisc_client::endpoint_url;
///
/// assert_eq!(endpoint_url("10.0.0.7", 10000), "http://10.0.0.7:10000/xm.rem");
/// ```
pub fn endpoint_url(host: &str, port: u16) -> String {
    format!("http://{}:{}{}", host, port, XMLRPC_PATH)
}

/// Client configuration.
///
/// # Default Configuration
///
/// - `timeout`: 60 seconds, covering connect, send and reading the whole
///   response body
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
        }
    }
}

impl ClientConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// XML-RPC client over HTTP
///
/// Each call is one HTTP POST; the underlying hyper client keeps idle
/// connections around, so cloning the client is cheap and clones share them.
/// Calls are never retried.
#[derive(Clone)]
pub struct XmlRpcClient {
    url: String,
    config: ClientConfig,
    http: Client<HttpConnector, Full<Bytes>>,
}

impl XmlRpcClient {
    /// Create a client for the given endpoint URL with the default config.
    ///
    /// # Errors
    ///
    /// Returns [`ResdiscError::InvalidRequest`] if the URL does not start with
    /// `http://` or is not a valid URI. The overlay's XML-RPC bridge speaks
    /// plain HTTP only, so `https://` is rejected too.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_config(url, ClientConfig::default())
    }

    pub fn with_config(url: impl Into<String>, config: ClientConfig) -> Result<Self> {
        let url = url.into();
        if url.starts_with("https://") {
            return Err(ResdiscError::InvalidRequest(format!(
                "'{}': TLS is not supported, use http://",
                url
            )));
        }
        if !url.starts_with("http://") {
            return Err(ResdiscError::InvalidRequest(format!(
                "'{}' must start with http://",
                url
            )));
        }
        url.parse::<Uri>()
            .map_err(|e| ResdiscError::InvalidRequest(format!("invalid URL '{}': {}", url, e)))?;

        let http = Client::builder(TokioExecutor::new()).build_http();

        Ok(Self { url, config, http })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Call an XML-RPC method and decode its result.
    ///
    /// # Errors
    ///
    /// - [`ResdiscError::Timeout`] if no complete response arrived in time
    /// - [`ResdiscError::Transport`] for connection failures and non-2xx
    ///   HTTP statuses
    /// - [`ResdiscError::Fault`] if the server answered with a fault
    /// - [`ResdiscError::InvalidResponse`] / [`ResdiscError::Xml`] for
    ///   undecodable bodies
    pub async fn call(&self, method: &str, params: &[Value]) -> Result<Value> {
        let body = encode_method_call(method, params)?;
        debug!(url = %self.url, method, bytes = body.len(), "sending XML-RPC call");

        let timeout_ms = self.config.timeout.as_millis() as u64;
        let response = tokio::time::timeout(self.config.timeout, self.post(body))
            .await
            .map_err(|_| ResdiscError::Timeout(timeout_ms))??;

        debug!(method, bytes = response.len(), "received XML-RPC response");
        decode_method_response(&response)
    }

    /// Call a service of the overlay node through its `localproxy` entry.
    ///
    /// The service method name travels as the first parameter, followed by
    /// `args`.
    pub async fn localproxy(&self, method: &str, args: &[Value]) -> Result<Value> {
        let mut params = Vec::with_capacity(args.len() + 1);
        params.push(Value::String(method.to_string()));
        params.extend_from_slice(args);
        self.call(LOCALPROXY_METHOD, &params).await
    }

    async fn post(&self, body: String) -> Result<String> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(self.url.as_str())
            .header(CONTENT_TYPE, "text/xml")
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| ResdiscError::InvalidRequest(e.to_string()))?;

        let response = self
            .http
            .request(request)
            .await
            .map_err(|e| ResdiscError::Transport(describe(&e)))?;

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .map_err(|e| ResdiscError::Transport(describe(&e)))?
            .to_bytes();

        if !status.is_success() {
            return Err(ResdiscError::Transport(format!(
                "HTTP {} from {}",
                status, self.url
            )));
        }

        String::from_utf8(bytes.to_vec())
            .map_err(|e| ResdiscError::InvalidResponse(format!("response is not UTF-8: {}", e)))
    }
}

/// Flattens an error and its sources into one line.
///
/// hyper's top-level errors are terse ("client error (Connect)"); the
/// interesting part, such as "Connection refused", sits further down.
fn describe(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
