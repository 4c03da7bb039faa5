//! Overlay Service Facade
//!
//! Typed wrappers around the two overlay services a resource-discovery
//! query needs:
//!
//! - `sys:link.GetNeighbors` - topology of the local node, including its own
//!   address under the `self` key
//! - `mapreduce.Start` - runs a map-reduce task and returns its final result
//!
//! Both are reached through the node's `localproxy` XML-RPC entry point.

use resdisc_common::address::Address;
use resdisc_common::error::{ResdiscError, Result};
use resdisc_common::mapreduce::QueryRequest;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::client::{endpoint_url, ClientConfig, XmlRpcClient};

pub const GET_NEIGHBORS_METHOD: &str = "sys:link.GetNeighbors";
pub const MAPREDUCE_START_METHOD: &str = "mapreduce.Start";

/// Topology information reported by the local overlay node.
#[derive(Debug, Clone)]
pub struct NeighborInfo {
    /// Address of the node answering the call
    pub self_addr: Address,
    /// Every member of the reply, `self` included, as received
    pub raw: Map<String, Value>,
}

impl NeighborInfo {
    /// Extracts neighbor info from a `sys:link.GetNeighbors` result.
    ///
    /// # Errors
    ///
    /// - [`ResdiscError::InvalidResponse`] if the result is not a struct or
    ///   has no string `self` member
    /// - [`ResdiscError::Format`] if `self` is not a valid node address
    pub fn from_value(value: Value) -> Result<Self> {
        let raw = match value {
            Value::Object(map) => map,
            other => {
                return Err(ResdiscError::InvalidResponse(format!(
                    "{} returned {}, expected a struct",
                    GET_NEIGHBORS_METHOD, other
                )))
            }
        };

        let self_text = raw.get("self").and_then(Value::as_str).ok_or_else(|| {
            ResdiscError::InvalidResponse(format!(
                "{} result has no 'self' address",
                GET_NEIGHBORS_METHOD
            ))
        })?;
        let self_addr = Address::from_text(self_text)?;

        Ok(Self { self_addr, raw })
    }
}

/// Client for the overlay services of one node.
#[derive(Clone)]
pub struct OverlayClient {
    rpc: XmlRpcClient,
}

impl OverlayClient {
    pub fn new(rpc: XmlRpcClient) -> Self {
        Self { rpc }
    }

    /// Connect to the XML-RPC bridge of the node at `host:port`.
    pub fn connect(host: &str, port: u16, config: ClientConfig) -> Result<Self> {
        Ok(Self::new(XmlRpcClient::with_config(endpoint_url(host, port), config)?))
    }

    pub fn rpc(&self) -> &XmlRpcClient {
        &self.rpc
    }

    pub async fn get_neighbors(&self) -> Result<NeighborInfo> {
        let value = self.rpc.localproxy(GET_NEIGHBORS_METHOD, &[]).await?;
        let info = NeighborInfo::from_value(value)?;
        debug!(self_addr = %info.self_addr, members = info.raw.len(), "neighbor info received");
        Ok(info)
    }

    /// Start a map-reduce task and wait for its aggregated result.
    pub async fn start(&self, request: &QueryRequest) -> Result<Value> {
        info!(
            task = %request.task_name,
            start = %request.gen_arg[0],
            end = %request.gen_arg[1],
            "starting map-reduce query"
        );
        let params = [request.to_value()?];
        self.rpc.localproxy(MAPREDUCE_START_METHOD, &params).await
    }
}
