pub mod client;
pub mod overlay;

pub use client::{endpoint_url, ClientConfig, XmlRpcClient, LOCALPROXY_METHOD, XMLRPC_PATH};
pub use overlay::{NeighborInfo, OverlayClient, GET_NEIGHBORS_METHOD, MAPREDUCE_START_METHOD};
