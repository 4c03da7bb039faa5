//! resdisc Common Types and Codecs
//!
//! This crate provides the pieces shared by the overlay query client:
//!
//! - [`address`] - 160-bit node addresses and their integer, byte and text forms
//! - [`xmlrpc`] - XML-RPC 1.0 encoding and decoding on top of `serde_json::Value`
//! - [`mapreduce`] - the `mapreduce.Start` request payload
//! - [`error`] - the error type used across the workspace
//!
//! # Example
//!
//! ```
//! use resdisc_common::{Address, MapArgs, QueryRequest, ReduceArgs};
//! use resdisc_common::xmlrpc::encode_method_call;
//! use serde_json::json;
//!
//! let self_addr = Address::parse("1000").unwrap();
//! let request = QueryRequest::new(
//!     MapArgs::new().with_requirements("Cpus >= 2"),
//!     QueryRequest::generator_args(&self_addr),
//!     ReduceArgs::new().with_num_res(3),
//! );
//!
//! let xml = encode_method_call("localproxy", &[json!("mapreduce.Start"), request.to_value().unwrap()]).unwrap();
//! assert!(xml.contains("<name>gen_arg</name>"));
//! ```

pub mod address;
pub mod error;
pub mod mapreduce;
pub mod xmlrpc;

pub use address::{Address, AddressForm, ADDRESS_BYTES, ADDRESS_PREFIX};
pub use error::{ResdiscError, Result};
pub use mapreduce::{MapArgs, QueryRequest, ReduceArgs, DEFAULT_TASK_NAME, GENERATOR_OFFSET};
