//! XML-RPC Wire Codec
//!
//! The overlay exposes its services over XML-RPC 1.0 on HTTP. This module
//! converts between XML-RPC documents and `serde_json::Value`, which is the
//! value type used everywhere else in the workspace.
//!
//! # Type Mapping
//!
//! | XML-RPC | `serde_json::Value` |
//! |---|---|
//! | `<int>`, `<i4>`, `<i8>` | `Number` (integer) |
//! | `<double>` | `Number` (float) |
//! | `<boolean>` | `Bool` |
//! | `<string>` or untyped text | `String` |
//! | `<dateTime.iso8601>`, `<base64>` | `String` (raw text) |
//! | `<nil/>` | `Null` |
//! | `<array>` | `Array` |
//! | `<struct>` | `Object` |
//!
//! Outgoing integers must fit in 32 bits; XML-RPC has no wider integer type
//! that the overlay understands.
//!
//! # Example
//!
//! ```
//! use resdisc_common::xmlrpc::{encode_method_call, decode_method_call};
//! use serde_json::json;
//!
//! let xml = encode_method_call("localproxy", &[json!("sys:link.GetNeighbors")]).unwrap();
//! let (method, params) = decode_method_call(&xml).unwrap();
//! assert_eq!(method, "localproxy");
//! assert_eq!(params, vec![json!("sys:link.GetNeighbors")]);
//! ```

pub mod decode;
pub mod encode;


pub use decode::{decode_method_call, decode_method_response};
pub use encode::{encode_fault, encode_method_call, encode_method_response, encode_value};
