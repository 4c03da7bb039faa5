//! Map-Reduce Query Payloads
//!
//! The overlay runs resource-discovery queries as distributed map-reduce
//! tasks. A query is started with one `mapreduce.Start` call whose single
//! argument is a struct with five members:
//!
//! - `map_arg`: what each node evaluates locally (requirements and rank)
//! - `gen_arg`: the two ring addresses bounding the broadcast range
//! - `reduce_arg`: how partial results are merged (count, order, first fit)
//! - `task_name`: the task implementation hosted by the overlay
//! - `wait_factor`: how long intermediate nodes wait for children
//!
//! # Example
//!
//! ```
//! use resdisc_common::address::Address;
//! use resdisc_common::mapreduce::{MapArgs, QueryRequest, ReduceArgs};
//!
//! let self_addr = Address::parse("42").unwrap();
//! let map = MapArgs::new().with_requirements("Memory > 512");
//! let reduce = ReduceArgs::new().with_num_res(5).with_first_fit();
//!
//! let request = QueryRequest::new(map, QueryRequest::generator_args(&self_addr), reduce)
//!     .with_wait_factor(2);
//! let payload = request.to_value().unwrap();
//! assert_eq!(payload["wait_factor"], 2);
//! ```

use serde::Serialize;
use serde_json::Value;

use crate::address::Address;
use crate::error::Result;

/// Task executed when no other task is requested.
pub const DEFAULT_TASK_NAME: &str = "Brunet.Services.MapReduce.MapReduceDemoRf";

/// Distance walked backwards from the local node to find the far end of the
/// generator range.
pub const GENERATOR_OFFSET: u64 = 2;

/// Arguments evaluated by the map function on every node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MapArgs {
    /// Predicate a node must satisfy to be selected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
    /// Expression used to score matching nodes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<String>,
}

impl MapArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_requirements(mut self, requirements: impl Into<String>) -> Self {
        self.requirements = Some(requirements.into());
        self
    }

    pub fn with_rank(mut self, rank: impl Into<String>) -> Self {
        self.rank = Some(rank.into());
        self
    }
}

/// Arguments controlling how partial results are merged.
///
/// Flags are sent as the integer `1` when set and omitted otherwise; the
/// reducer only checks for key presence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReduceArgs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_res: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_descending: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_fit: Option<i32>,
}

impl ReduceArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_num_res(mut self, num_res: i32) -> Self {
        self.num_res = Some(num_res);
        self
    }

    pub fn with_sort_descending(mut self) -> Self {
        self.sort_descending = Some(1);
        self
    }

    pub fn with_first_fit(mut self) -> Self {
        self.first_fit = Some(1);
        self
    }
}

/// Complete `mapreduce.Start` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryRequest {
    pub map_arg: MapArgs,
    pub gen_arg: [String; 2],
    pub reduce_arg: ReduceArgs,
    pub task_name: String,
    pub wait_factor: i32,
}

impl QueryRequest {
    pub fn new(map_arg: MapArgs, gen_arg: [String; 2], reduce_arg: ReduceArgs) -> Self {
        Self {
            map_arg,
            gen_arg,
            reduce_arg,
            task_name: DEFAULT_TASK_NAME.to_string(),
            wait_factor: 0,
        }
    }

    /// Derives the generator range `[self, self - 2]` from the local node's
    /// address, wrapping around the ring below zero.
    pub fn generator_args(self_addr: &Address) -> [String; 2] {
        let end = self_addr.wrapping_sub(GENERATOR_OFFSET);
        [self_addr.to_string(), end.to_string()]
    }

    pub fn with_task_name(mut self, task_name: impl Into<String>) -> Self {
        self.task_name = task_name.into();
        self
    }

    pub fn with_wait_factor(mut self, wait_factor: i32) -> Self {
        self.wait_factor = wait_factor;
        self
    }

    /// The payload as sent on the wire.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ResdiscError::JsonSerialization`] if the payload
    /// cannot be represented as a JSON value.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}
