// Copyright 2026 resdisc Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # resdisc CLI
//!
//! Command-line client that asks a resource-discovery overlay to find nodes
//! matching a requirement.
//!
//! ## Architecture
//!
//! The CLI uses the `argh` crate for argument parsing ([`args`]), turns the
//! parsed flags into an immutable [`query::QueryConfig`], and drives the two
//! overlay calls through `resdisc-client` ([`query::run_query`]).
//!
//! ## Usage
//!
//! ```bash
//! resdisc-query --ip 10.0.0.7 --port 10000 --ma-req 'Memory > 512' --num-res 5 --first-fit
//! ```
//!
//! The overlay's result is printed as one line of JSON, followed by the time
//! the map-reduce call took.

pub mod args;
pub mod query;

pub use args::QueryArgs;
pub use query::{run_query, QueryConfig, QueryOutcome};
