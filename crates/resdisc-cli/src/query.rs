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

//! Query dispatch.
//!
//! One query is a fixed sequence of two calls against a single overlay node:
//!
//! 1. `sys:link.GetNeighbors` to learn the node's own address
//! 2. `mapreduce.Start` with the generator range `[self, self - 2]`
//!
//! There are no retries; the first error ends the query.

use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use resdisc_client::{endpoint_url, ClientConfig, OverlayClient};
use resdisc_common::{Address, MapArgs, QueryRequest, ReduceArgs};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::args::QueryArgs;

/// Validated settings for one query, built once from the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryConfig {
    pub host: String,
    pub port: u16,
    pub map_arg: MapArgs,
    pub reduce_arg: ReduceArgs,
    pub wait_factor: i32,
    pub task_name: String,
    pub timeout: Duration,
    /// Accepted for compatibility; no effect on the query
    pub period: Option<i32>,
}

impl QueryConfig {
    /// Validates `args` and assembles the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty host, a negative result count, an
    /// empty task name or a zero timeout.
    pub fn from_args(args: QueryArgs) -> Result<Self> {
        if args.ip.trim().is_empty() {
            bail!("--ip must not be empty");
        }
        if args.task.trim().is_empty() {
            bail!("--task must not be empty");
        }
        if args.timeout_ms == 0 {
            bail!("--timeout-ms must be greater than zero");
        }

        let mut map_arg = MapArgs::new();
        if let Some(requirements) = args.ma_req {
            map_arg = map_arg.with_requirements(requirements);
        }
        if let Some(rank) = args.ma_rank {
            map_arg = map_arg.with_rank(rank);
        }

        let mut reduce_arg = ReduceArgs::new();
        if let Some(num_res) = args.num_res {
            if num_res < 0 {
                bail!("--num_res must not be negative (got {})", num_res);
            }
            reduce_arg = reduce_arg.with_num_res(num_res);
        }
        if args.sort_descending {
            reduce_arg = reduce_arg.with_sort_descending();
        }
        if args.first_fit {
            reduce_arg = reduce_arg.with_first_fit();
        }

        Ok(Self {
            host: args.ip,
            port: args.port,
            map_arg,
            reduce_arg,
            wait_factor: args.wf,
            task_name: args.task,
            timeout: Duration::from_millis(args.timeout_ms),
            period: args.period,
        })
    }

    pub fn endpoint(&self) -> String {
        endpoint_url(&self.host, self.port)
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::default().with_timeout(self.timeout)
    }

    /// The `mapreduce.Start` payload for a node whose address is `self_addr`.
    pub fn build_request(&self, self_addr: &Address) -> QueryRequest {
        QueryRequest::new(
            self.map_arg.clone(),
            QueryRequest::generator_args(self_addr),
            self.reduce_arg.clone(),
        )
        .with_task_name(self.task_name.clone())
        .with_wait_factor(self.wait_factor)
    }
}

/// Result of a completed query.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    /// Payload that was sent
    pub request: QueryRequest,
    /// Result returned by the overlay, unmodified
    pub result: Value,
    /// Wall-clock duration of the `mapreduce.Start` call
    pub elapsed: Duration,
}

impl QueryOutcome {
    /// Output lines: the raw result as JSON, then the elapsed time in seconds.
    pub fn render(&self) -> Result<String> {
        Ok(format!(
            "{}\ntotal time taken = {:.6}",
            serde_json::to_string(&self.result)?,
            self.elapsed.as_secs_f64()
        ))
    }
}

/// Runs one query against the node described by `config`.
pub async fn run_query(config: &QueryConfig) -> Result<QueryOutcome> {
    if config.map_arg.requirements.is_none() {
        warn!("no requirement given (--ma_req); the remote task will report invalid_map_argument");
    }
    if let Some(period) = config.period {
        debug!(period, "--period is accepted but has no effect");
    }

    let overlay = OverlayClient::connect(&config.host, config.port, config.client_config())?;
    let endpoint = overlay.rpc().url().to_string();

    let neighbors = overlay
        .get_neighbors()
        .await
        .with_context(|| format!("fetching neighbor info from {}", endpoint))?;
    info!(self_addr = %neighbors.self_addr, "local node address resolved");

    let request = config.build_request(&neighbors.self_addr);

    let started = Instant::now();
    let result = overlay
        .start(&request)
        .await
        .with_context(|| format!("running {} on {}", request.task_name, endpoint))?;
    let elapsed = started.elapsed();
    info!(elapsed_ms = elapsed.as_millis() as u64, "map-reduce query finished");

    Ok(QueryOutcome {
        request,
        result,
        elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::parse_args;
    use resdisc_common::DEFAULT_TASK_NAME;
    use serde_json::json;

    fn parse_config(args: &[&str]) -> Result<QueryConfig> {
        let owned: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let args = parse_args("resdisc-query", &owned).unwrap();
        QueryConfig::from_args(args)
    }

    #[test]
    fn test_config_from_minimal_args() {
        let config = parse_config(&["--ip", "10.0.0.7", "--port", "10000"]).unwrap();
        assert_eq!(config.endpoint(), "http://10.0.0.7:10000/xm.rem");
        assert_eq!(config.map_arg, MapArgs::new());
        assert_eq!(config.reduce_arg, ReduceArgs::new());
        assert_eq!(config.wait_factor, 0);
        assert_eq!(config.task_name, DEFAULT_TASK_NAME);
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.client_config().timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_config_reduce_args() {
        let config = parse_config(&[
            "--ip", "h", "--port", "1",
            "--num_res=5", "--first_fit",
        ])
        .unwrap();
        assert_eq!(
            serde_json::to_value(&config.reduce_arg).unwrap(),
            json!({"num_res": 5, "first_fit": 1})
        );
    }

    #[test]
    fn test_config_sort_flags() {
        let config = parse_config(&["--ip", "h", "--port", "1", "--sort_descending"]).unwrap();
        assert_eq!(config.reduce_arg.sort_descending, Some(1));

        // Ascending is the default and adds nothing to the payload
        let config = parse_config(&["--ip", "h", "--port", "1", "--sort_ascending"]).unwrap();
        assert_eq!(config.reduce_arg, ReduceArgs::new());
    }

    #[test]
    fn test_config_period_is_ignored() {
        let with_period = parse_config(&["--ip", "h", "--port", "1", "--period", "30"]).unwrap();
        let without = parse_config(&["--ip", "h", "--port", "1"]).unwrap();
        let addr = Address::parse("42").unwrap();

        assert_eq!(with_period.period, Some(30));
        assert_eq!(with_period.build_request(&addr), without.build_request(&addr));
    }

    #[test]
    fn test_config_rejects_negative_num_res() {
        let owned = vec!["--ip".to_string(), "h".into(), "--port".into(), "1".into()];
        let mut args = parse_args("resdisc-query", &owned).unwrap();
        args.num_res = Some(-1);

        let err = QueryConfig::from_args(args).unwrap_err();
        assert!(err.to_string().contains("--num_res"));
    }

    #[test]
    fn test_config_rejects_empty_host_and_zero_timeout() {
        assert!(parse_config(&["--ip", "", "--port", "1"]).is_err());
        assert!(parse_config(&["--ip", "h", "--port", "1", "--timeout-ms", "0"]).is_err());
        assert!(parse_config(&["--ip", "h", "--port", "1", "--task", " "]).is_err());
    }

    #[test]
    fn test_build_request() {
        let config = parse_config(&[
            "--ip", "h", "--port", "1",
            "--ma_req", "Memory > 512",
            "--ma_rank", "KFlops",
            "--wf", "4",
        ])
        .unwrap();
        let self_addr = Address::parse("42").unwrap();
        let end_addr = Address::parse("40").unwrap();

        let request = config.build_request(&self_addr);
        assert_eq!(
            request.to_value().unwrap(),
            json!({
                "map_arg": {"requirements": "Memory > 512", "rank": "KFlops"},
                "gen_arg": [self_addr.as_str(), end_addr.as_str()],
                "reduce_arg": {},
                "task_name": DEFAULT_TASK_NAME,
                "wait_factor": 4,
            })
        );
    }

    #[test]
    fn test_outcome_render() {
        let outcome = QueryOutcome {
            request: QueryRequest::new(MapArgs::new(), ["a".into(), "b".into()], ReduceArgs::new()),
            result: json!({"count": 2}),
            elapsed: Duration::from_millis(1500),
        };
        assert_eq!(
            outcome.render().unwrap(),
            "{\"count\":2}\ntotal time taken = 1.500000"
        );
    }
}
