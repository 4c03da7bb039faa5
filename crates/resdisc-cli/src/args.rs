//! Command-line arguments for `resdisc-query`.
//!
//! Flags are declared with `argh`, which spells long options in kebab-case
//! (`--ma-req`). Older scripts pass the underscore spelling and the
//! `--flag=value` form (`--ma_req="Memory > 512"`); [`normalize_args`]
//! rewrites those before parsing so both keep working.

use argh::{EarlyExit, FromArgs};
use resdisc_common::DEFAULT_TASK_NAME;

/// Long options that consume the following token as their value.
const VALUE_OPTIONS: &[&str] = &[
    "--ip",
    "--port",
    "--ma-req",
    "--ma-rank",
    "--num-res",
    "--period",
    "--wf",
    "--task",
    "--timeout-ms",
];

/// Arguments for one resource-discovery query.
///
/// # Example
///
/// ```bash
/// resdisc-query --ip 10.0.0.7 --port 10000 \
///   --ma-req 'Memory > 512' --ma-rank 'KFlops' \
///   --num-res 5 --sort-descending
/// ```
#[derive(FromArgs, Debug, PartialEq)]
/// query a resource-discovery overlay for nodes matching a requirement
pub struct QueryArgs {
    /// host of the overlay node to contact
    ///
    /// The node's XML-RPC bridge must be reachable at
    /// http://<ip>:<port>/xm.rem.
    #[argh(option)]
    pub ip: String,

    /// port of the overlay node's XML-RPC bridge
    #[argh(option)]
    pub port: u16,

    /// requirement predicate a node must satisfy to be selected
    ///
    /// ClassAd expression evaluated on every node, e.g. 'Memory > 512'.
    /// The remote task reports invalid_map_argument when this is missing.
    #[argh(option)]
    pub ma_req: Option<String>,

    /// rank expression used to order matching nodes
    #[argh(option)]
    pub ma_rank: Option<String>,

    /// number of matching nodes to return
    #[argh(option)]
    pub num_res: Option<i32>,

    /// order results by descending rank (ascending by default)
    #[argh(switch)]
    pub sort_descending: bool,

    /// order results by ascending rank; this is already the default
    #[argh(switch)]
    pub sort_ascending: bool,

    /// stop aggregating as soon as enough matches were found
    #[argh(switch)]
    pub first_fit: bool,

    /// reserved; accepted for compatibility and otherwise ignored
    #[argh(option)]
    pub period: Option<i32>,

    /// wait factor controlling how long nodes wait for child results
    #[argh(option, default = "0")]
    pub wf: i32,

    /// map-reduce task implementation to run on the overlay
    #[argh(option, default = "DEFAULT_TASK_NAME.to_string()")]
    pub task: String,

    /// timeout for each XML-RPC call in milliseconds
    ///
    /// Covers connecting, sending and reading the whole response.
    /// Defaults to 60000ms.
    #[argh(option, long = "timeout-ms", default = "60000")]
    pub timeout_ms: u64,
}

/// Rewrites legacy long options into the form `argh` parses.
///
/// - `--num_res` becomes `--num-res`
/// - `--ma_req=Memory>512` becomes `--ma-req` followed by `Memory>512`
///
/// Tokens in value position are passed through untouched.
pub fn normalize_args<I, S>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut out = Vec::new();
    let mut expecting_value = false;

    for arg in args {
        let arg = arg.into();

        if expecting_value || !arg.starts_with("--") || arg == "--" {
            expecting_value = false;
            out.push(arg);
            continue;
        }

        let (flag, value) = match arg.split_once('=') {
            Some((flag, value)) => (flag.replace('_', "-"), Some(value.to_string())),
            None => (arg.replace('_', "-"), None),
        };

        expecting_value = value.is_none() && VALUE_OPTIONS.contains(&flag.as_str());
        out.push(flag);
        out.extend(value);
    }

    out
}

/// Parses `args` (without the program name) after normalization.
pub fn parse_args(command: &str, args: &[String]) -> Result<QueryArgs, EarlyExit> {
    let normalized = normalize_args(args.iter().cloned());
    let refs: Vec<&str> = normalized.iter().map(String::as_str).collect();
    QueryArgs::from_args(&[command], &refs)
}

/// Parses the process arguments, printing help or a usage error and exiting
/// when parsing does not produce arguments.
pub fn from_env() -> QueryArgs {
    let mut raw = std::env::args();
    let command = raw.next().unwrap_or_else(|| "resdisc-query".to_string());
    let rest: Vec<String> = raw.collect();

    match parse_args(&command, &rest) {
        Ok(args) => args,
        Err(EarlyExit { output, status }) => match status {
            Ok(()) => {
                println!("{}", output);
                std::process::exit(0);
            }
            Err(()) => {
                eprintln!("{}\nRun {} --help for more information.", output, command);
                std::process::exit(1);
            }
        },
    }
}
