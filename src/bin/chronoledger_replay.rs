//! Replays a JSON transition script against a fresh ledger.
//!
//! Prints one JSON line per transition, then the final state digest.

use std::path::PathBuf;
use std::process::ExitCode;

use serde_json::json;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use chronoledger::{
    script_from_json, ContractEngine, EngineConfig, LedgerError, LedgerResult, LedgerRuntime,
};

/// Command-line options.
struct Options {
    /// Config file; takes precedence over `owner`.
    config: Option<PathBuf>,
    /// Privileged identity when no config file is given.
    owner: Option<String>,
    /// Script to replay.
    script: PathBuf,
    /// Stop at the first rejected transition.
    fail_fast: bool,
}

const USAGE: &str = "\
chronoledger-replay - replay a transition script

USAGE:
    chronoledger-replay (--config <FILE> | --owner <ID>) --script <FILE> [--fail-fast]

OPTIONS:
    -c, --config <FILE>    Engine config (JSON)
    -o, --owner <ID>       Privileged identity, when no config is given
    -s, --script <FILE>    JSON array of transitions or requests
        --fail-fast        Stop at the first rejected transition
    -h, --help             Print help information";

enum Parsed {
    Run(Options),
    Help,
}

fn parse_args(args: &[String]) -> Result<Parsed, String> {
    let mut config = None;
    let mut owner = None;
    let mut script = None;
    let mut fail_fast = false;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{flag} requires a value"))
        };
        match arg.as_str() {
            "--config" | "-c" => config = Some(PathBuf::from(value("--config")?)),
            "--owner" | "-o" => owner = Some(value("--owner")?),
            "--script" | "-s" => script = Some(PathBuf::from(value("--script")?)),
            "--fail-fast" => fail_fast = true,
            "--help" | "-h" => return Ok(Parsed::Help),
            other => return Err(format!("unknown argument: {other}")),
        }
    }

    let script = script.ok_or_else(|| "--script is required".to_string())?;
    if config.is_none() && owner.is_none() {
        return Err("one of --config or --owner is required".to_string());
    }
    Ok(Parsed::Run(Options {
        config,
        owner,
        script,
        fail_fast,
    }))
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();
}

fn load_config(options: &Options) -> LedgerResult<EngineConfig> {
    let config = match (&options.config, &options.owner) {
        (Some(path), _) => EngineConfig::load(path)?,
        (None, Some(owner)) => EngineConfig::new(owner.as_str()),
        (None, None) => return Err(LedgerError::internal("no privileged identity configured")),
    };
    Ok(config.with_env_overrides()?)
}

/// Returns true if every transition committed.
fn replay(options: &Options) -> LedgerResult<bool> {
    let config = load_config(options)?;
    let text = std::fs::read_to_string(&options.script).map_err(|e| {
        LedgerError::internal(format!("read script {}: {e}", options.script.display()))
    })?;
    let requests = script_from_json(&text)?;
    tracing::info!(count = requests.len(), "replaying script");

    let runtime = LedgerRuntime::start(ContractEngine::new(&config)?, config.runtime)?;
    let mut all_committed = true;

    for (index, request) in requests.into_iter().enumerate() {
        let request_id = request.request_id;
        let op = request.transition.name();
        let line = match runtime.execute(request) {
            Ok(outcome) => json!({
                "index": index,
                "request_id": request_id,
                "op": op,
                "result": outcome,
            }),
            Err(err) => {
                all_committed = false;
                json!({
                    "index": index,
                    "request_id": request_id,
                    "op": op,
                    "error": { "kind": err.kind(), "message": err.to_string() },
                })
            }
        };
        println!("{line}");

        if options.fail_fast && !all_committed {
            tracing::warn!(index, op, "stopping at first rejection");
            break;
        }
    }

    println!("{}", json!({ "digest": runtime.state_digest()? }));
    Ok(all_committed)
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let options = match parse_args(&args) {
        Ok(Parsed::Run(options)) => options,
        Ok(Parsed::Help) => {
            println!("{USAGE}");
            return ExitCode::SUCCESS;
        }
        Err(message) => {
            eprintln!("error: {message}\n\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    init_tracing();

    match replay(&options) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) if !options.fail_fast => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            tracing::error!(error = %err, "replay failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
