use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use arena::TracingDebugInterface;
use colony::app::bootstrap::{init_tracing, parse_args, usage_text};
use colony::app::local_host::LocalHost;
use colony::ArenaClient;
use tracing::{error, info};

fn main() -> ExitCode {
    let args = env::args().skip(1).collect::<Vec<_>>();
    let options = match parse_args(&args) {
        Ok(Some(options)) => options,
        Ok(None) => {
            println!("{}", usage_text());
            return ExitCode::SUCCESS;
        }
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::from(2);
        }
    };

    init_tracing();
    info!("=== AntArena Local Host ===");

    let client = match ArenaClient::from_env() {
        Ok(client) => client,
        Err(err) => {
            error!(error = %err, "client_config_failed");
            return ExitCode::from(1);
        }
    };
    let mut host = match options.load_scenario().and_then(LocalHost::new) {
        Ok(host) => host,
        Err(err) => {
            error!(error = %err, "scenario_failed");
            return ExitCode::from(1);
        }
    };

    let summary = host.run(
        &client,
        Arc::new(TracingDebugInterface::default()),
        options.turns,
        options.threads,
    );
    if summary.timed_out_turns > 0 {
        info!(timed_out = summary.timed_out_turns, "some_turns_timed_out");
    }
    ExitCode::SUCCESS
}
