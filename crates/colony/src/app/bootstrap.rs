use std::path::PathBuf;

use tracing::info;
use tracing_subscriber::EnvFilter;

use super::local_host::{ArenaScenario, ScenarioError};

pub const DEFAULT_TURNS: u32 = 200;
pub const DEFAULT_THREADS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRunOptions {
    pub scenario_path: Option<PathBuf>,
    pub turns: u32,
    pub threads: usize,
}

impl Default for LocalRunOptions {
    fn default() -> Self {
        Self {
            scenario_path: None,
            turns: DEFAULT_TURNS,
            threads: DEFAULT_THREADS,
        }
    }
}

impl LocalRunOptions {
    pub fn load_scenario(&self) -> Result<ArenaScenario, ScenarioError> {
        match &self.scenario_path {
            Some(path) => ArenaScenario::from_json_file(path),
            None => {
                info!("using_builtin_scenario");
                Ok(ArenaScenario::default())
            }
        }
    }
}

/// Parses everything after the program name. `Ok(None)` means help was requested.
pub fn parse_args(args: &[String]) -> Result<Option<LocalRunOptions>, String> {
    let mut options = LocalRunOptions::default();
    let mut index = 0usize;
    while index < args.len() {
        match args[index].as_str() {
            "-h" | "--help" => return Ok(None),
            "--scenario" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --scenario".to_string())?;
                options.scenario_path = Some(PathBuf::from(value));
                index += 2;
            }
            "--turns" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --turns".to_string())?;
                options.turns = value
                    .parse::<u32>()
                    .map_err(|_| format!("invalid --turns value '{value}' (expected u32)"))?;
                index += 2;
            }
            "--threads" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --threads".to_string())?;
                options.threads = value
                    .parse::<usize>()
                    .ok()
                    .filter(|threads| *threads > 0)
                    .ok_or_else(|| {
                        format!("invalid --threads value '{value}' (expected at least 1)")
                    })?;
                index += 2;
            }
            other => return Err(format!("unknown argument '{other}'\n\n{}", usage_text())),
        }
    }
    Ok(Some(options))
}

pub fn usage_text() -> String {
    [
        "ant-arena-local - headless AntArena match against the colony client",
        "",
        "Usage:",
        "  ant-arena-local [--scenario <file.json>] [--turns <u32>] [--threads <usize>]",
        "",
        "Defaults:",
        "  built-in 24x24 scenario",
        "  --turns 200",
        "  --threads 3",
        "",
        "Environment:",
        "  RUST_LOG                          tracing filter (default: info)",
        "  ANTARENA_CLIENT_CONFIG            client config JSON file",
        "  ANTARENA_PRIMARY_ASSISTS_PATHING  1/0: decision thread also plans paths",
        "  ANTARENA_IDLE_BACKOFF_US          idle sleep in microseconds (0 = yield)",
    ]
    .join("\n")
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn no_arguments_uses_defaults() {
        assert_eq!(parse_args(&[]), Ok(Some(LocalRunOptions::default())));
    }

    #[test]
    fn flags_override_defaults() {
        let options = parse_args(&args(&["--turns", "12", "--scenario", "maze.json", "--threads", "1"]))
            .expect("valid args")
            .expect("not help");
        assert_eq!(options.turns, 12);
        assert_eq!(options.threads, 1);
        assert_eq!(options.scenario_path, Some(PathBuf::from("maze.json")));
    }

    #[test]
    fn help_and_bad_values_are_reported() {
        assert_eq!(parse_args(&args(&["--help"])), Ok(None));
        assert!(parse_args(&args(&["--turns"])).is_err());
        assert!(parse_args(&args(&["--threads", "0"])).is_err());
        assert!(parse_args(&args(&["--bogus"])).is_err());
    }
}
