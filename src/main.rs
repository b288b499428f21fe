//! Purpose: `shell-fmt` CLI entry point; drives the plugin runtime the way a host would.
//! Role: Binary crate root; parses args, runs commands, emits JSON lines on stdout.
//! Invariants: Every call into the runtime goes through the shared buffer, never around it.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `to_exit_code`.
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, error::ErrorKind as ClapErrorKind};
use dprint_plugin_shell::core::types::FormatResultCode;
use dprint_plugin_shell::{Error, ErrorKind, Runtime, ShellPlugin, to_exit_code};
use serde_json::{Map, Value, json};

mod config_file;

const CONFIG_ID: u32 = 1;

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

#[derive(Parser, Debug)]
#[command(name = "shell-fmt", version, about = "Format shell scripts through the plugin protocol")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Format files in place, printing one JSON line per file.
    Fmt {
        /// dprint-style config file (or a raw `{plugin, global}` document).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Report files that would change without writing them.
        #[arg(long)]
        check: bool,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print the resolved configuration, diagnostics, and file matching.
    Config {
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print plugin metadata.
    Info,
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, Error> {
    let cli = match Cli::try_parse_from(std::env::args_os()) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage).with_message(clap_error_summary(&err)));
            }
        },
    };

    init_tracing();

    match cli.command {
        Command::Fmt {
            config,
            check,
            files,
        } => run_fmt(config.as_deref(), check, &files),
        Command::Config { config } => run_config(config.as_deref()),
        Command::Info => run_info(),
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn registered_runtime(config: Option<&Path>) -> Result<Runtime<ShellPlugin>, Error> {
    let registration = config_file::load_registration(config)?;
    let mut runtime = Runtime::new(ShellPlugin);
    runtime.write_shared_bytes(&registration);
    runtime.register_config(CONFIG_ID)?;
    Ok(runtime)
}

fn read_json(runtime: &Runtime<ShellPlugin>, len: u32) -> Result<Value, Error> {
    let bytes = &runtime.shared_bytes()[..len as usize];
    serde_json::from_slice(bytes).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("runtime returned invalid JSON")
            .with_source(err)
    })
}

fn read_text(runtime: &Runtime<ShellPlugin>, len: u32) -> Vec<u8> {
    runtime.shared_bytes()[..len as usize].to_vec()
}

fn run_fmt(config: Option<&Path>, check: bool, files: &[PathBuf]) -> Result<RunOutcome, Error> {
    let mut runtime = registered_runtime(config)?;
    let mut failed = false;

    let diagnostics_len = runtime.get_config_diagnostics(CONFIG_ID)?;
    if let Value::Array(diagnostics) = read_json(&runtime, diagnostics_len)? {
        for diagnostic in diagnostics {
            tracing::warn!(%diagnostic, "config diagnostic");
        }
    }

    for path in files {
        let bytes = std::fs::read(path).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read file")
                .with_path(path)
                .with_source(err)
        })?;

        runtime.write_shared_bytes(path.to_string_lossy().as_bytes());
        runtime.set_file_path()?;
        runtime.write_shared_bytes(&bytes);
        let code = runtime.format(CONFIG_ID)?;

        let mut line = Map::new();
        line.insert("path".to_string(), json!(path.display().to_string()));
        match FormatResultCode::from_raw(code) {
            Some(FormatResultCode::NoChange) => {
                line.insert("result".to_string(), json!("unchanged"));
            }
            Some(FormatResultCode::Change) => {
                let len = runtime.get_formatted_text()?;
                if check {
                    failed = true;
                    line.insert("result".to_string(), json!("would_format"));
                } else {
                    std::fs::write(path, read_text(&runtime, len)).map_err(|err| {
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write file")
                            .with_path(path)
                            .with_source(err)
                    })?;
                    line.insert("result".to_string(), json!("formatted"));
                }
            }
            Some(FormatResultCode::Error) => {
                failed = true;
                let len = runtime.get_error_text()?;
                let message = String::from_utf8_lossy(&read_text(&runtime, len)).into_owned();
                line.insert("result".to_string(), json!("error"));
                line.insert("message".to_string(), json!(message));
            }
            None => {
                return Err(Error::new(ErrorKind::Internal)
                    .with_message(format!("unknown format result code {code}")));
            }
        }
        emit_json(&Value::Object(line))?;
    }

    if failed {
        Ok(RunOutcome::with_code(1))
    } else {
        Ok(RunOutcome::ok())
    }
}

fn run_config(config: Option<&Path>) -> Result<RunOutcome, Error> {
    let mut runtime = registered_runtime(config)?;
    let len = runtime.get_resolved_config(CONFIG_ID)?;
    let resolved = read_json(&runtime, len)?;
    let len = runtime.get_config_diagnostics(CONFIG_ID)?;
    let diagnostics = read_json(&runtime, len)?;
    let len = runtime.get_config_file_matching(CONFIG_ID)?;
    let file_matching = read_json(&runtime, len)?;
    runtime.release_config(CONFIG_ID);

    emit_json(&json!({
        "config": resolved,
        "diagnostics": diagnostics,
        "fileMatching": file_matching,
    }))?;
    Ok(RunOutcome::ok())
}

fn run_info() -> Result<RunOutcome, Error> {
    let mut runtime = Runtime::new(ShellPlugin);
    let len = runtime.get_plugin_info()?;
    let mut info = read_json(&runtime, len)?;
    if let Value::Object(map) = &mut info {
        map.insert(
            "pluginSchemaVersion".to_string(),
            json!(runtime.plugin_schema_version()),
        );
    }
    emit_json(&info)?;
    Ok(RunOutcome::ok())
}

fn emit_json(value: &Value) -> Result<(), Error> {
    let line = serde_json::to_string(value).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode output")
            .with_source(err)
    })?;
    println!("{line}");
    Ok(())
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("error: {err}");
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert(
        "message".to_string(),
        json!(err.message().unwrap_or("unexpected error")),
    );
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    if let Some(config_id) = err.config_id() {
        inner.insert("configId".to_string(), json!(config_id));
    }
    if let Some(source) = std::error::Error::source(err) {
        inner.insert("cause".to_string(), json!(source.to_string()));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn clap_error_summary(err: &clap::Error) -> String {
    err.to_string()
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.strip_prefix("error:").unwrap_or(line).trim().to_string())
        .unwrap_or_else(|| "invalid arguments".to_string())
}
