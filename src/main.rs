//! Purpose: `plantstore` CLI entry point: inspect plant descriptions and emit debug headers.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Commands emit stable stdout formats (JSON, or C text for `header`).
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Store failures exit with `api::to_exit_code`; usage errors exit 2, I/O errors 1.
use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand, ValueHint, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

mod command_dispatch;

use plantstore::api::{
    BoundedAllocator, Description, Error, ErrorKind, LeafFlags, SeedType, Store, snapshot,
    to_exit_code, types,
};

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

/// Failures surfaced by the binary. Store errors keep their library kind.
#[derive(Debug)]
enum CliError {
    Usage { message: String, hint: Option<String> },
    Input { message: String, path: Option<PathBuf> },
    Io { message: String, path: Option<PathBuf>, source: io::Error },
    Store(Error),
}

impl From<Error> for CliError {
    fn from(err: Error) -> Self {
        CliError::Store(err)
    }
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage { .. } | CliError::Input { .. } => 2,
            CliError::Io { .. } => 1,
            CliError::Store(err) => to_exit_code(err.kind()),
        }
    }

    fn kind_label(&self) -> &'static str {
        match self {
            CliError::Usage { .. } => "Usage",
            CliError::Input { .. } => "Input",
            CliError::Io { .. } => "Io",
            CliError::Store(err) => err.kind().literal(),
        }
    }

    fn message(&self) -> String {
        match self {
            CliError::Usage { message, .. }
            | CliError::Input { message, .. }
            | CliError::Io { message, .. } => message.clone(),
            CliError::Store(err) => err
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| err.kind().describe().to_string()),
        }
    }
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            err.exit_code()
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, CliError> {
    let cli = match Cli::try_parse_from(std::env::args_os()) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|source| CliError::Io {
                    message: "failed to write help".to_string(),
                    path: None,
                    source,
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
                return Err(CliError::Usage {
                    message: clap_error_summary(&err),
                    hint: Some("Try `plantstore --help`.".to_string()),
                });
            }
        },
    };

    let options = GlobalOptions {
        max_bytes: cli.max_bytes,
        pretty: cli.pretty,
    };
    command_dispatch::dispatch_command(cli.command, options)
}

#[derive(Parser)]
#[command(
    name = "plantstore",
    version,
    about = "Typed plant/leaf attribute store: inspect and describe plants",
    help_template = r#"{about-with-newline}
{before-help}USAGE
  {usage}

COMMANDS
{subcommands}

OPTIONS
{options}

{after-help}
"#,
    long_about = None,
    before_help = r#"Plants are typed containers of named leaves. Every leaf holds 0..N values of one seed type.

Mental model:
  - `inspect` builds plants from a JSON description and prints what the store holds
  - `header` prints C struct definitions mirroring those plants
  - `codes` prints the frozen seed, flag, and error codes
"#,
    after_help = r#"EXAMPLES
  $ plantstore codes
  $ echo '{"plants":[{"type":255,"leaves":[{"key":"api","seed":"int","values":[200]}]}]}' | plantstore inspect
  $ plantstore header filters.json --name filter

LEARN MORE
  $ plantstore <command> --help
  RUST_LOG=debug plantstore inspect plants.json   # trace store activity on stderr"#,
    arg_required_else_help = true,
    disable_help_subcommand = false
)]
struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "BYTES",
        help = "Refuse allocations once the store accounts for more than BYTES"
    )]
    max_bytes: Option<u64>,
    #[arg(long, global = true, help = "Pretty-print JSON output")]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug)]
struct GlobalOptions {
    max_bytes: Option<u64>,
    pretty: bool,
}

#[derive(Subcommand)]
enum Command {
    #[command(
        about = "Print seed, flag, error, and plant type codes as JSON",
        long_about = r#"Print the integer codes shared with separately compiled plugins.

These codes never change meaning between releases."#,
        after_help = r#"EXAMPLES
  $ plantstore codes
  $ plantstore codes --pretty"#
    )]
    Codes,
    #[command(
        about = "Build plants from a JSON description and print them",
        long_about = r#"Load a plant description, build it in a fresh store, and print every plant.

Input shape:
  {"plants":[{"type":N,"leaves":[{"key":K,"seed":"int","values":[...],"flags":N}]}]}

Seeds: int, double, boolean, string, int64, uint, uint64, funcptr, voidptr, plantptr.
plantptr values are indices into "plants" (or null); funcptr/voidptr values are integers.
The output uses the same shape (plus element counts) and can be fed back in."#,
        after_help = r#"EXAMPLES
  $ plantstore inspect plants.json
  $ cat plants.json | plantstore inspect --pretty
  $ plantstore inspect plants.json --max-bytes 4096

NOTES
  - Reads stdin when FILE is omitted or `-`.
  - Store errors exit with their stable code (see `plantstore codes`)."#
    )]
    Inspect {
        #[arg(help = "Description file (default: stdin)", value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,
    },
    #[command(
        about = "Emit C struct definitions for described plants",
        long_about = r#"Load a plant description and print one C typedef per plant.

Single-element leaves become scalar fields; multi-element leaves become arrays.
Flags and non-identifier keys are noted in comments."#,
        after_help = r#"EXAMPLES
  $ plantstore header plants.json
  $ plantstore header plants.json --name filter > filter_plants.h"#
    )]
    Header {
        #[arg(help = "Description file (default: stdin)", value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,
        #[arg(long, default_value = "plant", help = "Base name for the generated typedefs")]
        name: String,
    },
    #[command(
        about = "Print version info as JSON",
        long_about = r#"Emit version info as JSON (stable, machine-readable)."#,
        after_help = r#"EXAMPLES
  $ plantstore version"#
    )]
    Version,
    #[command(
        arg_required_else_help = true,
        about = "Generate shell completions",
        long_about = r#"Generate shell completion scripts.

Prints a completion script for the given shell to stdout.
Install the generated file in your shell's completion directory (or source it)
to enable tab completion."#,
        after_help = r#"EXAMPLES
  $ plantstore completion bash > ~/.local/share/bash-completion/completions/plantstore
  $ plantstore completion zsh > ~/.zfunc/_plantstore
  $ plantstore completion fish > ~/.config/fish/completions/plantstore.fish"#
    )]
    Completion {
        #[arg(help = "Shell to generate completions for")]
        shell: Shell,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn new_store(options: GlobalOptions) -> Store {
    match options.max_bytes {
        Some(limit) => {
            let limit = usize::try_from(limit).unwrap_or(usize::MAX);
            Store::with_allocator(Arc::new(BoundedAllocator::new(limit)))
        }
        None => Store::new(),
    }
}

fn read_description(file: Option<&Path>) -> Result<Description, CliError> {
    let (text, path) = match file {
        Some(path) if path != Path::new("-") => {
            let text = fs::read_to_string(path).map_err(|source| CliError::Io {
                message: "failed to read description".to_string(),
                path: Some(path.to_path_buf()),
                source,
            })?;
            (text, Some(path.to_path_buf()))
        }
        _ => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .map_err(|source| CliError::Io {
                    message: "failed to read stdin".to_string(),
                    path: None,
                    source,
                })?;
            (text, None)
        }
    };
    serde_json::from_str(&text).map_err(|err| CliError::Input {
        message: format!("invalid plant description: {err}"),
        path,
    })
}

fn codes_json() -> Value {
    let seeds: Vec<Value> = SeedType::ALL
        .iter()
        .map(|seed| {
            json!({
                "code": seed.code(),
                "name": seed.short_name(),
                "description": seed.name(),
                "ctype": seed.ctype(),
                "pointer": seed.is_pointer(),
                "owned": seed.is_owned(),
                "element_size": seed.element_size(),
            })
        })
        .collect();
    let errors: Vec<Value> = std::iter::once(json!({
        "code": 0,
        "name": "SUCCESS",
        "description": "Success",
    }))
    .chain(ErrorKind::ALL.iter().map(|kind| {
        json!({
            "code": kind.code(),
            "name": kind.literal(),
            "description": kind.describe(),
            "exit_code": to_exit_code(*kind),
        })
    }))
    .collect();
    let plant_types: Vec<Value> = types::ALL
        .iter()
        .map(|(code, name)| json!({ "code": code, "name": name }))
        .collect();
    json!({
        "seed_types": seeds,
        "flags": {
            "UNDELETABLE": LeafFlags::UNDELETABLE.bits(),
            "IMMUTABLE": LeafFlags::IMMUTABLE.bits(),
            "RESERVED_MASK": LeafFlags::RESERVED_MASK,
            "FIRST_CUSTOM": LeafFlags::FIRST_CUSTOM.bits(),
            "CUSTOM_MASK": LeafFlags::CUSTOM_MASK,
        },
        "errors": errors,
        "plant_types": plant_types,
    })
}

fn emit_json(value: Value, pretty: bool) {
    let pretty = pretty || io::stdout().is_terminal();
    let json = if pretty {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn emit_version_output(pretty: bool) {
    if io::stdout().is_terminal() {
        println!("plantstore {}", env!("CARGO_PKG_VERSION"));
    } else {
        emit_json(
            json!({
                "name": "plantstore",
                "version": env!("CARGO_PKG_VERSION"),
            }),
            pretty,
        );
    }
}

fn emit_error(err: &CliError) {
    if io::stderr().is_terminal() {
        eprintln!("{}", error_text(err));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_json(err: &CliError) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(err.kind_label()));
    inner.insert("message".to_string(), json!(err.message()));
    match err {
        CliError::Usage { hint: Some(hint), .. } => {
            inner.insert("hint".to_string(), json!(hint));
        }
        CliError::Input { path: Some(path), .. } => {
            inner.insert("path".to_string(), json!(path.display().to_string()));
        }
        CliError::Io { path, source, .. } => {
            if let Some(path) = path {
                inner.insert("path".to_string(), json!(path.display().to_string()));
            }
            inner.insert("causes".to_string(), json!([source.to_string()]));
        }
        CliError::Store(store_err) => {
            inner.insert("code".to_string(), json!(store_err.code()));
            if let Some(key) = store_err.key() {
                inner.insert("key".to_string(), json!(key));
            }
            if let Some(plant) = store_err.plant() {
                inner.insert("plant".to_string(), json!(plant));
            }
        }
        _ => {}
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &CliError) -> String {
    let mut lines = vec![format!("error: {}", err.message())];
    match err {
        CliError::Usage { hint: Some(hint), .. } => lines.push(format!("hint: {hint}")),
        CliError::Input { path: Some(path), .. } => lines.push(format!("path: {}", path.display())),
        CliError::Io { path, source, .. } => {
            if let Some(path) = path {
                lines.push(format!("path: {}", path.display()));
            }
            lines.push(format!("caused by: {source}"));
        }
        CliError::Store(store_err) => {
            lines.push(format!("kind: {} ({})", store_err.kind().literal(), store_err.code()));
            if let Some(key) = store_err.key() {
                lines.push(format!("key: {key}"));
            }
        }
        _ => {}
    }
    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_carry_code_and_key() {
        let err = CliError::Store(
            Error::new(ErrorKind::Immutable)
                .with_key("type")
                .with_plant(1),
        );
        let value = error_json(&err);
        assert_eq!(value["error"]["kind"], "IMMUTABLE");
        assert_eq!(value["error"]["code"], 5);
        assert_eq!(value["error"]["key"], "type");
        assert_eq!(value["error"]["message"], "Read only property");
        assert_eq!(err.exit_code(), to_exit_code(ErrorKind::Immutable));
    }

    #[test]
    fn usage_errors_exit_two() {
        let err = CliError::Usage {
            message: "bad flag".to_string(),
            hint: None,
        };
        assert_eq!(err.exit_code(), 2);
        assert_eq!(error_text(&err), "error: bad flag");
    }

    #[test]
    fn codes_lists_every_seed_and_error() {
        let codes = codes_json();
        assert_eq!(codes["seed_types"].as_array().map(Vec::len), Some(SeedType::ALL.len()));
        assert_eq!(codes["errors"].as_array().map(Vec::len), Some(ErrorKind::ALL.len() + 1));
        assert_eq!(codes["flags"]["IMMUTABLE"], 2);
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
