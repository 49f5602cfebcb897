//! Purpose: Hold top-level CLI command dispatch for `plantstore`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Every command builds its own store; nothing persists between runs.

use super::*;

pub(super) fn dispatch_command(
    command: Command,
    options: GlobalOptions,
) -> Result<RunOutcome, CliError> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "plantstore", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Version => {
            emit_version_output(options.pretty);
            Ok(RunOutcome::ok())
        }
        Command::Codes => {
            emit_json(codes_json(), options.pretty);
            Ok(RunOutcome::ok())
        }
        Command::Inspect { file } => {
            let description = read_description(file.as_deref())?;
            let mut store = new_store(options);
            let plants = snapshot::load(&mut store, &description)?;
            tracing::debug!(plants = plants.len(), "description loaded");

            let mut value = snapshot::dump(&store, &plants);
            if let Value::Object(map) = &mut value {
                map.insert(
                    "bytes_in_use".to_string(),
                    json!(store.allocator().in_use()),
                );
            }
            emit_json(value, options.pretty);
            Ok(RunOutcome::ok())
        }
        Command::Header { file, name } => {
            if name.trim().is_empty() {
                return Err(CliError::Usage {
                    message: "--name must not be empty".to_string(),
                    hint: Some("Use `--name filter` or omit the flag.".to_string()),
                });
            }
            let description = read_description(file.as_deref())?;
            let mut store = new_store(options);
            let plants = snapshot::load(&mut store, &description)?;
            print!("{}", snapshot::render_header(&store, &plants, &name));
            Ok(RunOutcome::ok())
        }
    }
}
