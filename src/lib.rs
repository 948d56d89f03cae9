pub mod commands;
pub mod config;
pub mod process_manager;
pub mod tui;
pub mod ui;

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run(StackArgs),
    Env(StackArgs),
    Processes(StackArgs),
    Help,
}

/// Options shared by every command that resolves a stack instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackArgs {
    pub instance: Option<String>,
    pub config: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
    pub bin_dir: Option<PathBuf>,
    pub overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliParseError {
    MissingValue(&'static str),
    InvalidOverride(String),
    UnknownCommand(String),
    UnknownArgument(String),
}

impl std::fmt::Display for CliParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliParseError::MissingValue(flag) => write!(f, "{flag} requires a value"),
            CliParseError::InvalidOverride(raw) => {
                write!(f, "--set expects KEY=VALUE, got `{raw}`")
            }
            CliParseError::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            CliParseError::UnknownArgument(arg) => write!(f, "unknown argument: {arg}"),
        }
    }
}

impl std::error::Error for CliParseError {}

pub fn parse_command<I>(args: I) -> Result<Command, CliParseError>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let Some(cmd) = args.next() else {
        return Ok(Command::Help);
    };

    let build: fn(StackArgs) -> Command = match cmd.as_str() {
        "--help" | "-h" | "help" => return Ok(Command::Help),
        "run" => Command::Run,
        "env" => Command::Env,
        "processes" => Command::Processes,
        other => return Err(CliParseError::UnknownCommand(other.to_owned())),
    };
    match parse_stack_args(args)? {
        Some(stack) => Ok(build(stack)),
        None => Ok(Command::Help),
    }
}

/// Returns `None` when help was requested.
fn parse_stack_args<I>(args: I) -> Result<Option<StackArgs>, CliParseError>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut stack = StackArgs::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--instance" => {
                let Some(name) = args.next() else {
                    return Err(CliParseError::MissingValue("--instance"));
                };
                stack.instance = Some(name);
            }
            "--config" => {
                let Some(path) = args.next() else {
                    return Err(CliParseError::MissingValue("--config"));
                };
                stack.config = Some(PathBuf::from(path));
            }
            "--env-file" => {
                let Some(path) = args.next() else {
                    return Err(CliParseError::MissingValue("--env-file"));
                };
                stack.env_file = Some(PathBuf::from(path));
            }
            "--bin-dir" => {
                let Some(path) = args.next() else {
                    return Err(CliParseError::MissingValue("--bin-dir"));
                };
                stack.bin_dir = Some(PathBuf::from(path));
            }
            "--set" => {
                let Some(raw) = args.next() else {
                    return Err(CliParseError::MissingValue("--set"));
                };
                let Some(pair) = config::parse_assignment(&raw) else {
                    return Err(CliParseError::InvalidOverride(raw));
                };
                stack.overrides.push(pair);
            }
            "--help" | "-h" => return Ok(None),
            other => return Err(CliParseError::UnknownArgument(other.to_owned())),
        }
    }

    Ok(Some(stack))
}

pub fn usage() -> String {
    format!(
        "devstack\n\nUSAGE:\n  devstack run [STACK OPTIONS]\n  devstack env [STACK OPTIONS]\n  devstack processes [STACK OPTIONS]\n\nCOMMANDS:\n  run               Start the local stack and open the process view\n  env               Print the environment passed to every process\n  processes         Print the resolved process list in startup order\n\nSTACK OPTIONS:\n  --instance <NAME> Instance under ~/.devstack (default: {instance})\n  --config <PATH>   Stack config (default: <instance>/{config_file} when present)\n  --env-file <PATH> Environment file (default: <instance>/{env_file})\n  --bin-dir <PATH>  Directory holding the stack binaries (default: <instance>/{bin_dir})\n  --set KEY=VALUE   Override one environment variable (repeatable)\n\nENVIRONMENT:\n  {color}       auto | always | never\n  {diagnostics}  1 to trace the process view and print a report on exit\n\nGENERAL:\n  -h, --help        Print help\n",
        instance = config::DEFAULT_INSTANCE,
        config_file = config::CONFIG_FILE_NAME,
        env_file = config::ENV_FILE_NAME,
        bin_dir = config::BIN_DIR_NAME,
        color = ui::theme::COLOR_ENV,
        diagnostics = tui::multiprocess::DIAGNOSTICS_ENV,
    )
}

pub fn print_usage() {
    eprintln!("{}", usage());
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
