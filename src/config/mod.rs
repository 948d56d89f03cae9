//! Resolves what to run: instance directory, environment, and the ordered
//! process list.
//!
//! Precedence, lowest first: parent environment (when inherited), the env
//! file, the `[env]` table of `devstack.toml`, then `--set` overrides.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::process_manager::{ProcessSpec, DEFAULT_LOG_BUFFER_BYTES};
use crate::StackArgs;

mod env_file;
mod fleet;

pub(crate) use env_file::parse_assignment;
pub use env_file::read_env_file;
pub use fleet::{default_fleet, COMPOSER, CONDUCTOR, CONSENSUS, SEQUENCER};

pub const DEVSTACK_DIR_NAME: &str = ".devstack";
pub const DEFAULT_INSTANCE: &str = "default";
pub const CONFIG_FILE_NAME: &str = "devstack.toml";
pub const ENV_FILE_NAME: &str = ".env";
pub const BIN_DIR_NAME: &str = "bin";

#[derive(Debug)]
pub enum ConfigError {
    HomeDirUnavailable,
    ConfigRead {
        path: PathBuf,
        error: std::io::Error,
    },
    ConfigParse {
        path: PathBuf,
        error: toml::de::Error,
    },
    EnvFileRead {
        path: PathBuf,
        error: std::io::Error,
    },
    EnvFileLine {
        path: PathBuf,
        line: usize,
        message: String,
    },
    InvalidProcess {
        title: String,
        detail: String,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::HomeDirUnavailable => {
                write!(f, "unable to resolve the home directory for the devstack instance")
            }
            ConfigError::ConfigRead { path, error } => {
                write!(f, "failed to read config {}: {error}", path.display())
            }
            ConfigError::ConfigParse { path, error } => {
                write!(f, "failed to parse config {}: {error}", path.display())
            }
            ConfigError::EnvFileRead { path, error } => write!(
                f,
                "failed to read environment file {}: {error}",
                path.display()
            ),
            ConfigError::EnvFileLine {
                path,
                line,
                message,
            } => write!(f, "{}:{line}: {message}", path.display()),
            ConfigError::InvalidProcess { title, detail } => {
                write!(f, "invalid process `{title}`: {detail}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ConfigRead { error, .. } | ConfigError::EnvFileRead { error, .. } => {
                Some(error)
            }
            ConfigError::ConfigParse { error, .. } => Some(error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StackConfig {
    #[serde(default)]
    pub bin_dir: Option<PathBuf>,
    #[serde(default)]
    pub env_file: Option<PathBuf>,
    #[serde(default = "default_inherit_parent_env")]
    pub inherit_parent_env: bool,
    #[serde(default)]
    pub log_buffer_bytes: Option<usize>,
    #[serde(default)]
    pub env: IndexMap<String, String>,
    #[serde(default, rename = "process")]
    pub processes: Vec<ProcessConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessConfig {
    pub title: String,
    pub binary: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: IndexMap<String, String>,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
}

fn default_inherit_parent_env() -> bool {
    true
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            bin_dir: None,
            env_file: None,
            inherit_parent_env: default_inherit_parent_env(),
            log_buffer_bytes: None,
            env: IndexMap::new(),
            processes: Vec::new(),
        }
    }
}

impl StackConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path).map_err(|error| ConfigError::ConfigRead {
            path: path.to_path_buf(),
            error,
        })?;
        toml::from_str(&source).map_err(|error| ConfigError::ConfigParse {
            path: path.to_path_buf(),
            error,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStack {
    pub instance_dir: PathBuf,
    pub config_path: Option<PathBuf>,
    pub bin_dir: PathBuf,
    pub env_file: PathBuf,
    pub environment: IndexMap<String, String>,
    pub processes: Vec<ProcessSpec>,
    pub log_buffer_bytes: usize,
}

impl ResolvedStack {
    pub fn environment_pairs(&self) -> Vec<(String, String)> {
        self.environment
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

pub fn resolve_stack(args: &StackArgs) -> Result<ResolvedStack, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::HomeDirUnavailable)?;
    let parent_env = std::env::vars().collect::<Vec<(String, String)>>();
    resolve_stack_in(&home, args, parent_env)
}

/// Resolution against an explicit home directory and parent environment.
pub fn resolve_stack_in(
    home: &Path,
    args: &StackArgs,
    parent_env: Vec<(String, String)>,
) -> Result<ResolvedStack, ConfigError> {
    let instance = args.instance.as_deref().unwrap_or(DEFAULT_INSTANCE);
    let instance_dir = home.join(DEVSTACK_DIR_NAME).join(instance);

    let config_path = match &args.config {
        Some(path) => Some(path.clone()),
        None => Some(instance_dir.join(CONFIG_FILE_NAME)).filter(|path| path.is_file()),
    };
    let config = match &config_path {
        Some(path) => StackConfig::load(path)?,
        None => StackConfig::default(),
    };

    let bin_dir = args
        .bin_dir
        .clone()
        .or_else(|| config.bin_dir.as_ref().map(|dir| instance_dir.join(dir)))
        .unwrap_or_else(|| instance_dir.join(BIN_DIR_NAME));
    let env_file = args
        .env_file
        .clone()
        .or_else(|| config.env_file.as_ref().map(|file| instance_dir.join(file)))
        .unwrap_or_else(|| instance_dir.join(ENV_FILE_NAME));

    let mut environment = IndexMap::new();
    if config.inherit_parent_env {
        environment.extend(parent_env);
    }
    environment.extend(read_env_file(&env_file)?);
    environment.extend(config.env.clone());
    environment.extend(args.overrides.iter().cloned());

    let processes = if config.processes.is_empty() {
        default_fleet(&instance_dir, &bin_dir)
            .into_iter()
            .map(|spec| spec.with_env(render_env(&environment)))
            .collect::<Vec<_>>()
    } else {
        config
            .processes
            .iter()
            .map(|process| process_spec(process, &bin_dir, &instance_dir, &environment))
            .collect::<Result<Vec<_>, _>>()?
    };
    Ok(ResolvedStack {
        instance_dir,
        config_path,
        bin_dir,
        env_file,
        environment,
        processes,
        log_buffer_bytes: config
            .log_buffer_bytes
            .unwrap_or(DEFAULT_LOG_BUFFER_BYTES),
    })
}

fn process_spec(
    process: &ProcessConfig,
    bin_dir: &Path,
    instance_dir: &Path,
    environment: &IndexMap<String, String>,
) -> Result<ProcessSpec, ConfigError> {
    if process.title.trim().is_empty() {
        return Err(ConfigError::InvalidProcess {
            title: process.title.clone(),
            detail: "title must not be empty".to_owned(),
        });
    }
    if process.binary.as_os_str().is_empty() {
        return Err(ConfigError::InvalidProcess {
            title: process.title.clone(),
            detail: "binary must not be empty".to_owned(),
        });
    }
    let mut env = environment.clone();
    env.extend(process.env.clone());
    let mut spec = ProcessSpec::new(process.title.clone(), bin_dir.join(&process.binary))
        .with_args(process.args.clone())
        .with_env(render_env(&env));
    if let Some(cwd) = &process.cwd {
        spec = spec.with_cwd(instance_dir.join(cwd));
    }
    Ok(spec)
}

fn render_env(environment: &IndexMap<String, String>) -> Vec<String> {
    environment
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect()
}

#[cfg(test)]
#[path = "../tests/config_tests.rs"]
mod tests;
