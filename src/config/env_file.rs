use std::fs;
use std::path::Path;

use indexmap::IndexMap;

use super::ConfigError;

/// Reads a `KEY=VALUE` environment file. Blank lines and `#` comments are
/// skipped, an `export ` prefix is accepted, and one layer of matching quotes
/// around the value is removed. Later keys overwrite earlier ones in place.
pub fn read_env_file(path: &Path) -> Result<IndexMap<String, String>, ConfigError> {
    let source = fs::read_to_string(path).map_err(|error| ConfigError::EnvFileRead {
        path: path.to_path_buf(),
        error,
    })?;
    parse_env_source(&source).map_err(|(line, message)| ConfigError::EnvFileLine {
        path: path.to_path_buf(),
        line,
        message,
    })
}

pub(crate) fn parse_env_source(source: &str) -> Result<IndexMap<String, String>, (usize, String)> {
    let mut entries = IndexMap::new();
    for (idx, raw) in source.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").map_or(line, str::trim_start);
        let Some((key, value)) = line.split_once('=') else {
            return Err((idx + 1, format!("expected KEY=VALUE, found `{line}`")));
        };
        let key = key.trim();
        if !is_valid_key(key) {
            return Err((idx + 1, format!("invalid variable name `{key}`")));
        }
        entries.insert(key.to_owned(), unquote(value.trim()).to_owned());
    }
    Ok(entries)
}

/// Parses a `KEY=VALUE` override from the command line.
pub(crate) fn parse_assignment(raw: &str) -> Option<(String, String)> {
    let (key, value) = raw.split_once('=')?;
    let key = key.trim();
    is_valid_key(key).then(|| (key.to_owned(), value.to_owned()))
}

fn is_valid_key(key: &str) -> bool {
    let mut chars = key.chars();
    chars
        .next()
        .is_some_and(|first| first == '_' || first.is_ascii_alphabetic())
        && chars.all(|ch| ch == '_' || ch.is_ascii_alphanumeric())
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    match value.find(" #") {
        Some(pos) => value[..pos].trim_end(),
        None => value,
    }
}
