use crate::config::ResolvedStack;
use crate::ui::{KeyValue, PlainRenderer, Renderer, TableSpec};

use super::{into_output, CommandError};

/// The environment every process receives, in precedence-resolved order.
pub fn render_environment(
    stack: &ResolvedStack,
    color_enabled: bool,
) -> Result<String, CommandError> {
    let mut renderer = PlainRenderer::new(Vec::<u8>::new(), color_enabled);
    renderer.section("Stack Environment")?;
    renderer.key_values(&[
        KeyValue::new("instance", stack.instance_dir.display().to_string()),
        KeyValue::new("env-file", stack.env_file.display().to_string()),
        KeyValue::new("variables", stack.environment.len().to_string()),
    ])?;
    renderer.text("")?;
    renderer.table(
        &TableSpec::new(["key", "value"])
            .rows(stack.environment.iter().map(|(key, value)| [key, value])),
    )?;
    into_output(renderer)
}

pub fn render_processes(
    stack: &ResolvedStack,
    color_enabled: bool,
) -> Result<String, CommandError> {
    let mut renderer = PlainRenderer::new(Vec::<u8>::new(), color_enabled);
    renderer.section("Stack Processes")?;
    let config = stack
        .config_path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<default fleet>".to_owned());
    renderer.key_values(&[
        KeyValue::new("instance", stack.instance_dir.display().to_string()),
        KeyValue::new("config", config),
        KeyValue::new("bin-dir", stack.bin_dir.display().to_string()),
        KeyValue::new("log-buffer", format!("{} bytes", stack.log_buffer_bytes)),
    ])?;
    renderer.text("")?;
    renderer.table(&TableSpec::new(["order", "process", "command", "cwd"]).rows(
        stack.processes.iter().enumerate().map(|(idx, spec)| {
            [
                (idx + 1).to_string(),
                spec.title.clone(),
                spec.command_line(),
                spec.cwd
                    .as_ref()
                    .map(|cwd| cwd.display().to_string())
                    .unwrap_or_else(|| "<inherited>".to_owned()),
            ]
        }),
    ))?;
    for spec in stack.processes.iter().filter(|spec| !spec.binary.is_file()) {
        renderer.warning(&format!(
            "{}: binary not found at {}",
            spec.title,
            spec.binary.display()
        ))?;
    }
    into_output(renderer)
}
