use anstyle::{AnsiColor, Color, Style};

/// `always`, `never` or `auto` (the default).
pub const COLOR_ENV: &str = "DEVSTACK_COLOR";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Auto,
    Always,
    Never,
}

impl OutputMode {
    pub fn from_env() -> Self {
        Self::parse(std::env::var(COLOR_ENV).ok().as_deref())
    }

    /// Unrecognised values fall back to `Auto`.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(value) if value.eq_ignore_ascii_case("always") => OutputMode::Always,
            Some(value) if value.eq_ignore_ascii_case("never") => OutputMode::Never,
            _ => OutputMode::Auto,
        }
    }
}

/// Styles for operator output. Process names share the key colour so the
/// exit summary lines up with the env and processes listings.
#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub accent: Style,
    pub muted: Style,
    pub success: Style,
    pub warning: Style,
    pub error: Style,
    pub label: Style,
    pub value: Style,
}

impl Default for Theme {
    fn default() -> Self {
        let bold = |color: AnsiColor| Style::new().fg_color(Some(Color::Ansi(color))).bold();
        Self {
            accent: bold(AnsiColor::Cyan),
            muted: Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))),
            success: bold(AnsiColor::Green),
            warning: bold(AnsiColor::Yellow),
            error: bold(AnsiColor::Red),
            label: bold(AnsiColor::Blue),
            value: Style::new().fg_color(Some(Color::Ansi(AnsiColor::White))),
        }
    }
}

/// `NO_COLOR` wins over every mode.
pub fn resolve_color_enabled(mode: OutputMode, is_tty: bool) -> bool {
    color_enabled_for(mode, is_tty, std::env::var_os("NO_COLOR").is_some())
}

fn color_enabled_for(mode: OutputMode, is_tty: bool, no_color: bool) -> bool {
    if no_color {
        return false;
    }
    match mode {
        OutputMode::Always => true,
        OutputMode::Never => false,
        OutputMode::Auto => is_tty,
    }
}

pub fn is_ci_environment() -> bool {
    std::env::var_os("CI").is_some()
}
