use std::collections::VecDeque;
use std::time::Duration;

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use super::config::{MAX_PANE_LINES, MAX_PARTIAL_LINE_BYTES};

/// Line model behind a pane. Complete lines are committed once their newline
/// arrives; the unterminated tail stays as raw bytes so carriage-return
/// progress output keeps rewriting it in place. Frames overwritten by a later
/// `\r` are dropped as they arrive, and the tail never exceeds
/// [`MAX_PARTIAL_LINE_BYTES`].
#[derive(Debug, Clone)]
pub(crate) struct PaneText {
    lines: VecDeque<String>,
    partial: Vec<u8>,
    max_lines: usize,
}

impl Default for PaneText {
    fn default() -> Self {
        Self::with_max_lines(MAX_PANE_LINES)
    }
}

impl PaneText {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_max_lines(max_lines: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            partial: Vec::new(),
            max_lines: max_lines.max(1),
        }
    }

    pub(crate) fn ingest(&mut self, bytes: &[u8]) {
        let mut rest = bytes;
        while let Some(pos) = rest.iter().position(|byte| *byte == b'\n') {
            self.partial.extend_from_slice(&rest[..pos]);
            let line = std::mem::take(&mut self.partial);
            self.commit(&String::from_utf8_lossy(&line));
            rest = &rest[pos + 1..];
        }
        if !rest.is_empty() {
            self.partial.extend_from_slice(rest);
            if rest.contains(&b'\r') {
                self.drop_overwritten_frames();
            }
            self.cap_partial();
        }
    }

    #[cfg(test)]
    fn partial_len(&self) -> usize {
        self.partial.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.open_line().is_none()
    }

    /// Committed lines followed by the open partial line, SGR sequences kept.
    pub(crate) fn lines(&self) -> Vec<String> {
        let mut lines = self.lines.iter().cloned().collect::<Vec<String>>();
        if let Some(open) = self.open_line() {
            lines.push(open);
        }
        lines
    }

    pub(crate) fn styled_lines(&self, base: Style) -> Vec<Line<'static>> {
        self.lines()
            .iter()
            .map(|line| ansi_line(line, base))
            .collect()
    }

    fn open_line(&self) -> Option<String> {
        if self.partial.is_empty() {
            return None;
        }
        let (normalized, _) = normalize_terminal_payload(&String::from_utf8_lossy(&self.partial));
        last_visible_fragment(&normalized)
    }

    fn commit(&mut self, raw: &str) {
        let (normalized, cursor_up) = normalize_terminal_payload(raw);
        let Some(line) = last_visible_fragment(&normalized) else {
            if cursor_up == 0 {
                self.push(String::new());
            }
            return;
        };
        for _ in 0..cursor_up.min(self.lines.len()) {
            self.lines.pop_back();
        }
        self.push(line);
    }

    /// Keeps the last visible frame of the open line. Colour and cursor-up
    /// sequences from the dropped frames are carried in front of it.
    fn drop_overwritten_frames(&mut self) {
        let Some(cut) = last_frame_start(&self.partial) else {
            return;
        };
        let mut kept = carried_controls(&self.partial[..cut]);
        kept.extend_from_slice(&self.partial[cut + 1..]);
        self.partial = kept;
    }

    fn cap_partial(&mut self) {
        if self.partial.len() <= MAX_PARTIAL_LINE_BYTES {
            return;
        }
        let mut start = self.partial.len() - MAX_PARTIAL_LINE_BYTES;
        while start < self.partial.len() && (self.partial[start] & 0xC0) == 0x80 {
            start += 1;
        }
        self.partial.drain(..start);
    }

    fn push(&mut self, line: String) {
        self.lines.push_back(line);
        while self.lines.len() > self.max_lines {
            self.lines.pop_front();
        }
    }
}

/// Position of the `\r` that opens the last non-empty frame.
fn last_frame_start(partial: &[u8]) -> Option<usize> {
    let mut end = partial.len();
    while let Some(pos) = partial[..end].iter().rposition(|byte| *byte == b'\r') {
        if pos + 1 < end {
            return Some(pos);
        }
        end = pos;
    }
    None
}

/// The SGR state and cursor-up movement that `dropped` leaves behind.
fn carried_controls(dropped: &[u8]) -> Vec<u8> {
    let mut sgr: Vec<&[u8]> = Vec::new();
    let mut cursor_up = 0usize;
    let mut i = 0usize;
    while i + 1 < dropped.len() {
        if dropped[i] != 0x1b || dropped[i + 1] != b'[' {
            i += 1;
            continue;
        }
        let start = i;
        let mut end = i + 2;
        while end < dropped.len() && !(b'@'..=b'~').contains(&dropped[end]) {
            end += 1;
        }
        if end == dropped.len() {
            break;
        }
        let params = &dropped[start + 2..end];
        match dropped[end] {
            b'm' if params.is_empty() || params == b"0" => sgr.clear(),
            b'm' => sgr.push(&dropped[start..=end]),
            b'A' | b'F' => {
                let count = std::str::from_utf8(params)
                    .ok()
                    .and_then(|params| params.split(';').next())
                    .filter(|value| !value.is_empty())
                    .map_or(Some(1usize), |value| value.parse::<usize>().ok())
                    .unwrap_or(1usize);
                cursor_up = cursor_up.saturating_add(count);
            }
            _ => {}
        }
        i = end + 1;
    }

    let mut carried = Vec::new();
    if cursor_up > 0 {
        carried.extend_from_slice(format!("\u{1b}[{cursor_up}A").as_bytes());
    }
    for sequence in sgr {
        carried.extend_from_slice(sequence);
    }
    carried
}

fn last_visible_fragment(normalized: &str) -> Option<String> {
    normalized
        .split('\r')
        .map(sanitize_log_text)
        .filter(|fragment| !fragment.is_empty())
        .last()
}

/// Strips every escape except SGR and reports how many rows the payload moved
/// the cursor up.
fn normalize_terminal_payload(raw: &str) -> (String, usize) {
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::new();
    let mut i = 0usize;
    let mut cursor_up = 0usize;
    while i < chars.len() {
        let ch = chars[i];
        if ch == '\u{1b}' && i + 1 < chars.len() {
            match chars[i + 1] {
                '[' => {
                    let start = i;
                    i += 2;
                    let mut params = String::new();
                    while i < chars.len() {
                        let final_byte = chars[i];
                        if ('@'..='~').contains(&final_byte) {
                            if final_byte == 'm' {
                                out.extend(chars[start..=i].iter());
                            } else if final_byte == 'A' || final_byte == 'F' {
                                let count = params
                                    .split(';')
                                    .next()
                                    .filter(|value| !value.is_empty())
                                    .map_or(Some(1usize), |value| value.parse::<usize>().ok())
                                    .unwrap_or(1usize);
                                cursor_up = cursor_up.saturating_add(count);
                            }
                            break;
                        }
                        params.push(final_byte);
                        i += 1;
                    }
                }
                ']' => {
                    i += 2;
                    while i < chars.len() {
                        if chars[i] == '\u{0007}' {
                            break;
                        }
                        if chars[i] == '\u{1b}' && i + 1 < chars.len() && chars[i + 1] == '\\' {
                            i += 1;
                            break;
                        }
                        i += 1;
                    }
                }
                _ => i += 1,
            }
        } else if ch == '\t' {
            out.push_str("    ");
        } else {
            out.push(ch);
        }
        i += 1;
    }
    (out, cursor_up)
}

pub(crate) fn sanitize_log_text(raw: &str) -> String {
    raw.chars()
        .filter(|ch| {
            !matches!(
                ch,
                '\r'
                    | '\u{0000}'..='\u{0008}'
                    | '\u{000B}'
                    | '\u{000C}'
                    | '\u{000E}'..='\u{001A}'
                    | '\u{001C}'..='\u{001F}'
                    | '\u{007F}'
            )
        })
        .collect()
}

pub(crate) fn ansi_line(raw: &str, base: Style) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut style = base;
    let mut buf = String::new();
    let chars: Vec<char> = raw.chars().collect();
    let mut i = 0usize;
    while i < chars.len() {
        if chars[i] == '\u{1b}' && i + 1 < chars.len() && chars[i + 1] == '[' {
            if !buf.is_empty() {
                spans.push(Span::styled(std::mem::take(&mut buf), style));
            }
            i += 2;
            let mut code = String::new();
            while i < chars.len() {
                let final_byte = chars[i];
                if ('@'..='~').contains(&final_byte) {
                    if final_byte == 'm' {
                        style = apply_sgr(style, &code, base);
                    }
                    break;
                }
                code.push(chars[i]);
                i += 1;
            }
        } else {
            buf.push(chars[i]);
        }
        i += 1;
    }
    if !buf.is_empty() {
        spans.push(Span::styled(buf, style));
    }
    if spans.is_empty() {
        return Line::from("");
    }
    Line::from(spans)
}

fn apply_sgr(current: Style, sgr: &str, base: Style) -> Style {
    let mut style = current;
    let codes = if sgr.is_empty() {
        vec![0u16]
    } else {
        sgr.split([';', ':'])
            .map(|part| part.parse::<u16>().unwrap_or(u16::MAX))
            .collect::<Vec<u16>>()
    };
    let mut idx = 0usize;
    while idx < codes.len() {
        match codes[idx] {
            0 => style = base,
            1 => style = style.add_modifier(Modifier::BOLD),
            2 => style = style.add_modifier(Modifier::DIM),
            3 => style = style.add_modifier(Modifier::ITALIC),
            4 => style = style.add_modifier(Modifier::UNDERLINED),
            7 => style = style.add_modifier(Modifier::REVERSED),
            9 => style = style.add_modifier(Modifier::CROSSED_OUT),
            22 => style = style.remove_modifier(Modifier::BOLD | Modifier::DIM),
            23 => style = style.remove_modifier(Modifier::ITALIC),
            24 => style = style.remove_modifier(Modifier::UNDERLINED),
            27 => style = style.remove_modifier(Modifier::REVERSED),
            29 => style = style.remove_modifier(Modifier::CROSSED_OUT),
            code @ 30..=37 => style = style.fg(basic_color(code - 30)),
            39 => style = style.fg(base.fg.unwrap_or(Color::Reset)),
            code @ 40..=47 => style = style.bg(basic_color(code - 40)),
            49 => style = style.bg(base.bg.unwrap_or(Color::Reset)),
            code @ 90..=97 => style = style.fg(bright_color(code - 90)),
            code @ 100..=107 => style = style.bg(bright_color(code - 100)),
            selector @ (38 | 48) => {
                let (color, consumed) = extended_color(&codes[idx + 1..]);
                if let Some(color) = color {
                    style = if selector == 38 {
                        style.fg(color)
                    } else {
                        style.bg(color)
                    };
                }
                idx += consumed;
            }
            _ => {}
        }
        idx += 1;
    }
    style
}

/// Parses the tail of a `38;5;n` or `38;2;r;g;b` sequence. Returns the
/// colour and how many codes it consumed.
fn extended_color(rest: &[u16]) -> (Option<Color>, usize) {
    match rest {
        [5, index, ..] => (u8::try_from(*index).ok().map(Color::Indexed), 2),
        [2, r, g, b, ..] => {
            let rgb = (u8::try_from(*r), u8::try_from(*g), u8::try_from(*b));
            match rgb {
                (Ok(r), Ok(g), Ok(b)) => (Some(Color::Rgb(r, g, b)), 4),
                _ => (None, 4),
            }
        }
        _ => (None, rest.len()),
    }
}

fn basic_color(offset: u16) -> Color {
    match offset {
        0 => Color::Black,
        1 => Color::Red,
        2 => Color::Green,
        3 => Color::Yellow,
        4 => Color::Blue,
        5 => Color::Magenta,
        6 => Color::Cyan,
        _ => Color::Gray,
    }
}

fn bright_color(offset: u16) -> Color {
    match offset {
        0 => Color::DarkGray,
        1 => Color::LightRed,
        2 => Color::LightGreen,
        3 => Color::LightYellow,
        4 => Color::LightBlue,
        5 => Color::LightMagenta,
        6 => Color::LightCyan,
        _ => Color::White,
    }
}

pub(crate) fn format_elapsed(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}h{minutes:02}m{secs:02}s")
    } else if minutes > 0 {
        format!("{minutes}m{secs:02}s")
    } else {
        format!("{secs}s")
    }
}
