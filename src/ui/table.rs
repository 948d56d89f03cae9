use tabled::builder::Builder;
use tabled::settings::{Padding, Style};

use crate::ui::widgets::TableSpec;

const EMPTY_CELL: &str = "<none>";

/// Renders borderless, left-aligned columns. An empty table still prints its
/// header over a single `<none>` row.
pub fn render_table(spec: &TableSpec) -> String {
    let width = spec
        .rows
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(spec.headers.len()))
        .max()
        .unwrap_or(0);
    if width == 0 {
        return EMPTY_CELL.to_owned();
    }

    let mut builder = Builder::default();
    if !spec.headers.is_empty() {
        builder.push_record(padded(&spec.headers, width));
    }
    if spec.rows.is_empty() {
        builder.push_record(padded(&[EMPTY_CELL.to_owned()], width));
    }
    for row in &spec.rows {
        builder.push_record(padded(row, width));
    }
    let mut table = builder.build();
    table.with(Style::blank());
    table.with(Padding::new(0, 2, 0, 0));
    table
        .to_string()
        .lines()
        .map(str::trim_end)
        .collect::<Vec<&str>>()
        .join("\n")
}

fn padded(cells: &[String], width: usize) -> Vec<String> {
    let mut row = cells.to_vec();
    row.resize(width, String::new());
    row
}
