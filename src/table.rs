//! Elastic plain-text tables for terminal output.
//!
//! Columns whose cells are all numeric (counts, sums, percentages) are right
//! aligned; everything else is left aligned. "no data" cells do not affect
//! alignment.

use std::borrow::Cow;
use std::fmt::Write as _;

const NO_DATA: &str = "no data";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let column_count = headers.len();
    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(display_width(cell));
        }
    }
    let aligns = (0..column_count)
        .map(|idx| column_alignment(rows, idx))
        .collect::<Vec<_>>();

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths, &aligns));
    let separator = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separator, &widths, &aligns));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths, &aligns));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

/// Right alignment needs at least one numeric cell and no text cells.
fn column_alignment(rows: &[Vec<String>], idx: usize) -> Align {
    let mut numeric = false;
    for cell in rows.iter().filter_map(|row| row.get(idx)) {
        let trimmed = cell.trim();
        if trimmed.is_empty() || trimmed == NO_DATA {
            continue;
        }
        if !is_numeric(trimmed) {
            return Align::Left;
        }
        numeric = true;
    }
    if numeric { Align::Right } else { Align::Left }
}

fn is_numeric(value: &str) -> bool {
    value.strip_suffix('%').unwrap_or(value).parse::<f64>().is_ok()
}

fn format_row(values: &[String], widths: &[usize], aligns: &[Align]) -> String {
    let mut cells = Vec::with_capacity(widths.len());
    for (idx, width) in widths.iter().enumerate() {
        let value = values.get(idx).map(String::as_str).unwrap_or("");
        let sanitized = sanitize_cell(value);
        let padding = " ".repeat(width.saturating_sub(display_width(&sanitized)));
        let cell = match aligns.get(idx) {
            Some(Align::Right) => format!("{padding}{sanitized}"),
            _ => format!("{sanitized}{padding}"),
        };
        cells.push(cell);
    }
    cells.join("  ").trim_end().to_string()
}

fn display_width(value: &str) -> usize {
    let mut width = 0usize;
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch == '\u{1b}' {
            // ANSI escape sequence, e.g. \x1b[31m
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            width += 1;
        }
    }
    width
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
