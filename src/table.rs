// src/table.rs
use crate::import::Record;

/// Widest a column gets before cells are cut.
const MAX_CELL_WIDTH: usize = 24;
const ELLIPSIS: char = '…';

fn clip(s: &str, width: usize) -> String {
    // one line per row
    let s = s.replace(['\n', '\r'], " ");
    if s.chars().count() <= width {
        return s;
    }
    let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
    out.push(ELLIPSIS);
    out
}

fn pad(s: &str, width: usize) -> String {
    let len = s.chars().count();
    format!("{}{}", s, " ".repeat(width.saturating_sub(len)))
}

/// Plain-text table of `records`, columns in `headers` order.
/// With no records a single blank row is drawn.
pub fn render(headers: &[String], records: &[Record]) -> String {
    if headers.is_empty() {
        return String::from("(no data imported)\n");
    }

    let rows: Vec<Vec<String>> = if records.is_empty() {
        vec![vec![String::new(); headers.len()]]
    } else {
        records
            .iter()
            .map(|r| {
                headers
                    .iter()
                    .map(|h| {
                        let cell = r.get(h).map(|v| v.to_string()).unwrap_or_default();
                        clip(&cell, MAX_CELL_WIDTH)
                    })
                    .collect()
            })
            .collect()
    };

    let header_cells: Vec<String> = headers.iter().map(|h| clip(h, MAX_CELL_WIDTH)).collect();
    let widths: Vec<usize> = (0..headers.len())
        .map(|i| {
            rows.iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(header_cells[i].chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| pad(c, *w))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    out.push_str(&line(&header_cells));
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    out.push('\n');
    for row in &rows {
        out.push_str(&line(row));
        out.push('\n');
    }
    out
}
