//! Shared helper functions for CLI commands.

use console::style;

use fsbo::dataset::Dataset;
use fsbo::models::COLUMNS;

/// Widest a preview cell may get before it is truncated.
const PREVIEW_CELL_WIDTH: usize = 32;

/// Truncate a string to `max_chars`, appending "..." if cut.
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// Print the first `rows` records as an aligned table.
pub fn print_preview(dataset: &Dataset, rows: usize) {
    let cells: Vec<Vec<String>> = dataset
        .iter()
        .take(rows)
        .map(|record| {
            record
                .values()
                .iter()
                .map(|v| truncate(v, PREVIEW_CELL_WIDTH))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = COLUMNS
        .iter()
        .enumerate()
        .map(|(i, header)| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header = COLUMNS
        .iter()
        .zip(&widths)
        .map(|(h, w)| format!("{:<width$}", h, width = w))
        .collect::<Vec<_>>()
        .join("  ");
    println!("\n{}", style(header).bold());

    for row in &cells {
        let line = row
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{:<width$}", cell, width = w))
            .collect::<Vec<_>>()
            .join("  ");
        println!("{}", line);
    }

    if dataset.len() > rows {
        println!("{}", style(format!("... {} more", dataset.len() - rows)).dim());
    }
    println!();
}
