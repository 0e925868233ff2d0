//! Fixed-width rendering of the result table

use std::io::{self, Write};

use crate::results::ResultRow;

pub const HEADER: [&str; 3] = ["IMDB_ID", "Title", "Plot"];
/// Shown in place of empty enrichment text
pub const EMPTY_MARKER: &str = "N/A";
const SEPARATOR: &str = "   |   ";

fn width(cell: &str) -> usize {
    cell.chars().count()
}

/// Write the header and one aligned line per row.
pub fn render<W: Write>(rows: &[ResultRow], out: &mut W) -> io::Result<()> {
    let id_width = rows
        .iter()
        .map(|row| width(&row.id))
        .chain([width(HEADER[0])])
        .max()
        .unwrap_or(0);
    let title_width = rows
        .iter()
        .map(|row| width(&row.title))
        .chain([width(HEADER[1])])
        .max()
        .unwrap_or(0);

    write_line(out, HEADER[0], id_width, HEADER[1], title_width, HEADER[2])?;
    for row in rows {
        let text = if row.text.is_empty() {
            EMPTY_MARKER
        } else {
            row.text.as_str()
        };
        write_line(out, &row.id, id_width, &row.title, title_width, text)?;
    }
    Ok(())
}

fn write_line<W: Write>(
    out: &mut W,
    id: &str,
    id_width: usize,
    title: &str,
    title_width: usize,
    text: &str,
) -> io::Result<()> {
    // `{:<w$}` pads by char count, matching `width`
    writeln!(
        out,
        "{:<id_width$}{SEPARATOR}{:<title_width$}{SEPARATOR}{}",
        id, title, text
    )
}
