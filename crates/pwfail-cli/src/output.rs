use serde::Serialize;
use std::io::Write;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    write_json(&mut std::io::stdout().lock(), value)
}

fn write_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

fn display_width(cell: &str) -> usize {
    cell.chars().count()
}

fn pad(cell: &str, width: usize) -> String {
    let fill = width.saturating_sub(display_width(cell));
    format!("{cell}{}", " ".repeat(fill))
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    // Column widths in chars; test names carry multi-byte separators.
    let mut widths: Vec<usize> = headers.iter().map(|h| display_width(h)).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(display_width(cell));
            }
        }
    }

    let header_row: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| pad(h, widths[i]))
        .collect();
    println!("{}", header_row.join("  ").trim_end());

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep.join("  "));

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| pad(cell, widths.get(i).copied().unwrap_or(0)))
            .collect();
        println!("{}", cells.join("  ").trim_end());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn json_ends_with_newline() {
        let mut buf = Vec::new();
        write_json(&mut buf, &serde_json::json!({ "cancelled": true })).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "{\n  \"cancelled\": true\n}\n");
    }

    #[test]
    fn write_failure_is_reported() {
        let err = write_json(&mut ClosedPipe, &serde_json::json!({ "cancelled": true }));
        assert!(err.is_err());
    }
}
