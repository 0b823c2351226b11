//! File and terminal export sinks: CSV and comfy-table.

use std::io::Write;

use comfy_table::{Cell, Table};

use asterix_core::export::{ExportSink, FieldValue};
use asterix_core::types::Result;

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Comma-separated output. Absent values are empty cells.
pub struct CsvSink<W: Write> {
    out: W,
}

impl<W: Write> CsvSink<W> {
    pub fn new(out: W) -> Self {
        CsvSink { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_record<I, S>(&mut self, cells: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let line: Vec<String> = cells.into_iter().map(|c| quote(c.as_ref())).collect();
        writeln!(self.out, "{}", line.join(","))?;
        Ok(())
    }
}

fn quote(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

impl<W: Write> ExportSink for CsvSink<W> {
    fn write_header(&mut self, columns: &[&str]) -> Result<()> {
        self.write_record(columns)
    }

    fn write_row(&mut self, row: &[Option<FieldValue>]) -> Result<()> {
        self.write_record(
            row.iter()
                .map(|v| v.as_ref().map(|v| v.to_string()).unwrap_or_default()),
        )
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Terminal table
// ---------------------------------------------------------------------------

/// Pretty table written on `finish`. Absent values show as `-`.
pub struct TableSink<W: Write> {
    table: Table,
    out: W,
}

impl<W: Write> TableSink<W> {
    pub fn new(out: W) -> Self {
        TableSink {
            table: Table::new(),
            out,
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

fn display_cell(value: &Option<FieldValue>) -> Cell {
    match value {
        Some(FieldValue::Float(v)) => Cell::new(format!("{v:.4}")),
        Some(v) => Cell::new(v),
        None => Cell::new("-"),
    }
}

impl<W: Write> ExportSink for TableSink<W> {
    fn write_header(&mut self, columns: &[&str]) -> Result<()> {
        self.table.set_header(columns.to_vec());
        Ok(())
    }

    fn write_row(&mut self, row: &[Option<FieldValue>]) -> Result<()> {
        self.table.add_row(row.iter().map(display_cell).collect::<Vec<_>>());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        writeln!(self.out, "{}", self.table)?;
        self.out.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
