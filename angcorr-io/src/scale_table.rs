//! Delimited persistence for the background scale-factor table.
//!
//! Format: an `index,scale` header, then one `index,scale` row per
//! angular index in ascending order.

use crate::error::{Error, Result};

use angcorr_core::ScaleFactorTable;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

const HEADER: &str = "index,scale";

/// Writes a scale-factor table.
pub fn write_scale_factors<P: AsRef<Path>>(path: P, table: &ScaleFactorTable) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "{HEADER}")?;
    for (index, factor) in table.iter() {
        writeln!(writer, "{index},{factor}")?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads a scale-factor table.
///
/// Any structural problem (bad header, unparsable row, out-of-order
/// index) is reported as [`Error::MalformedScaleTable`]; callers treat
/// that the same as an absent file and regenerate the table.
pub fn read_scale_factors<P: AsRef<Path>>(path: P) -> Result<ScaleFactorTable> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = reader.lines();

    let header = lines
        .next()
        .transpose()?
        .ok_or_else(|| malformed(1, "empty file"))?;
    if header.trim() != HEADER {
        return Err(malformed(1, format!("expected '{HEADER}' header")));
    }

    let mut factors = Vec::new();
    for (offset, line) in lines.enumerate() {
        let line_no = offset + 2;
        let line = line?;
        let row = line.trim();
        if row.is_empty() {
            continue;
        }
        let (index_field, factor_field) = row
            .split_once(',')
            .ok_or_else(|| malformed(line_no, "expected 'index,scale'"))?;
        let index: usize = index_field
            .trim()
            .parse()
            .map_err(|_| malformed(line_no, format!("bad index '{index_field}'")))?;
        if index != factors.len() {
            return Err(malformed(
                line_no,
                format!("expected index {}, got {index}", factors.len()),
            ));
        }
        let factor: f64 = factor_field
            .trim()
            .parse()
            .map_err(|_| malformed(line_no, format!("bad scale '{factor_field}'")))?;
        factors.push(factor);
    }

    if factors.is_empty() {
        return Err(malformed(2, "no rows"));
    }
    Ok(ScaleFactorTable::new(factors))
}

fn malformed(line: usize, reason: impl Into<String>) -> Error {
    Error::MalformedScaleTable {
        line,
        reason: reason.into(),
    }
}
