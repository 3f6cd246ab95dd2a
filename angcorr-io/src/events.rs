//! Plain-text reader for preprocessed coincidence events.
//!
//! The event preprocessor emits one hit per row, grouped into events by
//! an event number:
//!
//! ```text
//! event,energy,x,y,z,time,detector
//! 0,1173.2,145.0,0.0,0.0,12.5,3
//! 0,1332.5,0.0,145.0,0.0,14.1,17
//! 1,...
//! ```
//!
//! Rows sharing an event number must be consecutive.

use crate::error::{Error, Result};

use angcorr_core::{CoincidenceHit, Position};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

const HEADER: &str = "event,energy,x,y,z,time,detector";

/// Reads preprocessed events from a CSV file.
pub fn read_events_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<CoincidenceHit>>> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = reader.lines();

    let header = lines
        .next()
        .transpose()?
        .ok_or_else(|| malformed(1, "empty file"))?;
    if header.trim() != HEADER {
        return Err(malformed(1, format!("expected '{HEADER}' header")));
    }

    let mut events: Vec<Vec<CoincidenceHit>> = Vec::new();
    let mut current: Vec<CoincidenceHit> = Vec::new();
    let mut current_event: Option<u64> = None;

    for (offset, line) in lines.enumerate() {
        let line_no = offset + 2;
        let line = line?;
        let row = line.trim();
        if row.is_empty() {
            continue;
        }

        let fields: Vec<&str> = row.split(',').collect();
        if fields.len() != 7 {
            return Err(malformed(line_no, format!("expected 7 fields, got {}", fields.len())));
        }
        let event: u64 = parse(fields[0], "event", line_no)?;
        let energy: f64 = parse(fields[1], "energy", line_no)?;
        let x: f64 = parse(fields[2], "x", line_no)?;
        let y: f64 = parse(fields[3], "y", line_no)?;
        let z: f64 = parse(fields[4], "z", line_no)?;
        let time: f64 = parse(fields[5], "time", line_no)?;
        let detector: u16 = parse(fields[6], "detector", line_no)?;

        if current_event != Some(event) {
            if !current.is_empty() {
                events.push(std::mem::take(&mut current));
            }
            current_event = Some(event);
        }
        current.push(CoincidenceHit::new(
            energy,
            Position::new(x, y, z),
            time,
            detector,
        ));
    }
    if !current.is_empty() {
        events.push(current);
    }

    Ok(events)
}

fn parse<T: std::str::FromStr>(field: &str, what: &str, line: usize) -> Result<T> {
    field
        .trim()
        .parse()
        .map_err(|_| malformed(line, format!("bad {what} '{field}'")))
}

fn malformed(line: usize, reason: impl Into<String>) -> Error {
    Error::MalformedEventFile {
        line,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::NamedTempFile;

    #[test]
    fn test_reads_grouped_events() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            "event,energy,x,y,z,time,detector\n\
             0,1173.2,145.0,0.0,0.0,12.5,3\n\
             0,1332.5,0.0,145.0,0.0,14.1,17\n\
             2,661.7,0.0,0.0,145.0,20.0,5\n",
        )
        .unwrap();

        let events = read_events_csv(file.path()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].len(), 2);
        assert_eq!(events[1].len(), 1);
        assert_relative_eq!(events[0][1].energy_kev, 1332.5);
        assert_eq!(events[1][0].detector, 5);
    }

    #[test]
    fn test_rejects_bad_rows() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            "event,energy,x,y,z,time,detector\n0,oops,0,0,0,0,0\n",
        )
        .unwrap();
        assert!(matches!(
            read_events_csv(file.path()),
            Err(Error::MalformedEventFile { line: 2, .. })
        ));
    }

    #[test]
    fn test_rejects_wrong_header() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "e,x\n").unwrap();
        assert!(matches!(
            read_events_csv(file.path()),
            Err(Error::MalformedEventFile { line: 1, .. })
        ));
    }
}
