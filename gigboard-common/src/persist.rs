//! Atomic file persistence
//!
//! Every persisted file (dataset, timestamp, lookup store, TOML config) is
//! written to a sibling temp file and renamed over the target, so readers see
//! either the old or the new content and never a partial write.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

/// Write `contents` to `target` via a uniquely named sibling temp file + rename
pub fn write_atomic(target: &Path, contents: &[u8]) -> Result<()> {
    let parent = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "gigboard".to_string());

    // Dropping the handle on an early return removes the temp file
    let mut temp = tempfile::Builder::new()
        .prefix(&format!(".{}.", file_name))
        .suffix(".tmp")
        .tempfile_in(parent)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(target).map_err(|e| Error::Io(e.error))?;

    debug!(path = %target.display(), bytes = contents.len(), "Atomic write complete");
    Ok(())
}

/// Serialize `rows` as JSON Lines and write atomically
pub fn write_json_lines<T: Serialize>(target: &Path, rows: &[T]) -> Result<()> {
    let mut buf = Vec::with_capacity(rows.len() * 256);
    for row in rows {
        serde_json::to_writer(&mut buf, row)?;
        buf.push(b'\n');
    }
    write_atomic(target, &buf)
}

/// Non-blank lines of `bytes`, numbered from 1
fn numbered_lines(bytes: &[u8]) -> impl Iterator<Item = (usize, &[u8])> {
    bytes
        .split(|b| *b == b'\n')
        .enumerate()
        .map(|(index, line)| (index + 1, line.strip_suffix(b"\r").unwrap_or(line)))
        .filter(|(_, line)| !line.iter().all(u8::is_ascii_whitespace))
}

fn parse_row<T: DeserializeOwned>(line: &[u8]) -> std::result::Result<T, String> {
    let text = std::str::from_utf8(line).map_err(|e| e.to_string())?;
    serde_json::from_str(text).map_err(|e| e.to_string())
}

/// Read a JSON Lines file, failing on the first malformed row
pub fn read_json_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let bytes = fs::read(path)?;
    numbered_lines(&bytes)
        .map(|(number, line)| {
            parse_row(line)
                .map_err(|e| Error::InvalidInput(format!("{} line {}: {}", path.display(), number, e)))
        })
        .collect()
}

/// Read a JSON Lines file, skipping malformed rows
///
/// A row that is not valid UTF-8 or not valid JSON for `T` is skipped.
/// Returns the parsed rows and the number of rows skipped.
pub fn read_json_lines_lenient<T: DeserializeOwned>(path: &Path) -> Result<(Vec<T>, usize)> {
    let bytes = fs::read(path)?;
    let mut rows = Vec::new();
    let mut skipped = 0;
    for (number, line) in numbered_lines(&bytes) {
        match parse_row(line) {
            Ok(row) => rows.push(row),
            Err(e) => {
                warn!(path = %path.display(), line = number, error = %e, "Skipping malformed row");
                skipped += 1;
            }
        }
    }
    Ok((rows, skipped))
}
