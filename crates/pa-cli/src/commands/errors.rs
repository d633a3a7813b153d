//! Print the status code catalog.

use std::io::Write;

use anyhow::Result;
use pa_core::ErrorCode;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct CatalogEntry {
    code: i32,
    message: String,
}

fn entries() -> Vec<CatalogEntry> {
    ErrorCode::CATALOG
        .iter()
        .map(|err| CatalogEntry {
            code: err.code(),
            message: err.to_string(),
        })
        .collect()
}

/// Writes every documented status code with its message.
pub fn run<W: Write>(writer: &mut W, json: bool) -> Result<()> {
    let entries = entries();
    if json {
        serde_json::to_writer_pretty(&mut *writer, &entries)?;
        writeln!(writer)?;
        return Ok(());
    }

    writeln!(writer, "{:>4}  Message", "Code")?;
    for entry in &entries {
        writeln!(writer, "{:>4}  {}", entry.code, entry.message)?;
    }
    Ok(())
}
