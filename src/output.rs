//! Rendering of fetched payloads.

use std::io::Write;

use anyhow::Result;
use tracing::debug;

use crate::fetch::ParsedPayload;

/// Logs the payload using Rust's debug pretty-print format.
pub fn print_pretty(payload: &ParsedPayload) {
    debug!("{:#?}", payload);
}

/// Serializes the payload, compact or indented.
pub fn render_json(payload: &ParsedPayload, pretty: bool) -> Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(payload)?
    } else {
        serde_json::to_string(payload)?
    })
}

/// Writes the rendered payload followed by a newline.
pub fn write_payload<W: Write>(mut out: W, payload: &ParsedPayload, pretty: bool) -> Result<()> {
    writeln!(out, "{}", render_json(payload, pretty)?)?;
    out.flush()?;
    Ok(())
}
