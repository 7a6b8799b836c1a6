// src/output.rs
// =============================================================================
// The consumer end of the crawl: pulls records and writes them out, one
// trailer line each, until the requested count is reached.
//
// Stopping is just "stop pulling". Whatever the crawl has already fetched
// beyond the target is simply never written.
// =============================================================================

use std::io::Write;

use futures::stream::{Stream, StreamExt};

use crate::models::CoAuthorRecord;

// Writes up to `target` records from `records` to `out`
//
// Parameters:
//   records: the crawl's record stream
//   target: how many lines to write
//   out: where the lines go (stdout in the binary, a Vec<u8> in tests)
//
// Returns: how many lines were written; less than `target` only if the
// stream ended first
pub async fn emit_records<S, W>(records: S, target: usize, out: &mut W) -> std::io::Result<usize>
where
    S: Stream<Item = CoAuthorRecord>,
    W: Write,
{
    let records = records.take(target);
    futures::pin_mut!(records);

    let mut written = 0;
    while let Some(record) = records.next().await {
        writeln!(out, "{}", record)?;
        // Flush per line so a piped consumer sees progress immediately
        out.flush()?;
        written += 1;
    }

    Ok(written)
}
