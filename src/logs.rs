//! Log deduplication.
//!
//! The API re-sends entries around the `from` bound, so every batch is
//! filtered against a watermark of the highest identifier already printed.

use crate::api::types::LogEntry;

/// Filter `entries` against `watermark`, returning the entries to print (in
/// their original order) and the advanced watermark.
///
/// Entries with `id <= watermark` have already been delivered and are
/// skipped. The new watermark is the maximum identifier among printed
/// entries, even if the batch is internally out of order, and is unchanged
/// when everything was a duplicate. Pure; printing is the caller's job.
pub fn drain(entries: &[LogEntry], watermark: u64) -> (Vec<&LogEntry>, u64) {
    let mut printed = Vec::new();
    let mut new_watermark = watermark;
    for entry in entries {
        if entry.id <= watermark {
            continue;
        }
        new_watermark = new_watermark.max(entry.id);
        printed.push(entry);
    }
    (printed, new_watermark)
}
