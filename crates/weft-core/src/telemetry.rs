// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Telemetry helpers for JSONL logging when the `telemetry` feature is
//! enabled. Manually formats JSON to avoid a non-deterministic serde_json
//! dependency; best-effort only, I/O errors are ignored.

use std::io::Write as _;

fn ts_micros() -> u128 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros()
}

fn emit(event: &str, fields: core::fmt::Arguments<'_>) {
    let mut out = std::io::stdout().lock();
    let _ = write!(
        out,
        r#"{{"timestamp_micros":{},"event":"{}",{}}}"#,
        ts_micros(),
        event,
        fields
    );
    let _ = out.write_all(b"\n");
}

/// Emits a topic merge event: the surviving and the drained topic ids.
///
/// Logged as a JSON line on stdout when the `telemetry` feature is enabled.
pub fn topic_merge(target: u32, source: u32) {
    emit(
        "topic_merge",
        format_args!(r#""target":{target},"source":{source}"#),
    );
}

/// Emits a statement merge event: the statement kind and surviving id.
///
/// Logged as a JSON line on stdout when the `telemetry` feature is enabled.
pub fn statement_merge(kind: &str, survivor: u32) {
    emit(
        "statement_merge",
        format_args!(r#""kind":"{kind}","survivor":{survivor}"#),
    );
}

/// Emits a reifier fold event: two reifier topics queued for merging.
///
/// Logged as a JSON line on stdout when the `telemetry` feature is enabled.
pub fn reifier_fold(target: u32, source: u32) {
    emit(
        "reifier_fold",
        format_args!(r#""target":{target},"source":{source}"#),
    );
}
