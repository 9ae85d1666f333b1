//! Structured stderr warnings for CORE.
//!
//! CORE carries no tracing dependency; modules emit one JSON object per
//! warning on stderr and the app layer re-emits that stream through its
//! own subscriber. The message is JSON-encoded before embedding so that
//! quotes and control characters in error text cannot break the line.

/// Emit one warning line on stderr.
#[inline]
pub(crate) fn warn(target: &str, message: &str) {
    eprintln!("{}", warn_line(target, message));
}

/// Render the warning as a single JSON object.
///
/// Targets are crate-internal ASCII module paths, so the `{:?}` escape
/// is JSON-compatible for them; the message is arbitrary and goes
/// through the serializer.
fn warn_line(target: &str, message: &str) -> String {
    let message =
        serde_json::to_string(message).unwrap_or_else(|_| String::from("\"<unencodable>\""));
    format!("{{\"level\":\"warn\",\"target\":{target:?},\"message\":{message}}}")
}

// =============================================================================
// TESTS
// =============================================================================
