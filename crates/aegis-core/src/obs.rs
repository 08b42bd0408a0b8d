//! Structured observability hooks for the sentinel lifecycle.
//!
//! This module provides:
//! - Request-scoped tracing spans via [`request_span`]
//! - Emission functions for key lifecycle events: start, request, verdict,
//!   evidence failure, drain
//!
//! Events are emitted at `info!` level (filter with `RUST_LOG`).

use tracing::info;

/// Span for one request, attached to its scan task with `Instrument`.
///
/// ```ignore
/// scanner.scan(&request).instrument(request_span(42)).await;
/// // tracing calls inside carry sequence = 42
/// ```
pub fn request_span(sequence: u64) -> tracing::Span {
    tracing::info_span!("aegis.request", sequence = sequence)
}

/// Emit event: daemon ready, with its evaluator mode.
pub fn emit_daemon_started(session_id: &str, degraded: bool, max_in_flight: usize) {
    info!(
        event = "daemon.started",
        session_id = %session_id,
        degraded = degraded,
        max_in_flight = max_in_flight,
    );
}

/// Emit event: a request line was accepted.
pub fn emit_request_received(sequence: u64, url: &str) {
    tracing::debug!(event = "request.received", sequence = sequence, url = %url);
}

/// Emit event: a response line was written.
pub fn emit_verdict_emitted(sequence: u64, kind: &str, status: Option<&str>, score: Option<u8>) {
    info!(
        event = "verdict.emitted",
        sequence = sequence,
        kind = %kind,
        status = status.unwrap_or("-"),
        score = score.map(i64::from).unwrap_or(-1),
    );
}

/// Emit event: evidence could not be persisted (warning level).
pub fn emit_evidence_failed(sequence: u64, error: &dyn std::fmt::Display) {
    tracing::warn!(event = "evidence.failed", sequence = sequence, error = %error);
}

/// Emit event: input closed and all in-flight requests answered.
pub fn emit_daemon_drained(requests: u64, protocol_errors: u64) {
    info!(
        event = "daemon.drained",
        requests = requests,
        protocol_errors = protocol_errors,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_span_create() {
        let _entered = request_span(7).entered();
    }

    #[test]
    fn test_emitters_do_not_panic_without_subscriber() {
        emit_daemon_started("session", true, 4);
        emit_request_received(0, "about:blank");
        emit_verdict_emitted(0, "verdict", Some("secure"), Some(85));
        emit_verdict_emitted(1, "error", None, None);
        emit_evidence_failed(2, &"disk full");
        emit_daemon_drained(3, 1);
    }
}
