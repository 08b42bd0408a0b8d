//! Sentinel daemon: the NDJSON request/response loop.
//!
//! ```text
//! Starting ─probe evaluator─▶ Ready ─line─▶ Processing ─▶ Responding ─▶ Ready …
//!                               └─EOF─▶ Draining ─▶ Terminated
//! ```
//!
//! A reader future parses each line and spawns its scan as an independent
//! task. The task handles go through a bounded channel, in arrival order, to
//! a single writer future that awaits them one by one, writes and flushes
//! the response line, then records evidence. Evaluations overlap; output
//! order and evidence order always match input order. A scan takes a
//! semaphore permit before it is spawned and holds it until it finishes,
//! so at most `max_in_flight` evaluations run at once.
//!
//! Nothing a request contains can stop the loop. Only EOF on input or a
//! failed write to output (the host is gone) ends it.

use std::sync::Arc;

use aegis_audit::{predicates, AuditEdge, AuditGraph, JsonlAuditGraph};
use serde_json::json;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, warn, Instrument};
use uuid::Uuid;

use crate::config::{SentinelConfig, DEFAULT_MAX_IN_FLIGHT, DEFAULT_SNAPSHOT};
use crate::domain::{Response, Result, ScanRequest, Status, BROWSER_AGENT};
use crate::evaluator::{panic_message, EvaluatorHandle};
use crate::evidence::{AppendLogRecorder, EvidenceEntry, EvidenceRecorder, SnapshotRecorder};
use crate::metrics::{Counter, METRICS};
use crate::obs;
use crate::pipeline::Scanner;

/// Lifecycle phases, logged on transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonState {
    Starting,
    Ready,
    Draining,
    Terminated,
}

/// Counts for one daemon run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DaemonSummary {
    /// Accepted request lines (parsed successfully).
    pub requests: u64,
    /// Verdicts with a non-error status.
    pub verdicts: u64,
    /// Verdicts with `status=error`.
    pub evaluation_failures: u64,
    pub denials: u64,
    /// Lines that were not a valid request object.
    pub protocol_errors: u64,
    /// Scan tasks that died before producing a response.
    pub bridge_errors: u64,
    pub evidence_failures: u64,
}

impl DaemonSummary {
    /// Total response lines written.
    pub fn responses(&self) -> u64 {
        self.requests + self.protocol_errors
    }
}

enum Pending {
    Invalid,
    Scan {
        sequence: u64,
        request: ScanRequest,
        task: JoinHandle<Response>,
    },
}

/// The sentinel daemon. Built once at startup, then driven by [`Sentinel::run`]
/// for the stream protocol or [`Sentinel::run_once`] for a single request.
pub struct Sentinel {
    scanner: Arc<Scanner>,
    stream_evidence: Arc<dyn EvidenceRecorder>,
    snapshot_evidence: Arc<dyn EvidenceRecorder>,
    audit: Option<Arc<dyn AuditGraph>>,
    max_in_flight: usize,
    session_id: Uuid,
}

impl Sentinel {
    /// A sentinel with the default snapshot path, no audit graph and the
    /// default in-flight limit.
    pub fn new(scanner: Scanner, stream_evidence: Arc<dyn EvidenceRecorder>) -> Self {
        Self {
            scanner: Arc::new(scanner),
            stream_evidence,
            snapshot_evidence: Arc::new(SnapshotRecorder::new(DEFAULT_SNAPSHOT)),
            audit: None,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            session_id: Uuid::new_v4(),
        }
    }

    /// Recorder used by one-shot mode.
    pub fn with_snapshot(mut self, recorder: Arc<dyn EvidenceRecorder>) -> Self {
        self.snapshot_evidence = recorder;
        self
    }

    /// Link every verdict into `audit` as an `EVALUATED` edge.
    pub fn with_audit(mut self, audit: Arc<dyn AuditGraph>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Cap on concurrent evaluations; `0` is treated as `1`.
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    /// Starting: validate config and probe the evaluator exactly once.
    pub async fn from_config(config: &SentinelConfig) -> Result<Self> {
        debug!(state = ?DaemonState::Starting, "sentinel state");
        config.validate()?;

        let evaluator =
            EvaluatorHandle::from_backend(&config.evaluator, config.evaluator_timeout()).await;

        let mut sentinel = Self::new(
            Scanner::new(evaluator),
            Arc::new(AppendLogRecorder::new(&config.evidence_log)),
        )
        .with_snapshot(Arc::new(SnapshotRecorder::new(&config.snapshot_path)))
        .with_max_in_flight(config.max_in_flight);

        if let Some(path) = &config.audit_log {
            sentinel = sentinel.with_audit(Arc::new(JsonlAuditGraph::new(path)));
        }
        Ok(sentinel)
    }

    /// Stamped on every evidence entry this sentinel writes.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// True when the evaluator was unavailable at startup.
    pub fn is_degraded(&self) -> bool {
        self.scanner.is_degraded()
    }

    /// Serve the stream protocol until `input` reaches EOF.
    pub async fn run<R, W>(&self, input: R, mut output: W) -> Result<DaemonSummary>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        obs::emit_daemon_started(
            &self.session_id.to_string(),
            self.is_degraded(),
            self.max_in_flight,
        );
        debug!(state = ?DaemonState::Ready, "sentinel state");

        let (tx, rx) = mpsc::channel(self.max_in_flight);
        let permits = Arc::new(Semaphore::new(self.max_in_flight));
        let reader = self.read_requests(input, tx, permits);
        let writer = self.write_responses(rx, &mut output);
        let ((), summary) = tokio::try_join!(reader, writer)?;

        obs::emit_daemon_drained(summary.requests, summary.protocol_errors);
        METRICS.flush();
        debug!(state = ?DaemonState::Terminated, "sentinel state");
        Ok(summary)
    }

    /// One-shot mode: scan once, print one line, write the snapshot.
    pub async fn run_once<W>(&self, request: ScanRequest, output: &mut W) -> Result<Response>
    where
        W: AsyncWrite + Unpin,
    {
        METRICS.inc(Counter::Requests);
        let response = self
            .scanner
            .scan(&request)
            .instrument(obs::request_span(0))
            .await;
        write_line(output, &response).await?;
        obs::emit_verdict_emitted(
            0,
            response.kind(),
            response.as_verdict().map(|v| v.status.to_string()).as_deref(),
            response.as_verdict().map(|v| v.score),
        );

        let entry = EvidenceEntry::new(0, self.session_id, request, response.clone());
        if let Err(e) = self.snapshot_evidence.record(&entry).await {
            METRICS.inc(Counter::EvidenceFailures);
            obs::emit_evidence_failed(0, &e);
        }
        self.link_audit(&entry).await;
        Ok(response)
    }

    async fn read_requests<R>(
        &self,
        mut input: R,
        tx: mpsc::Sender<Pending>,
        permits: Arc<Semaphore>,
    ) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut buf = Vec::new();
        let mut sequence = 0u64;

        loop {
            buf.clear();
            match input.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "input stream failed, draining");
                    break;
                }
            }

            let pending = match std::str::from_utf8(&buf) {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => match ScanRequest::from_line(line.trim()) {
                    Ok(request) => {
                        obs::emit_request_received(sequence, &request.url);
                        METRICS.inc(Counter::Requests);
                        // Wait here, before spawning, while the limit is reached.
                        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                            break;
                        };
                        let pending = Pending::Scan {
                            sequence,
                            task: self.spawn_scan(sequence, request.clone(), permit),
                            request,
                        };
                        sequence += 1;
                        pending
                    }
                    Err(e) => {
                        debug!(error = %e, "rejecting request line");
                        Pending::Invalid
                    }
                },
                Err(_) => Pending::Invalid,
            };

            if tx.send(pending).await.is_err() {
                break;
            }
        }

        debug!(state = ?DaemonState::Draining, "sentinel state");
        Ok(())
    }

    fn spawn_scan(
        &self,
        sequence: u64,
        request: ScanRequest,
        permit: OwnedSemaphorePermit,
    ) -> JoinHandle<Response> {
        let scanner = Arc::clone(&self.scanner);
        tokio::spawn(
            async move {
                let _permit = permit;
                scanner.scan(&request).await
            }
            .instrument(obs::request_span(sequence)),
        )
    }

    async fn write_responses<W>(
        &self,
        mut rx: mpsc::Receiver<Pending>,
        output: &mut W,
    ) -> Result<DaemonSummary>
    where
        W: AsyncWrite + Unpin,
    {
        let mut summary = DaemonSummary::default();

        while let Some(pending) = rx.recv().await {
            let (sequence, request, task) = match pending {
                Pending::Invalid => {
                    summary.protocol_errors += 1;
                    METRICS.inc(Counter::ProtocolErrors);
                    write_line(output, &Response::invalid_json()).await?;
                    continue;
                }
                Pending::Scan {
                    sequence,
                    request,
                    task,
                } => (sequence, request, task),
            };

            summary.requests += 1;
            let response = match task.await {
                Ok(response) => response,
                Err(e) => {
                    summary.bridge_errors += 1;
                    Response::bridge_error(panic_message(e))
                }
            };

            match &response {
                Response::Verdict(v) if v.status == Status::Error => {
                    summary.evaluation_failures += 1;
                    METRICS.inc(Counter::EvaluationFailures);
                }
                Response::Verdict(_) => {
                    summary.verdicts += 1;
                    METRICS.inc(Counter::Verdicts);
                }
                Response::Denied(_) => {
                    summary.denials += 1;
                    METRICS.inc(Counter::Denials);
                }
                Response::Error(_) => {}
            }

            write_line(output, &response).await?;
            obs::emit_verdict_emitted(
                sequence,
                response.kind(),
                response.as_verdict().map(|v| v.status.to_string()).as_deref(),
                response.as_verdict().map(|v| v.score),
            );

            let entry = EvidenceEntry::new(sequence, self.session_id, request, response);
            if let Err(e) = self.stream_evidence.record(&entry).await {
                summary.evidence_failures += 1;
                METRICS.inc(Counter::EvidenceFailures);
                obs::emit_evidence_failed(sequence, &e);
            }
            self.link_audit(&entry).await;
        }

        Ok(summary)
    }

    /// Link an evaluated navigation into the audit graph, if one is configured.
    async fn link_audit(&self, entry: &EvidenceEntry) {
        let (Some(audit), Some(verdict)) = (&self.audit, entry.response.as_verdict()) else {
            return;
        };

        let edge = AuditEdge::new(
            format!("Agent:{BROWSER_AGENT}"),
            format!("Navigation:{}", entry.request.url),
            predicates::EVALUATED,
        )
        .with_properties(json!({
            "sequence": entry.sequence,
            "session_id": entry.session_id,
            "status": verdict.status,
            "score": verdict.score,
            "content_sha256": entry.content_sha256,
        }));

        if let Err(e) = audit.append_edge(edge).await {
            warn!(sequence = entry.sequence, error = %e, "audit edge not recorded");
        }
    }
}

/// Write one response line and flush it before returning.
async fn write_line<W>(output: &mut W, response: &Response) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(response).unwrap_or_else(|e| {
        json!({ "error": format!("Bridge Error: {e}") })
            .to_string()
            .into_bytes()
    });
    line.push(b'\n');
    output.write_all(&line).await?;
    output.flush().await?;
    Ok(())
}
