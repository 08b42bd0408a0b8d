//! Evidence persistence.
//!
//! Every request/response pair is recorded for later audit. Two durability
//! modes share the [`EvidenceRecorder`] contract:
//!
//! - [`AppendLogRecorder`]: one compact JSON line per entry, visible to a
//!   tailing reader as soon as `record` returns. Each line is written with a
//!   single `write_all` under a lock, so lines never interleave. A kill
//!   mid-write can leave a partial last line; it is cut off the next time the
//!   log is opened, so every record is a complete line or absent.
//! - [`SnapshotRecorder`]: one pretty JSON document, written to a temp file in
//!   the destination directory and atomically renamed into place.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::{EvidenceError, Response, ScanRequest};

/// One durable audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceEntry {
    /// Arrival order of the request within this process.
    pub sequence: u64,
    pub recorded_at: DateTime<Utc>,
    /// Identifies the sentinel process that produced the entry.
    pub session_id: Uuid,
    pub request: ScanRequest,
    /// SHA-256 hex of the page content, for matching without re-reading it.
    pub content_sha256: String,
    pub response: Response,
}

impl EvidenceEntry {
    pub fn new(sequence: u64, session_id: Uuid, request: ScanRequest, response: Response) -> Self {
        let content_sha256 = hex::encode(Sha256::digest(request.content.as_bytes()));
        Self {
            sequence,
            recorded_at: Utc::now(),
            session_id,
            request,
            content_sha256,
            response,
        }
    }
}

/// Durable sink for evidence entries. Callers log a failure and carry on;
/// the response has already been written.
#[async_trait]
pub trait EvidenceRecorder: Send + Sync {
    async fn record(&self, entry: &EvidenceEntry) -> Result<(), EvidenceError>;
}

/// Append-only NDJSON evidence log.
#[derive(Debug)]
pub struct AppendLogRecorder {
    path: PathBuf,
    file: Mutex<Option<Arc<File>>>,
}

impl AppendLogRecorder {
    /// The file is opened lazily on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Bytes read per step while scanning backwards for the last newline.
const TAIL_CHUNK: usize = 64 * 1024;

/// Open `path` for appending and repair a torn final record.
fn open_log(path: &Path) -> std::io::Result<File> {
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)?;
    let repair = repair_torn_tail(&file)?;
    if repair != TailRepair::Clean {
        warn!(path = %path.display(), ?repair, "evidence log had an unterminated final line");
    }
    Ok(file)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TailRepair {
    Clean,
    /// The last line was a whole entry missing only its newline.
    Terminated,
    /// A partial entry was cut off; this many bytes were dropped.
    Truncated(u64),
}

/// Make sure the next append starts on a fresh line. An unterminated tail
/// that parses as an entry gets its newline; anything else is a record cut
/// off by a kill mid-write and is truncated away.
fn repair_torn_tail(file: &File) -> std::io::Result<TailRepair> {
    let len = file.metadata()?.len();
    let mut reader = file;
    let mut buf = vec![0u8; TAIL_CHUNK];
    let mut end = len;
    let mut keep = 0;

    while end > 0 {
        let start = end.saturating_sub(TAIL_CHUNK as u64);
        let chunk = &mut buf[..(end - start) as usize];
        reader.seek(SeekFrom::Start(start))?;
        reader.read_exact(chunk)?;
        if let Some(idx) = chunk.iter().rposition(|b| *b == b'\n') {
            keep = start + idx as u64 + 1;
            break;
        }
        end = start;
    }

    if keep == len {
        return Ok(TailRepair::Clean);
    }

    let mut tail = Vec::with_capacity((len - keep) as usize);
    reader.seek(SeekFrom::Start(keep))?;
    reader.read_to_end(&mut tail)?;

    if serde_json::from_slice::<EvidenceEntry>(&tail).is_ok() {
        let mut writer = file;
        writer.write_all(b"\n")?;
        return Ok(TailRepair::Terminated);
    }

    file.set_len(keep)?;
    Ok(TailRepair::Truncated(len - keep))
}

#[async_trait]
impl EvidenceRecorder for AppendLogRecorder {
    async fn record(&self, entry: &EvidenceEntry) -> Result<(), EvidenceError> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        // Held across the blocking write so appends stay whole and ordered.
        let mut guard = self.file.lock().await;
        let file = match guard.as_ref() {
            Some(file) => Arc::clone(file),
            None => {
                let path = self.path.clone();
                let file = Arc::new(blocking(move || open_log(&path)).await?);
                *guard = Some(Arc::clone(&file));
                file
            }
        };

        // One write_all of the whole line; on a std File this goes straight
        // to the kernel, so a tailing reader sees it on return.
        if let Err(e) = blocking(move || (&*file).write_all(&line)).await {
            // reopen (and repair) on the next record
            *guard = None;
            return Err(e);
        }

        debug!(sequence = entry.sequence, path = %self.path.display(), "evidence appended");
        Ok(())
    }
}

async fn blocking<T, F>(f: F) -> Result<T, EvidenceError>
where
    F: FnOnce() -> std::io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| EvidenceError::Persist(e.to_string()))?
        .map_err(EvidenceError::Io)
}

/// Single-document snapshot, atomically replaced on every record.
#[derive(Debug, Clone)]
pub struct SnapshotRecorder {
    path: PathBuf,
}

impl SnapshotRecorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn write_snapshot(path: &Path, bytes: &[u8]) -> Result<(), EvidenceError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| EvidenceError::Persist(e.error.to_string()))?;
    Ok(())
}

#[async_trait]
impl EvidenceRecorder for SnapshotRecorder {
    async fn record(&self, entry: &EvidenceEntry) -> Result<(), EvidenceError> {
        let bytes = serde_json::to_vec_pretty(entry)?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_snapshot(&path, &bytes))
            .await
            .map_err(|e| EvidenceError::Persist(e.to_string()))??;

        debug!(path = %self.path.display(), "evidence snapshot written");
        Ok(())
    }
}

/// Read back an evidence log. A truncated final line (process killed
/// mid-write) is skipped; corruption anywhere else is an error.
pub fn read_evidence_log(path: &Path) -> Result<Vec<EvidenceEntry>, EvidenceError> {
    let raw = std::fs::read_to_string(path)?;
    let lines: Vec<&str> = raw.lines().filter(|l| !l.trim().is_empty()).collect();
    let complete = raw.ends_with('\n');

    let mut entries = Vec::with_capacity(lines.len());
    for (idx, line) in lines.iter().enumerate() {
        match serde_json::from_str(line) {
            Ok(entry) => entries.push(entry),
            Err(_) if idx + 1 == lines.len() && !complete => break,
            Err(e) => return Err(EvidenceError::Serialization(e)),
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ScoreSet, Verdict};

    fn entry(sequence: u64) -> EvidenceEntry {
        EvidenceEntry::new(
            sequence,
            Uuid::new_v4(),
            ScanRequest::new(format!("https://site{sequence}.test"), "body"),
            Response::Verdict(Verdict::classified(ScoreSet::new().with("overall", 0.9))),
        )
    }

    #[test]
    fn test_entry_hashes_content() {
        let e = entry(0);
        // sha256("body")
        assert_eq!(
            e.content_sha256,
            "230d8358dc8e8890b4c58deeb62912ee2f20357ae92a5cc861b98e68fe31acb5"
        );
    }

    #[tokio::test]
    async fn test_append_log_one_line_per_entry_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evidence_stream.log");
        let recorder = AppendLogRecorder::new(&path);

        for seq in 0..3 {
            recorder.record(&entry(seq)).await.unwrap();
        }

        let entries = read_evidence_log(&path).unwrap();
        let seqs: Vec<u64> = entries.iter().map(|e| e.sequence).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_append_log_visible_without_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evidence_stream.log");
        let recorder = AppendLogRecorder::new(&path);

        recorder.record(&entry(0)).await.unwrap();
        // recorder still alive: the line must already be readable
        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw.lines().count(), 1);
        assert!(raw.ends_with('\n'));
    }

    #[tokio::test]
    async fn test_append_log_appends_to_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evidence_stream.log");
        AppendLogRecorder::new(&path).record(&entry(0)).await.unwrap();
        AppendLogRecorder::new(&path).record(&entry(0)).await.unwrap();
        assert_eq!(read_evidence_log(&path).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_restart_after_torn_write_keeps_log_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evidence_stream.log");
        let mut raw = serde_json::to_string(&entry(0)).unwrap();
        raw.push('\n');
        raw.push_str("{\"sequence\":1,\"recorded_");
        std::fs::write(&path, raw).unwrap();

        let recorder = AppendLogRecorder::new(&path);
        recorder.record(&entry(2)).await.unwrap();
        recorder.record(&entry(3)).await.unwrap();

        let seqs: Vec<u64> = read_evidence_log(&path)
            .unwrap()
            .iter()
            .map(|e| e.sequence)
            .collect();
        assert_eq!(seqs, vec![0, 2, 3]);
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.ends_with('\n'));
        assert_eq!(raw.lines().count(), 3);
    }

    #[tokio::test]
    async fn test_restart_keeps_whole_entry_missing_its_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evidence_stream.log");
        std::fs::write(&path, serde_json::to_string(&entry(0)).unwrap()).unwrap();

        AppendLogRecorder::new(&path).record(&entry(1)).await.unwrap();

        let seqs: Vec<u64> = read_evidence_log(&path)
            .unwrap()
            .iter()
            .map(|e| e.sequence)
            .collect();
        assert_eq!(seqs, vec![0, 1]);
    }

    #[test]
    fn test_tail_repair_scans_past_one_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evidence_stream.log");
        let mut good = serde_json::to_string(&entry(0)).unwrap();
        good.push('\n');
        let torn = "x".repeat(TAIL_CHUNK * 2 + 17);
        std::fs::write(&path, format!("{good}{torn}")).unwrap();

        let file = OpenOptions::new().read(true).append(true).open(&path).unwrap();
        assert_eq!(
            repair_torn_tail(&file).unwrap(),
            TailRepair::Truncated(torn.len() as u64)
        );
        assert_eq!(repair_torn_tail(&file).unwrap(), TailRepair::Clean);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), good);
    }

    #[test]
    fn test_tail_repair_leaves_clean_and_empty_logs_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evidence_stream.log");
        std::fs::write(&path, "").unwrap();
        let file = OpenOptions::new().read(true).append(true).open(&path).unwrap();
        assert_eq!(repair_torn_tail(&file).unwrap(), TailRepair::Clean);
    }

    #[tokio::test]
    async fn test_append_log_unwritable_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("evidence.log");
        let err = AppendLogRecorder::new(&path)
            .record(&entry(0))
            .await
            .unwrap_err();
        assert!(matches!(err, EvidenceError::Io(_)));
    }

    #[tokio::test]
    async fn test_snapshot_replaces_atomically_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evidence_dump.json");
        let recorder = SnapshotRecorder::new(&path);

        recorder.record(&entry(0)).await.unwrap();
        recorder.record(&entry(7)).await.unwrap();

        let written: EvidenceEntry =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.sequence, 7);

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1, "temp files must not be left behind");
    }

    #[tokio::test]
    async fn test_snapshot_missing_directory_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("evidence_dump.json");
        assert!(SnapshotRecorder::new(&path).record(&entry(0)).await.is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_read_log_skips_truncated_tail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evidence_stream.log");
        let mut raw = serde_json::to_string(&entry(0)).unwrap();
        raw.push('\n');
        raw.push_str("{\"sequence\":1,\"recorded_");
        std::fs::write(&path, raw).unwrap();

        let entries = read_evidence_log(&path).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_read_log_rejects_corrupt_middle_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evidence_stream.log");
        let good = serde_json::to_string(&entry(1)).unwrap();
        std::fs::write(&path, format!("garbage\n{good}\n")).unwrap();
        assert!(read_evidence_log(&path).is_err());
    }
}
