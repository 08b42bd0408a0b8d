//! Evaluator backed by an external program.
//!
//! The program receives the [`ChangeContext`] as JSON on stdin and must
//! print a JSON score object on stdout and exit 0.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::{parse_score_bytes, Evaluator};
use crate::domain::{ChangeContext, EvaluationFailure, ScoreSet, UnreachableDependency};

/// Runs a program per request: context JSON on stdin, scores JSON on stdout.
#[derive(Debug, Clone)]
pub struct CommandEvaluator {
    program: PathBuf,
    args: Vec<String>,
    display: String,
}

impl CommandEvaluator {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        let program = program.into();
        let display = program.display().to_string();
        Self {
            program,
            args,
            display,
        }
    }
}

/// Locate `program` either as a direct path or on `PATH`.
pub(crate) fn resolve_program(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 || program.is_absolute() {
        return program.is_file().then(|| program.to_path_buf());
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

#[async_trait]
impl Evaluator for CommandEvaluator {
    fn name(&self) -> &str {
        &self.display
    }

    async fn probe(&self) -> Result<(), UnreachableDependency> {
        match resolve_program(&self.program) {
            Some(path) => {
                debug!(program = %path.display(), "resolved evaluator program");
                Ok(())
            }
            None => Err(UnreachableDependency::ProgramNotFound(self.display.clone())),
        }
    }

    async fn evaluate(&self, context: &ChangeContext) -> Result<ScoreSet, EvaluationFailure> {
        let payload =
            serde_json::to_vec(context).map_err(|e| EvaluationFailure::Spawn(e.to_string()))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EvaluationFailure::Spawn(e.to_string()))?;

        // Feed stdin while stdout and stderr drain; a program that writes as it
        // reads would otherwise fill its pipes and stall on large pages.
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                // A program that ignores stdin may close it early; that is not a failure.
                if let Err(e) = stdin.write_all(&payload).await {
                    debug!(error = %e, "evaluator closed stdin early");
                }
            }
        };

        let ((), output) = tokio::join!(feed, child.wait_with_output());
        let output = output.map_err(|e| EvaluationFailure::Spawn(e.to_string()))?;

        if !output.status.success() {
            return Err(EvaluationFailure::Exited {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_score_bytes(&output.stdout)
    }
}
