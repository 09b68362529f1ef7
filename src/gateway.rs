//! Boundary to the external connectivity-analysis backend.
//!
//! The backend is an opaque collaborator: given a table and a root
//! identifier it either rejects the identifier or produces renderable SVG
//! content. It is synchronous and may be slow, so the production
//! implementation runs it under a deadline and callers hold no session lock
//! across [`ComputeGateway::compute`].

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::ComputeError;
use crate::table::UploadedTable;

/// One compute invocation: the uploaded table, the root identifier typed by
/// the user, and the display filename the table was uploaded under.
#[derive(Debug, Clone)]
pub struct ComputeRequest {
    pub table: UploadedTable,
    pub root_id: String,
    pub display_name: String,
}

impl ComputeRequest {
    /// A request always carries a non-empty root identifier; an empty one is
    /// rejected up front as an invalid root.
    pub fn new(
        table: UploadedTable,
        root_id: String,
        display_name: String,
    ) -> Result<Self, ComputeError> {
        if root_id.is_empty() {
            return Err(ComputeError::InvalidRoot(root_id));
        }
        Ok(ComputeRequest {
            table,
            root_id,
            display_name,
        })
    }
}

/// What the backend answered: renderable content, or "that root identifier
/// is not in this topology".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComputeResult {
    Artifact(Vec<u8>),
    InvalidRoot,
}

/// The file handed to the client for saving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadPayload {
    pub content: String,
    pub filename: String,
}

pub trait ComputeGateway: Send + Sync {
    fn compute(&self, request: &ComputeRequest) -> Result<ComputeResult, ComputeError>;
}

/// Exit code the analyzer uses to report a rejected root identifier.
const INVALID_ROOT_EXIT: i32 = 2;

/// Production gateway: spawns the analyzer executable, feeds it the table as
/// CSV on stdin and reads the rendered SVG from stdout.
pub struct AnalyzerProcess {
    program: PathBuf,
    timeout: Duration,
}

impl AnalyzerProcess {
    pub fn new(program: PathBuf, timeout: Duration) -> Self {
        AnalyzerProcess { program, timeout }
    }

    /// Configuration from the environment: `SCA_BACKEND` names the analyzer
    /// executable, `SCA_BACKEND_TIMEOUT_SECS` bounds a single invocation.
    pub fn from_env() -> Self {
        let program = std::env::var("SCA_BACKEND")
            .unwrap_or_else(|_| "soc-connectivity-analyzer".to_string());
        let timeout = std::env::var("SCA_BACKEND_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);
        AnalyzerProcess::new(PathBuf::from(program), Duration::from_secs(timeout))
    }
}

impl ComputeGateway for AnalyzerProcess {
    fn compute(&self, request: &ComputeRequest) -> Result<ComputeResult, ComputeError> {
        let backend = |e: String| ComputeError::Backend(e);

        let mut child = Command::new(&self.program)
            .arg("--root-ip")
            .arg(&request.root_id)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| backend(format!("failed to spawn {}: {e}", self.program.display())))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(request.table.to_csv().as_bytes())
                .map_err(|e| backend(format!("failed to write table: {e}")))?;
        }

        // Drain stdout/stderr off-thread so a large artifact cannot fill the
        // pipe and wedge the child while we poll for exit.
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| backend("missing stdout pipe".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| backend("missing stderr pipe".to_string()))?;
        let out_reader = std::thread::spawn(move || read_all(stdout));
        let err_reader = std::thread::spawn(move || read_all(stderr));

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait().map_err(|e| backend(e.to_string()))? {
                Some(status) => break status,
                None if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ComputeError::Timeout(self.timeout));
                }
                None => std::thread::sleep(Duration::from_millis(25)),
            }
        };

        let artifact = out_reader
            .join()
            .map_err(|_| backend("stdout reader panicked".to_string()))?
            .map_err(|e| backend(e.to_string()))?;
        let stderr_text = err_reader
            .join()
            .map_err(|_| backend("stderr reader panicked".to_string()))?
            .map(|b| String::from_utf8_lossy(&b).into_owned())
            .unwrap_or_default();

        if status.success() {
            Ok(ComputeResult::Artifact(artifact))
        } else if status.code() == Some(INVALID_ROOT_EXIT) {
            Ok(ComputeResult::InvalidRoot)
        } else {
            Err(backend(format!(
                "analyzer exited with {status}: {}",
                stderr_text.trim()
            )))
        }
    }
}

fn read_all(mut source: impl Read) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    source.read_to_end(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_rejects_empty_root_id() {
        let table = UploadedTable::new(vec!["H1".into()], vec![vec!["a".into()]]);
        let err = ComputeRequest::new(table, String::new(), "topo.csv".into()).unwrap_err();
        assert!(matches!(err, ComputeError::InvalidRoot(_)));
    }
}
