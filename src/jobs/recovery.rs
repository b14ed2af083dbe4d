use crate::error::{ExportError, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

pub const DEFAULT_REPAIR_PROGRAM: &str = "mcap";
pub const DEFAULT_REPAIR_TIMEOUT: Duration = Duration::from_secs(300);

/// External repair pass over a possibly truncated container
///
/// Invoked as `<program> recover <input> -o <output>`. Success means exit
/// status zero and `<output>` present afterwards; on failure the tool's own
/// stderr and stdout become the error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairTool {
    pub program: PathBuf,
    pub timeout: Duration,
}

impl Default for RepairTool {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_REPAIR_PROGRAM),
            timeout: DEFAULT_REPAIR_TIMEOUT,
        }
    }
}

impl RepairTool {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub async fn repair(&self, input: &Path, output: &Path) -> Result<PathBuf> {
        if !input.exists() {
            return Err(ExportError::NotFound(input.to_path_buf()));
        }
        // a failed run removes `output`, which must never be the source
        if resolved(input) == resolved(output) {
            return Err(ExportError::Recovery(format!(
                "repair output {} is the input container",
                output.display()
            )));
        }
        info!(
            program = %self.program.display(),
            input = %input.display(),
            output = %output.display(),
            "Running repair tool"
        );

        let child = Command::new(&self.program)
            .arg("recover")
            .arg(input)
            .arg("-o")
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ExportError::Recovery(format!(
                    "failed to start {}: {e}",
                    self.program.display()
                ))
            })?;

        // dropping the wait future on timeout kills the child
        let finished = tokio::time::timeout(self.timeout, child.wait_with_output()).await;
        let result = match finished {
            Err(_) => {
                warn!(
                    timeout_secs = self.timeout.as_secs(),
                    "Repair tool timed out; discarding partial output"
                );
                discard_partial(output).await?;
                return Err(ExportError::RecoveryTimeout(self.timeout));
            }
            Ok(result) => result,
        };
        let result = result.map_err(|e| ExportError::Recovery(e.to_string()))?;

        if result.status.success() && output.exists() {
            debug!(output = %output.display(), "Repair tool finished");
            return Ok(output.to_path_buf());
        }

        let stderr = String::from_utf8_lossy(&result.stderr);
        let stdout = String::from_utf8_lossy(&result.stdout);
        let message = [stderr.as_ref(), stdout.as_ref()]
            .into_iter()
            .map(|text| text.trim_end_matches(|c: char| c == '\n' || c == '\r'))
            .filter(|text| !text.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        let message = if message.is_empty() {
            if result.status.success() {
                format!("repair tool did not produce {}", output.display())
            } else {
                format!("repair tool exited with {}", result.status)
            }
        } else {
            message
        };
        discard_partial(output).await?;
        Err(ExportError::Recovery(message))
    }
}

/// Absolute form of a path whose file may not exist yet
fn resolved(path: &Path) -> PathBuf {
    if let Ok(path) = std::fs::canonicalize(path) {
        return path;
    }
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    match (std::fs::canonicalize(parent), path.file_name()) {
        (Ok(parent), Some(name)) => parent.join(name),
        _ => path.to_path_buf(),
    }
}

async fn discard_partial(output: &Path) -> Result<()> {
    match tokio::fs::remove_file(output).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ExportError::io(output, e)),
    }
}
