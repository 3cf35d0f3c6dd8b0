//! Manual review checkpoint between extraction and enrichment.

use std::io::{self, BufRead};
use std::path::Path;
use std::thread;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::info;

use crate::error::PipelineError;

/// Where the gate is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatePhase {
    Pending,
    Resumed,
}

/// What the operator answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    Continue,
    /// Input closed without confirmation.
    Abort,
}

/// Source of the operator's confirmation.
#[async_trait]
pub trait ResumeSignal: Send {
    async fn wait(&mut self, artifact: &Path) -> Result<Resume, PipelineError>;
}

/// Prints review instructions and blocks on a line from stdin. No timeout.
#[derive(Debug, Default)]
pub struct StdinSignal;

#[async_trait]
impl ResumeSignal for StdinSignal {
    async fn wait(&mut self, artifact: &Path) -> Result<Resume, PipelineError> {
        println!();
        println!("{}", "=".repeat(80));
        println!("MANUAL REVIEW CHECKPOINT");
        println!("{}", "=".repeat(80));
        println!(
            "\nScraping complete! The data has been saved to '{}'",
            artifact.display()
        );
        println!("\nBefore continuing with API calls, please review the data for any issues.");
        println!("\nSteps:");
        println!("  1. Open '{}' in a spreadsheet or text editor", artifact.display());
        println!("  2. Review and fix any issues you find");
        println!("  3. Save the file");
        println!("  4. Return here and press Enter to continue");
        println!("\nPress Enter when ready to continue the pipeline...");

        read_line_detached(|| {
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)
        })
        .await
    }
}

/// Run a blocking line read on its own thread. Dropping the returned future
/// abandons the thread, so a pending read never holds up runtime shutdown.
async fn read_line_detached<F>(read: F) -> Result<Resume, PipelineError>
where
    F: FnOnce() -> io::Result<usize> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    thread::Builder::new()
        .name("operator-input".into())
        .spawn(move || {
            let _ = tx.send(read());
        })
        .map_err(PipelineError::OperatorInput)?;

    let read = rx
        .await
        .map_err(|_| {
            PipelineError::OperatorInput(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "operator input thread ended without a result",
            ))
        })?
        .map_err(PipelineError::OperatorInput)?;

    Ok(if read == 0 { Resume::Abort } else { Resume::Continue })
}

/// Resumes immediately; for unattended runs.
#[derive(Debug, Default)]
pub struct AutoResume;

#[async_trait]
impl ResumeSignal for AutoResume {
    async fn wait(&mut self, artifact: &Path) -> Result<Resume, PipelineError> {
        info!("Review gate auto-confirmed for {}", artifact.display());
        Ok(Resume::Continue)
    }
}

/// Holds the pipeline until the operator confirms the reviewed artifact.
#[derive(Debug)]
pub struct HumanGate {
    phase: GatePhase,
}

impl Default for HumanGate {
    fn default() -> Self {
        Self::new()
    }
}

impl HumanGate {
    pub fn new() -> Self {
        Self {
            phase: GatePhase::Pending,
        }
    }

    pub fn phase(&self) -> GatePhase {
        self.phase
    }

    /// Block until `signal` resumes. An aborted review is an interruption.
    pub async fn hold<S: ResumeSignal + ?Sized>(
        &mut self,
        signal: &mut S,
        artifact: &Path,
    ) -> Result<(), PipelineError> {
        if self.phase == GatePhase::Resumed {
            return Ok(());
        }

        match signal.wait(artifact).await? {
            Resume::Continue => {
                self.phase = GatePhase::Resumed;
                info!("✓ Continuing pipeline...");
                Ok(())
            }
            Resume::Abort => Err(PipelineError::Interrupted),
        }
    }
}
