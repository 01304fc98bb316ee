//! # Tool Runner
//!
//! The seam between the pipeline and the outside world. [`ToolRunner`] executes
//! one [`ToolInvocation`]; [`ProcessRunner`] does so by spawning the NCO binary
//! and blocking until it exits.

use crate::config::ToolsConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::nco::ToolInvocation;
use log::{debug, trace};
use std::io::ErrorKind;
use std::process::{Command, Stdio};

/// Executes a single NCO invocation to completion.
pub trait ToolRunner {
    /// Runs the invocation, returning once the tool has exited.
    ///
    /// # Errors
    /// Returns `ToolNotFound` if the program cannot be spawned and `ToolFailed`
    /// if it exits unsuccessfully.
    fn run(&self, invocation: &ToolInvocation) -> PipelineResult<()>;
}

/// Spawns NCO binaries as child processes.
///
/// Children get a null stdin: NCO asks for confirmation before overwriting an
/// existing file, and that prompt must fail instead of blocking the run.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    tools: ToolsConfig,
}

impl ProcessRunner {
    pub fn new(tools: ToolsConfig) -> Self {
        Self { tools }
    }
}

impl ToolRunner for ProcessRunner {
    fn run(&self, invocation: &ToolInvocation) -> PipelineResult<()> {
        let program = self.tools.resolve(invocation.tool);
        debug!("Running: {}", invocation.command_line());

        let output = Command::new(&program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => PipelineError::ToolNotFound {
                    tool: invocation.tool,
                    program: program.clone(),
                },
                _ => PipelineError::Io(e),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stdout.trim().is_empty() {
            trace!("{} stdout:\n{}", invocation.tool, stdout.trim_end());
        }
        if !stderr.trim().is_empty() {
            debug!("{} stderr:\n{}", invocation.tool, stderr.trim_end());
        }

        if !output.status.success() {
            return Err(PipelineError::ToolFailed {
                tool: invocation.tool,
                command: invocation.command_line(),
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(())
    }
}
