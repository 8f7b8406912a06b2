//! Execution of the external `watermark` tool

use super::options::WatermarkInvocation;
use crate::error::{Error, Result};
use std::process::{Command, Stdio};

/// Executable name used when none is configured
pub const DEFAULT_PROGRAM: &str = "watermark";

/// Captured result of a tool run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

/// Run `program` with `args`, blocking until it exits.
///
/// stdin is closed and both output streams are captured, never inherited.
/// A non-zero exit is returned as [`Error::ExternalTool`] with stderr exactly
/// as the tool wrote it. There is no timeout.
pub fn run_tool(program: &str, args: &[String]) -> Result<ToolOutput> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|source| Error::ToolLaunch {
            program: program.to_string(),
            source,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    let exit_code = output.status.code();

    if !output.status.success() {
        return Err(Error::ExternalTool {
            code: exit_code,
            stderr,
        });
    }

    Ok(ToolOutput {
        stdout,
        stderr,
        exit_code,
    })
}

/// Something that can apply a watermark invocation.
///
/// The production implementation shells out to the `watermark` executable;
/// tests substitute doubles that write the output path themselves.
pub trait WatermarkEngine: Send + Sync {
    fn apply(&self, invocation: &WatermarkInvocation) -> Result<ToolOutput>;
}

/// Engine backed by the `watermark` command-line tool
#[derive(Debug, Clone)]
pub struct CliWatermarkEngine {
    program: String,
}

impl CliWatermarkEngine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for CliWatermarkEngine {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl WatermarkEngine for CliWatermarkEngine {
    fn apply(&self, invocation: &WatermarkInvocation) -> Result<ToolOutput> {
        tracing::debug!(
            program = %self.program,
            pattern = %invocation.pattern(),
            args = ?invocation.args(),
            "running watermark tool"
        );
        run_tool(&self.program, invocation.args())
    }
}
