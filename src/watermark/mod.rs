//! Watermark request pipeline
//!
//! Validation, option translation, tool execution and the orchestrator that
//! ties them to the staging area.

mod options;
mod request;
mod runner;
mod service;

pub use options::{option_flags, MarkArg, WatermarkInvocation};
pub use request::{
    Pattern, Upload, WatermarkForm, WatermarkMark, WatermarkOptions, WatermarkRequest,
};
pub use runner::{run_tool, CliWatermarkEngine, ToolOutput, WatermarkEngine, DEFAULT_PROGRAM};
pub use service::{WatermarkService, WatermarkedPdf};
