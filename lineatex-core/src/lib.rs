// Lineatex Core Library
//
// Converts genealogy report text dumps into cross-linked LaTeX markup.
// Main interface is ReportProcessor, which runs the full two-pass
// pipeline: classify and parse every entry, freeze the person registry,
// then link name mentions and emit the block stream.

pub mod classifier;
pub mod config;
pub mod diagnostics;
pub mod emitter;
pub mod linker;
pub mod parser;
pub mod processor;
pub mod registry;
pub mod roman;
pub mod types;

// Re-export main types and functions for easy use
pub use types::*;
pub use config::ParsingConfig;
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticLog};
pub use emitter::{render_document, LatexBlock, LatexEmitter};
pub use parser::EntryParser;
pub use processor::{
    normalize_text, OutputCounts, PipelineStages, ReportOutput, ReportProcessor, StepProfiler,
};
pub use registry::{PersonRegistry, RegistryBuilder};
