//! Command-line implementations of the import collaborators.

mod console;
mod export;
mod prompt;

pub use console::{PrintMetadata, StderrReporter, TracingStatus};
pub use export::StackExporter;
pub use prompt::{OptionOverrides, ScriptedPrompt, SeriesChoice};
