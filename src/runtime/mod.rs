/// Runtime module - Gateway

mod pipeline;
mod runner;

pub use pipeline::{ClassReport, FileReport, Pipeline, UnitReport};
pub use runner::{collect_source_files, RunSummary, Runner};
