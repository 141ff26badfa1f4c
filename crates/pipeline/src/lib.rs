//! Fax document pipeline: PDF inspection, OCR fallback, LLM extraction and
//! page replacement.

pub mod dates;
pub mod ingest;
pub mod llm;
pub mod ocr;
pub mod pdf;
pub mod prompt;

pub use ingest::{Extraction, IngestionPipeline, PipelineError};
