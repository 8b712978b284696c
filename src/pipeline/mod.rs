//! The document pipeline: validation, canonicalization, storage, extraction, summarization,
//! and persistence, run strictly in that order for each upload.

mod prompt;
mod retry;
mod service;
mod types;
mod validate;
mod workspace;

pub use prompt::{INSTRUCTION, SYSTEM_PROMPT, build_summary_request};
pub use retry::{RetryPolicy, retry_external};
pub use service::{PipelineApi, PipelineService};
pub use types::{ErrorKind, PipelineError, PipelineOutcome, PipelineSettings, RunId, RunStage};
pub use validate::{sanitize_filename, validate_upload};
pub use workspace::RunWorkspace;
