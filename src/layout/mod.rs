//! Text layout: greedy word wrapping and fixed-height pagination.
//!
//! Rendering a document to the canonical format happens in two passes. Paragraphs are first
//! wrapped into lines of bounded width ([`wrap_text`]); the lines are then placed onto pages
//! by a running cursor ([`Paginator`]) that moves top-down in layout units (PDF points) and
//! breaks the page whenever it would cross the bottom margin.

mod paginate;
mod wrap;

pub use paginate::{Page, PageGeometry, Paginator, PlacedLine, paginate};
pub use wrap::wrap_text;

use thiserror::Error;

/// Errors raised while validating layout parameters.
#[derive(Debug, Error, PartialEq)]
pub enum LayoutError {
    /// Page geometry cannot hold a single line.
    #[error("invalid page geometry: {0}")]
    InvalidGeometry(String),
}
