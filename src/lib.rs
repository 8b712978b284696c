#![deny(missing_docs)]

//! Core library for the lexsum legal document summarizer.

/// HTTP routing and handlers.
pub mod api;
/// Run-scoped summary artifacts on disk.
pub mod archive;
/// HTTP Basic authentication.
pub mod auth;
/// Conversion of uploads into the canonical document format.
pub mod canonical;
/// Environment-driven configuration management.
pub mod config;
/// Document text extraction clients.
pub mod extraction;
/// Line wrapping and pagination.
pub mod layout;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline metrics helpers.
pub mod metrics;
/// The staged document pipeline.
pub mod pipeline;
/// Durable blob storage clients.
pub mod storage;
/// Summarization provider clients.
pub mod summarization;
