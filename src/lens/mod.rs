//! Lens module
//!
//! This module provides high-level "lens" abstractions that combine business logic
//! with output formatting. Lenses are designed to be reusable by the CLI and by
//! library callers.
//!
//! | Lens | Feature Required | Dependencies |
//! |------|-----------------|--------------|
//! | `IngestLens` | none (`fetch` for URL sources) | rusqlite, oneio |
//!
//! # Architecture
//!
//! Each lens module exports:
//! - A **Lens struct** (e.g., `IngestLens`) - the main entry point for all operations
//! - **Args structs** - input arguments for lens methods
//! - **Output types** - return types and reports
//!
//! ```rust,ignore
//! use rirstats::lens::delegated::{IngestArgs, IngestLens, IngestSource};
//! ```

pub mod delegated;
pub mod utils;
