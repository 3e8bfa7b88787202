//! # assay-source
//!
//! File-backed record sources for the assay kernel.
//!
//! ## Data model
//!
//! ```text
//! JSONL (on disk, one record per line)
//!     ↓  open / stream(features)
//! RecordStream (lazy, projected, fresh per run)
//! ```

pub mod jsonl;

pub use jsonl::{JsonlError, JsonlSource};
