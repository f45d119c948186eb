//! Error types for dw-core
//!
//! Re-exported from dw-error so every crate shares one error enum.

pub use dw_error::{DriftError, Result};
