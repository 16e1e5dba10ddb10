//! Shared types for Scribe

pub mod error;
pub mod inscription;

pub use error::{Result, ScribeError};
pub use inscription::{content_url, CanonicalRecord};
