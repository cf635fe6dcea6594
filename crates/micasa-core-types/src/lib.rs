//! Core types shared across MiCasa crates
//!
//! This crate provides foundational types used by the error handling,
//! logging and persistence layers:
//!
//! - **Cancellation**: CancellationToken with optional deadline
//! - **Sensitive data**: Sensitive<T> marker for automatic redaction
//! - **Schema constants**: Canonical field keys and event names

pub mod cancel;
pub mod schema;
pub mod sensitive;

pub use cancel::CancellationToken;
pub use sensitive::Sensitive;
