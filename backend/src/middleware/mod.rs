//! Request middleware.
//!
//! Purpose: request lifecycle concerns shared by every route. Today that is
//! trace-id propagation.

pub mod trace;

pub use trace::Trace;
