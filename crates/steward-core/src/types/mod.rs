//! Core type definitions for Steward
//!
//! Shared types used across the crate: persisted instance metadata,
//! templates and permissions, and the inputs/outputs of manager operations.

mod instance_types;
mod result_types;
mod template_types;

pub use instance_types::*;
pub use result_types::*;
pub use template_types::*;
