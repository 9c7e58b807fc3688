//! Instance workspaces
//!
//! This module handles:
//! - Workspace creation, lookup and removal (`AgentInitializer`)
//! - Template lookup
//! - Permission presets
//! - Writing domain context into a workspace

mod builder;
mod initializer;
mod permissions;
mod templates;

pub use builder::{ComponentCatalog, ContextFileBuilder, WorkspaceBuilder, CONTEXT_DIR, CONTEXT_FILENAME};
pub use initializer::AgentInitializer;
pub use permissions::{preset, resolve_permissions, resolve_permissions_with_mcp, PRESET_NAMES};
pub use templates::{TemplateRegistry, TemplateResolver};
