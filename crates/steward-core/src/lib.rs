//! Steward Core Library
//!
//! This crate provides the core functionality for Steward, including:
//! - Agent instance workspaces created from templates
//! - Backend process supervision (spawn, terminate, exit detection)
//! - Crash recovery with per-launch-mode policies and restart backoff
//! - Durable instance metadata stored next to each workspace
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     steward-core                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  agent/        - AgentManager, restart backoff, exit policy │
//! │  process/      - Launcher, resolver, watcher, signals       │
//! │  workspace/    - Initializer, templates, permissions        │
//! │  storage/      - .steward.json read/write/scan              │
//! │  types/        - Shared type definitions                    │
//! │  config.rs     - ManagerConfig (JSON + env)                 │
//! │  error.rs      - Error types                                │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod process;
pub mod storage;
pub mod types;
pub mod workspace;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use error::{AgentError, ConfigError, Error, Result, WorkspaceError};
pub use types::*;

pub use config::{LauncherConfig, ManagerConfig, RestartPolicy};

// Re-export agent components
pub use agent::{AgentManager, ProcessExitAction, RecoveryAction, RestartDecision, RestartTracker};

// Re-export process components
pub use process::{
    AgentLauncher, AgentProcess, CommandResolver, DefaultCommandResolver, ProcessExitHandler,
    ProcessExitInfo, ProcessLauncher, ProcessWatcher, ResolvedCommand,
};

// Re-export workspace components
pub use workspace::{
    AgentInitializer, ComponentCatalog, ContextFileBuilder, TemplateRegistry, TemplateResolver,
    WorkspaceBuilder,
};
