//! Error types for Steward Core

use thiserror::Error;

/// Main error type for Steward operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("Workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Agent lifecycle errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Agent instance not found: {0}")]
    NotFound(String),

    #[error("Agent already running: {0}")]
    AlreadyRunning(String),

    #[error("Agent already has an attached process: {0}")]
    AlreadyAttached(String),

    #[error("Agent has no attached process: {0}")]
    NotAttached(String),

    #[error("Failed to launch agent {name}: {reason}")]
    LaunchFailed { name: String, reason: String },
}

/// Workspace provisioning and instance metadata errors
#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("Failed to initialize workspace at {path}: {reason}")]
    InitFailed { path: String, reason: String },

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("{kind} not found: {name}")]
    ComponentNotFound { kind: String, name: String },

    #[error("Agent instance {name} is corrupted: {reason}")]
    InstanceCorrupted { name: String, reason: String },
}

/// Configuration and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Name conflict: {0}")]
    NameConflict(String),

    #[error("Unknown permission preset: {0}")]
    UnknownPreset(String),
}

impl Error {
    /// Stable machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Agent(AgentError::NotFound(_)) => "AGENT_NOT_FOUND",
            Error::Agent(AgentError::AlreadyRunning(_)) => "AGENT_ALREADY_RUNNING",
            Error::Agent(AgentError::AlreadyAttached(_)) => "AGENT_ALREADY_ATTACHED",
            Error::Agent(AgentError::NotAttached(_)) => "AGENT_NOT_ATTACHED",
            Error::Agent(AgentError::LaunchFailed { .. }) => "AGENT_LAUNCH_ERROR",
            Error::Workspace(WorkspaceError::InitFailed { .. }) => "WORKSPACE_INIT_ERROR",
            Error::Workspace(WorkspaceError::TemplateNotFound(_)) => "TEMPLATE_NOT_FOUND",
            Error::Workspace(WorkspaceError::ComponentNotFound { .. }) => {
                "COMPONENT_REFERENCE_ERROR"
            }
            Error::Workspace(WorkspaceError::InstanceCorrupted { .. }) => "INSTANCE_CORRUPTED",
            Error::Config(_) => "CONFIG_VALIDATION_ERROR",
            Error::Io(_) => "IO_ERROR",
            Error::Json(_) => "JSON_ERROR",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether this error belongs to the "domain" set that the initializer
    /// propagates untouched instead of wrapping as a workspace-init failure.
    pub(crate) fn is_domain(&self) -> bool {
        matches!(self, Error::Agent(_) | Error::Workspace(_) | Error::Config(_))
    }

    pub(crate) fn launch_failed(name: impl Into<String>, reason: impl ToString) -> Self {
        Error::Agent(AgentError::LaunchFailed {
            name: name.into(),
            reason: reason.to_string(),
        })
    }

    pub(crate) fn corrupted(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Workspace(WorkspaceError::InstanceCorrupted {
            name: name.into(),
            reason: reason.into(),
        })
    }

    pub(crate) fn not_found(name: impl Into<String>) -> Self {
        Error::Agent(AgentError::NotFound(name.into()))
    }
}

impl serde::Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;
