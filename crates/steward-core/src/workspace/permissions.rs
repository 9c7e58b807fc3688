//! Permission preset resolution

use crate::error::{ConfigError, Result};
use crate::types::{PermissionMode, PermissionsConfig, PermissionsInput};

pub const PRESET_NAMES: [&str; 4] = ["permissive", "standard", "restricted", "readonly"];

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Built-in preset by name
pub fn preset(name: &str) -> Option<PermissionsConfig> {
    let config = match name {
        "permissive" => PermissionsConfig {
            allow: strings(&["*"]),
            default_mode: Some(PermissionMode::BypassPermissions),
            ..PermissionsConfig::default()
        },
        "standard" => PermissionsConfig {
            allow: strings(&[
                "Read",
                "Edit",
                "Write",
                "Bash(npm run *)",
                "Bash(git *)",
                "WebFetch",
                "WebSearch",
            ]),
            ask: strings(&["Bash"]),
            default_mode: Some(PermissionMode::Default),
            ..PermissionsConfig::default()
        },
        "restricted" => PermissionsConfig {
            allow: strings(&["Read", "WebSearch"]),
            deny: strings(&["Bash", "WebFetch"]),
            ask: strings(&["Edit", "Write"]),
            default_mode: Some(PermissionMode::DontAsk),
            ..PermissionsConfig::default()
        },
        "readonly" => PermissionsConfig {
            allow: strings(&["Read", "WebFetch", "WebSearch"]),
            deny: strings(&["Bash", "Edit", "Write", "MultiEdit"]),
            default_mode: Some(PermissionMode::Plan),
            ..PermissionsConfig::default()
        },
        _ => return None,
    };
    Some(config)
}

/// Resolve template permissions; no input means `permissive`.
pub fn resolve_permissions(input: Option<&PermissionsInput>) -> Result<PermissionsConfig> {
    match input {
        None => Ok(preset("permissive").unwrap_or_default()),
        Some(PermissionsInput::Preset(name)) => {
            preset(name).ok_or_else(|| ConfigError::UnknownPreset(name.clone()).into())
        }
        Some(PermissionsInput::Config(config)) => Ok(config.clone()),
    }
}

/// Like [`resolve_permissions`], with each MCP server's tools allowed
/// unless a wildcard already covers them.
pub fn resolve_permissions_with_mcp(
    input: Option<&PermissionsInput>,
    mcp_servers: &[String],
) -> Result<PermissionsConfig> {
    let mut resolved = resolve_permissions(input)?;
    if !resolved.allow.iter().any(|rule| rule == "*") {
        for server in mcp_servers {
            let rule = format!("mcp__{server}");
            if !resolved.allow.contains(&rule) {
                resolved.allow.push(rule);
            }
        }
    }
    Ok(resolved)
}
