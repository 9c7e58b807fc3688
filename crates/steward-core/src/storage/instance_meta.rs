//! `.steward.json` read, atomic write, patch, and directory scan

use crate::error::{Error, Result};
use crate::types::{
    AgentInstanceMeta, AgentStatus, InstanceMetaPatch, LaunchMode, PermissionsConfig,
    ProcessOwnership, WorkspacePolicy, DEFAULT_BACKEND_TYPE,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

pub const META_FILENAME: &str = ".steward.json";

pub fn meta_file_path(workspace_dir: &Path) -> PathBuf {
    workspace_dir.join(META_FILENAME)
}

/// Outcome of scanning an instances directory
#[derive(Debug, Default)]
pub struct ScanResult {
    pub valid: Vec<AgentInstanceMeta>,
    /// Directory names whose metadata could not be read
    pub corrupted: Vec<String>,
}

/// On-disk shape, tolerant of records written before some fields existed.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredInstanceMeta {
    id: String,
    name: String,
    template_name: String,
    template_version: String,
    #[serde(default)]
    backend_type: Option<String>,
    #[serde(default)]
    backend_config: Option<serde_json::Map<String, serde_json::Value>>,
    status: AgentStatus,
    launch_mode: LaunchMode,
    #[serde(default)]
    workspace_policy: Option<WorkspacePolicy>,
    #[serde(default)]
    process_ownership: Option<ProcessOwnership>,
    #[serde(default)]
    pid: Option<u32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    metadata: Option<HashMap<String, String>>,
    #[serde(default)]
    effective_permissions: Option<PermissionsConfig>,
}

impl StoredInstanceMeta {
    fn validate(&self) -> std::result::Result<(), String> {
        let mut problems = Vec::new();
        if self.id.is_empty() {
            problems.push("id must not be empty".to_string());
        }
        if self.name.is_empty() {
            problems.push("name must not be empty".to_string());
        }
        if self.template_name.is_empty() {
            problems.push("templateName must not be empty".to_string());
        }
        if !is_semver(&self.template_version) {
            problems.push(format!(
                "templateVersion {:?} is not MAJOR.MINOR.PATCH",
                self.template_version
            ));
        }
        if self.pid == Some(0) {
            problems.push("pid must be positive".to_string());
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems.join(", "))
        }
    }

    fn into_meta(self) -> AgentInstanceMeta {
        let workspace_policy = self
            .workspace_policy
            .unwrap_or_else(|| self.launch_mode.default_workspace_policy());
        AgentInstanceMeta {
            id: self.id,
            name: self.name,
            template_name: self.template_name,
            template_version: self.template_version,
            backend_type: self
                .backend_type
                .unwrap_or_else(|| DEFAULT_BACKEND_TYPE.to_string()),
            backend_config: self.backend_config,
            status: self.status,
            launch_mode: self.launch_mode,
            workspace_policy,
            process_ownership: self.process_ownership.unwrap_or_default(),
            pid: self.pid,
            created_at: self.created_at,
            updated_at: self.updated_at,
            started_at: self.started_at,
            metadata: self.metadata.unwrap_or_default(),
            effective_permissions: self.effective_permissions,
        }
    }
}

fn is_semver(version: &str) -> bool {
    let parts: Vec<&str> = version.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
}

fn dir_label(workspace_dir: &Path) -> String {
    workspace_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| workspace_dir.display().to_string())
}

/// Read and validate the metadata of the instance at `workspace_dir`.
///
/// A missing, unparsable, or invalid file is an `InstanceCorrupted` error so
/// callers can tell "broken" from "absent".
pub async fn read_instance_meta(workspace_dir: &Path) -> Result<AgentInstanceMeta> {
    let path = meta_file_path(workspace_dir);
    let label = dir_label(workspace_dir);

    let raw = match tokio::fs::read_to_string(&path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::corrupted(label, format!("{META_FILENAME} not found")));
        }
        Err(e) => return Err(e.into()),
    };

    let value: serde_json::Value = serde_json::from_str(&raw).map_err(|e| {
        Error::corrupted(&label, format!("{META_FILENAME} contains invalid JSON: {e}"))
    })?;

    let stored: StoredInstanceMeta = serde_json::from_value(value).map_err(|e| {
        Error::corrupted(&label, format!("{META_FILENAME} failed schema validation: {e}"))
    })?;

    stored.validate().map_err(|problems| {
        Error::corrupted(&label, format!("{META_FILENAME} failed schema validation: {problems}"))
    })?;

    Ok(stored.into_meta())
}

/// Atomically replace the metadata file: temp file in the same directory,
/// flushed to disk, then renamed over the target.
pub async fn write_instance_meta(workspace_dir: &Path, meta: &AgentInstanceMeta) -> Result<()> {
    let path = meta_file_path(workspace_dir);
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let tmp_path = workspace_dir.join(format!("{META_FILENAME}.{}.tmp", &suffix[..8]));

    let mut content = serde_json::to_string_pretty(meta)?;
    content.push('\n');

    tokio::fs::create_dir_all(workspace_dir).await?;

    let written = async {
        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(content.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp_path, &path).await
    }
    .await;

    if let Err(e) = written {
        if let Err(cleanup) = tokio::fs::remove_file(&tmp_path).await {
            if cleanup.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %tmp_path.display(), error = %cleanup, "Failed to remove temp metadata file");
            }
        }
        return Err(e.into());
    }

    debug!(name = %meta.name, status = %meta.status, "Instance metadata written");
    Ok(())
}

/// Read, merge `patch`, bump `updatedAt`, write back, and return the result.
pub async fn update_instance_meta(
    workspace_dir: &Path,
    patch: InstanceMetaPatch,
) -> Result<AgentInstanceMeta> {
    let mut meta = read_instance_meta(workspace_dir).await?;
    patch.apply(&mut meta);
    meta.updated_at = Utc::now();
    write_instance_meta(workspace_dir, &meta).await?;
    Ok(meta)
}

/// Partition the non-dot subdirectories of `base_dir` into readable and
/// corrupted instances. A missing `base_dir` yields an empty result.
pub async fn scan_instances(base_dir: &Path) -> Result<ScanResult> {
    let mut result = ScanResult::default();

    let mut entries = match tokio::fs::read_dir(base_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(result),
        Err(e) => return Err(e.into()),
    };

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        // Follows symlinks so linked external workspaces are included.
        let path = entry.path();
        match tokio::fs::metadata(&path).await {
            Ok(md) if md.is_dir() => {}
            Ok(_) => continue,
            Err(e) => {
                warn!(dir = %name, error = %e, "Instance entry unreachable");
                result.corrupted.push(name);
                continue;
            }
        }

        match read_instance_meta(&path).await {
            Ok(meta) if meta.name == name => result.valid.push(meta),
            // Renamed or copied directory: the record would be addressed
            // through a path that does not hold it.
            Ok(meta) => {
                warn!(dir = %name, recorded_name = %meta.name, "Instance name does not match its directory");
                result.corrupted.push(name);
            }
            Err(e) => {
                warn!(dir = %name, error = %e, "Corrupted instance directory");
                result.corrupted.push(name);
            }
        }
    }

    result.valid.sort_by(|a, b| a.name.cmp(&b.name));
    result.corrupted.sort();
    Ok(result)
}
