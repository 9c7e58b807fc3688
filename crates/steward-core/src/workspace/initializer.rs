//! Instance workspace creation and removal
//!
//! ```text
//! {instances_dir}/{name}/            own workspace
//! {instances_dir}/{name} -> workDir  linked external workspace
//! ```

use super::builder::WorkspaceBuilder;
use super::permissions::resolve_permissions_with_mcp;
use super::templates::TemplateResolver;
use crate::error::{ConfigError, Error, Result, WorkspaceError};
use crate::storage::{meta_file_path, read_instance_meta, write_instance_meta};
use crate::types::{
    AgentInstanceMeta, AgentTemplate, InstanceLookup, InstanceOverrides, LaunchMode,
    WorkDirConflict,
};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Creates, finds and destroys instance workspaces
pub struct AgentInitializer {
    templates: Arc<dyn TemplateResolver>,
    builder: Arc<dyn WorkspaceBuilder>,
    instances_dir: PathBuf,
    default_launch_mode: LaunchMode,
}

impl AgentInitializer {
    pub fn new(
        templates: Arc<dyn TemplateResolver>,
        builder: Arc<dyn WorkspaceBuilder>,
        instances_dir: impl Into<PathBuf>,
        default_launch_mode: LaunchMode,
    ) -> Self {
        Self {
            templates,
            builder,
            instances_dir: instances_dir.into(),
            default_launch_mode,
        }
    }

    pub fn instances_dir(&self) -> &Path {
        &self.instances_dir
    }

    /// Registry entry of `name`; a symlink when the workspace is external.
    pub fn instance_dir(&self, name: &str) -> PathBuf {
        self.instances_dir.join(name)
    }

    /// Create a new instance from `template_name`.
    ///
    /// On failure, a directory this call created is removed again. Domain
    /// errors pass through; anything else becomes `InitFailed`.
    pub async fn create_instance(
        &self,
        name: &str,
        template_name: &str,
        overrides: InstanceOverrides,
    ) -> Result<AgentInstanceMeta> {
        validate_instance_name(name)?;
        let template = self.templates.get_or_throw(template_name)?;
        let entry = self.instance_dir(name);

        let (workspace_dir, linked) = match &overrides.work_dir {
            Some(dir) if !dir.is_absolute() => {
                return Err(ConfigError::Invalid(format!(
                    "workDir must be an absolute path: {}",
                    dir.display()
                ))
                .into());
            }
            Some(dir) => (dir.clone(), true),
            None => (entry.clone(), false),
        };

        if linked && entry_exists(&entry).await? {
            return Err(ConfigError::NameConflict(format!(
                "Instance \"{name}\" is already registered at {}",
                entry.display()
            ))
            .into());
        }

        let pre_existing = path_exists(&workspace_dir).await?;
        if pre_existing {
            match overrides.work_dir_conflict {
                WorkDirConflict::Error => {
                    return Err(ConfigError::NameConflict(format!(
                        "Directory already exists: {}",
                        workspace_dir.display()
                    ))
                    .into());
                }
                WorkDirConflict::Overwrite => {
                    info!(path = %workspace_dir.display(), "Overwriting existing workspace directory");
                    tokio::fs::remove_dir_all(&workspace_dir)
                        .await
                        .map_err(|e| init_failed(&workspace_dir, e))?;
                }
                WorkDirConflict::Append => {
                    debug!(path = %workspace_dir.display(), "Appending to existing workspace directory");
                }
            }
        }
        let owns_dir = !pre_existing || overrides.work_dir_conflict == WorkDirConflict::Overwrite;

        let result = self
            .materialize(name, &template, &workspace_dir, linked.then_some(&entry), &overrides)
            .await;

        match result {
            Ok(meta) => {
                info!(
                    name = %name,
                    template = %template_name,
                    launch_mode = %meta.launch_mode,
                    workspace = %workspace_dir.display(),
                    "Agent instance created"
                );
                Ok(meta)
            }
            Err(err) => {
                if linked {
                    remove_link(&entry).await;
                }
                if owns_dir {
                    if let Err(e) = tokio::fs::remove_dir_all(&workspace_dir).await {
                        if e.kind() != ErrorKind::NotFound {
                            warn!(path = %workspace_dir.display(), error = %e, "Rollback of workspace directory failed");
                        }
                    }
                }
                if err.is_domain() {
                    Err(err)
                } else {
                    Err(init_failed(&workspace_dir, err))
                }
            }
        }
    }

    async fn materialize(
        &self,
        name: &str,
        template: &AgentTemplate,
        workspace_dir: &Path,
        link: Option<&PathBuf>,
        overrides: &InstanceOverrides,
    ) -> Result<AgentInstanceMeta> {
        tokio::fs::create_dir_all(workspace_dir).await?;

        let permissions = resolve_permissions_with_mcp(
            template.permissions.as_ref(),
            &template.domain_context.mcp_servers,
        )?;
        self.builder
            .build(
                workspace_dir,
                &template.domain_context,
                &template.backend.backend_type,
                &permissions,
            )
            .await?;

        let launch_mode = overrides.launch_mode.unwrap_or(self.default_launch_mode);
        let mut meta = AgentInstanceMeta::new(
            name,
            &template.name,
            &template.version,
            &template.backend.backend_type,
        );
        meta.backend_config = template.backend.config.clone();
        meta.launch_mode = launch_mode;
        meta.workspace_policy = overrides
            .workspace_policy
            .unwrap_or_else(|| launch_mode.default_workspace_policy());
        meta.metadata = overrides.metadata.clone();
        meta.effective_permissions = Some(permissions);

        write_instance_meta(workspace_dir, &meta).await?;

        if let Some(entry) = link {
            tokio::fs::create_dir_all(&self.instances_dir).await?;
            tokio::fs::symlink(workspace_dir, entry).await?;
            debug!(link = %entry.display(), target = %workspace_dir.display(), "Linked external workspace");
        }

        Ok(meta)
    }

    /// Return the existing instance, or create it when absent.
    ///
    /// An existing but unreadable instance is an error, never recreated.
    pub async fn find_or_create_instance(
        &self,
        name: &str,
        template_name: &str,
        overrides: InstanceOverrides,
    ) -> Result<InstanceLookup> {
        let entry = self.instance_dir(name);
        if entry_exists(&entry).await? {
            return match read_instance_meta(&entry).await {
                Ok(meta) => {
                    debug!(name = %name, "Existing instance found");
                    Ok(InstanceLookup {
                        meta,
                        created: false,
                    })
                }
                Err(err @ Error::Workspace(WorkspaceError::InstanceCorrupted { .. })) => Err(err),
                Err(err) => Err(Error::corrupted(name, err.to_string())),
            };
        }

        let meta = self.create_instance(name, template_name, overrides).await?;
        Ok(InstanceLookup {
            meta,
            created: true,
        })
    }

    /// Remove an instance. A linked external workspace keeps everything but
    /// its metadata file.
    pub async fn destroy_instance(&self, name: &str) -> Result<()> {
        let entry = self.instance_dir(name);
        let file_type = match tokio::fs::symlink_metadata(&entry).await {
            Ok(md) => md.file_type(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(name = %name, "Instance directory not found, nothing to destroy");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        if file_type.is_symlink() {
            match tokio::fs::remove_file(meta_file_path(&entry)).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            tokio::fs::remove_file(&entry).await?;
            info!(name = %name, "Linked agent instance destroyed, external workspace kept");
        } else {
            tokio::fs::remove_dir_all(&entry).await?;
            info!(name = %name, "Agent instance destroyed");
        }
        Ok(())
    }
}

fn validate_instance_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name.starts_with('.')
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if invalid {
        return Err(ConfigError::Invalid(format!("Invalid instance name: {name:?}")).into());
    }
    Ok(())
}

fn init_failed(path: &Path, reason: impl ToString) -> Error {
    WorkspaceError::InitFailed {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
    .into()
}

/// Existence of the path itself, without following a final symlink.
async fn entry_exists(path: &Path) -> Result<bool> {
    match tokio::fs::symlink_metadata(path).await {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

async fn path_exists(path: &Path) -> Result<bool> {
    Ok(tokio::fs::try_exists(path).await?)
}

async fn remove_link(entry: &Path) {
    if let Ok(md) = tokio::fs::symlink_metadata(entry).await {
        if md.file_type().is_symlink() {
            if let Err(e) = tokio::fs::remove_file(entry).await {
                warn!(link = %entry.display(), error = %e, "Failed to remove workspace link");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sleeper_template, StubBuilder};
    use crate::types::{
        AgentStatus, PermissionsInput, ProcessOwnership, WorkspacePolicy,
    };
    use crate::workspace::TemplateRegistry;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        _base: TempDir,
        instances: PathBuf,
        builder: Arc<StubBuilder>,
        initializer: AgentInitializer,
    }

    fn fixture() -> Fixture {
        fixture_with(StubBuilder::default())
    }

    fn fixture_with(builder: StubBuilder) -> Fixture {
        let base = tempdir().unwrap();
        let instances = base.path().join("instances");
        let registry = TemplateRegistry::new();
        registry.register(sleeper_template());
        registry.register(
            AgentTemplate::new("guarded", "2.0.0", "cursor")
                .with_permissions(PermissionsInput::Preset("readonly".into())),
        );
        registry.register(
            AgentTemplate::new("broken-perms", "1.0.0", "cursor")
                .with_permissions(PermissionsInput::Preset("nope".into())),
        );
        let builder = Arc::new(builder);
        let initializer = AgentInitializer::new(
            Arc::new(registry),
            builder.clone(),
            &instances,
            LaunchMode::Direct,
        );
        Fixture {
            _base: base,
            instances,
            builder,
            initializer,
        }
    }

    #[tokio::test]
    async fn test_create_writes_metadata() {
        let f = fixture();
        let meta = f
            .initializer
            .create_instance(
                "alpha",
                "guarded",
                InstanceOverrides::default()
                    .with_launch_mode(LaunchMode::OneShot)
                    .with_metadata("owner", "ops"),
            )
            .await
            .unwrap();

        assert_eq!(meta.status, AgentStatus::Created);
        assert_eq!(meta.template_version, "2.0.0");
        assert_eq!(meta.workspace_policy, WorkspacePolicy::Ephemeral);
        assert_eq!(meta.process_ownership, ProcessOwnership::Managed);
        assert_eq!(meta.metadata_value("owner"), Some("ops"));
        assert_eq!(
            meta.effective_permissions.as_ref().unwrap().allow,
            vec!["Read", "WebFetch", "WebSearch"]
        );
        assert_eq!(read_instance_meta(&f.instances.join("alpha")).await.unwrap(), meta);
        assert_eq!(f.builder.build_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_template() {
        let f = fixture();
        let result = f
            .initializer
            .create_instance("alpha", "missing", InstanceOverrides::default())
            .await;
        assert!(matches!(
            result,
            Err(Error::Workspace(WorkspaceError::TemplateNotFound(_)))
        ));
        assert!(!f.instances.join("alpha").exists());
    }

    #[tokio::test]
    async fn test_invalid_names_rejected() {
        let f = fixture();
        for name in ["", ".hidden", "a/b"] {
            let result = f
                .initializer
                .create_instance(name, "test-sleeper", InstanceOverrides::default())
                .await;
            assert!(matches!(result, Err(Error::Config(ConfigError::Invalid(_)))), "{name:?}");
        }
    }

    #[tokio::test]
    async fn test_conflict_policies() {
        let f = fixture();
        let dir = f.instances.join("alpha");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("keep.txt"), "user data").unwrap();

        let refused = f
            .initializer
            .create_instance("alpha", "test-sleeper", InstanceOverrides::default())
            .await;
        assert!(matches!(
            refused,
            Err(Error::Config(ConfigError::NameConflict(_)))
        ));

        f.initializer
            .create_instance(
                "alpha",
                "test-sleeper",
                InstanceOverrides::default().with_conflict(WorkDirConflict::Append),
            )
            .await
            .unwrap();
        assert!(dir.join("keep.txt").exists());

        f.initializer
            .create_instance(
                "alpha",
                "test-sleeper",
                InstanceOverrides::default().with_conflict(WorkDirConflict::Overwrite),
            )
            .await
            .unwrap();
        assert!(!dir.join("keep.txt").exists());
        assert!(meta_file_path(&dir).exists());
    }

    #[tokio::test]
    async fn test_component_error_propagates_and_rolls_back() {
        let f = fixture_with(StubBuilder::failing_component("Skill", "ghost"));
        let result = f
            .initializer
            .create_instance("alpha", "test-sleeper", InstanceOverrides::default())
            .await;
        assert!(matches!(
            result,
            Err(Error::Workspace(WorkspaceError::ComponentNotFound { .. }))
        ));
        assert!(!f.instances.join("alpha").exists());
    }

    #[tokio::test]
    async fn test_non_domain_error_is_wrapped_and_append_dir_survives() {
        let f = fixture_with(StubBuilder::failing_io());
        let dir = f.instances.join("alpha");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("keep.txt"), "user data").unwrap();

        let result = f
            .initializer
            .create_instance(
                "alpha",
                "test-sleeper",
                InstanceOverrides::default().with_conflict(WorkDirConflict::Append),
            )
            .await;
        assert!(matches!(
            result,
            Err(Error::Workspace(WorkspaceError::InitFailed { .. }))
        ));
        assert!(dir.join("keep.txt").exists());
    }

    #[tokio::test]
    async fn test_unknown_preset_is_config_error() {
        let f = fixture();
        let result = f
            .initializer
            .create_instance("alpha", "broken-perms", InstanceOverrides::default())
            .await;
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::UnknownPreset(_)))
        ));
        assert!(!f.instances.join("alpha").exists());
    }

    #[tokio::test]
    async fn test_find_or_create() {
        let f = fixture();
        let first = f
            .initializer
            .find_or_create_instance("alpha", "test-sleeper", InstanceOverrides::default())
            .await
            .unwrap();
        assert!(first.created);

        let second = f
            .initializer
            .find_or_create_instance("alpha", "test-sleeper", InstanceOverrides::default())
            .await
            .unwrap();
        assert!(!second.created);
        assert_eq!(second.meta.id, first.meta.id);
        assert_eq!(f.builder.build_count(), 1);
    }

    #[tokio::test]
    async fn test_find_or_create_refuses_corrupted() {
        let f = fixture();
        std::fs::create_dir_all(f.instances.join("alpha")).unwrap();
        std::fs::write(meta_file_path(&f.instances.join("alpha")), "{").unwrap();

        let result = f
            .initializer
            .find_or_create_instance("alpha", "test-sleeper", InstanceOverrides::default())
            .await;
        assert!(matches!(
            result,
            Err(Error::Workspace(WorkspaceError::InstanceCorrupted { .. }))
        ));
        assert_eq!(f.builder.build_count(), 0);
    }

    #[tokio::test]
    async fn test_linked_workspace_destroy_keeps_user_files() {
        let f = fixture();
        let external = tempdir().unwrap();
        let project = external.path().join("project");
        std::fs::create_dir_all(&project).unwrap();
        std::fs::write(project.join("main.rs"), "fn main() {}").unwrap();

        f.initializer
            .create_instance(
                "linked",
                "test-sleeper",
                InstanceOverrides::default()
                    .with_work_dir(&project)
                    .with_conflict(WorkDirConflict::Append),
            )
            .await
            .unwrap();

        let entry = f.instances.join("linked");
        assert!(std::fs::symlink_metadata(&entry).unwrap().file_type().is_symlink());
        assert!(meta_file_path(&project).exists());
        assert_eq!(read_instance_meta(&entry).await.unwrap().name, "linked");

        f.initializer.destroy_instance("linked").await.unwrap();
        assert!(std::fs::symlink_metadata(&entry).is_err());
        assert!(!meta_file_path(&project).exists());
        assert!(project.join("main.rs").exists());
    }

    #[tokio::test]
    async fn test_linked_workspace_name_conflict() {
        let f = fixture();
        f.initializer
            .create_instance("taken", "test-sleeper", InstanceOverrides::default())
            .await
            .unwrap();

        let external = tempdir().unwrap();
        let result = f
            .initializer
            .create_instance(
                "taken",
                "test-sleeper",
                InstanceOverrides::default().with_work_dir(external.path().join("fresh")),
            )
            .await;
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::NameConflict(_)))
        ));
        assert!(!external.path().join("fresh").exists());
    }

    #[tokio::test]
    async fn test_relative_work_dir_rejected() {
        let f = fixture();
        let result = f
            .initializer
            .create_instance(
                "rel",
                "test-sleeper",
                InstanceOverrides::default().with_work_dir("relative/path"),
            )
            .await;
        assert!(matches!(result, Err(Error::Config(ConfigError::Invalid(_)))));
    }

    #[tokio::test]
    async fn test_destroy_missing_is_noop() {
        let f = fixture();
        assert!(f.initializer.destroy_instance("ghost").await.is_ok());
    }
}
