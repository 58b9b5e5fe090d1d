use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::core::downloader::Downloader;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::build_http_client;
use crate::core::install::{VanillaInstaller, VersionInstaller};
use crate::core::launch::{CommandBuilder, LaunchCoordinator, VanillaCommandBuilder};
use crate::core::layout::GameLayout;
use crate::core::profile::{MemoryProbe, SystemMemoryProbe};
use crate::core::task::TaskSupervisor;
use crate::core::version::VersionCatalog;

use super::settings::{default_config_dir, LauncherSettings};

/// Everything the console front end works with, wired once at startup.
pub struct AppState {
    pub config_dir: PathBuf,
    pub settings: LauncherSettings,
    pub layout: GameLayout,
    pub supervisor: Arc<TaskSupervisor>,
    pub coordinator: LaunchCoordinator,
    pub catalog: VersionCatalog,
    current_version: Option<String>,
}

impl AppState {
    /// Load settings, create the Minecraft directory, and read the version
    /// catalog (network failures degrade to the installed list).
    pub async fn initialize() -> LauncherResult<Self> {
        let config_dir = default_config_dir();
        let stored = LauncherSettings::load(&config_dir);
        if !LauncherSettings::exists_in(&config_dir) {
            // First run: write the defaults so they can be edited by hand.
            if let Err(e) = stored.save(&config_dir) {
                warn!("Could not write default settings: {}", e);
            }
        }
        let settings = stored.with_env_overrides();

        std::fs::create_dir_all(&settings.minecraft_dir).map_err(|source| LauncherError::Io {
            path: settings.minecraft_dir.clone(),
            source,
        })?;
        info!("Minecraft directory: {:?}", settings.minecraft_dir);

        let http_client = build_http_client()?;
        let layout = GameLayout::new(settings.minecraft_dir.clone());
        let catalog = VersionCatalog::load(&http_client, &layout).await?;
        info!("{} versions available", catalog.versions.len());

        let downloader =
            Downloader::new(http_client.clone()).with_concurrency(settings.download_concurrency);
        let installer: Arc<dyn VersionInstaller> =
            Arc::new(VanillaInstaller::new(http_client, downloader));
        let builder: Arc<dyn CommandBuilder> =
            Arc::new(VanillaCommandBuilder::new(settings.java_program()));

        Ok(Self::from_parts(
            config_dir,
            settings,
            catalog,
            installer,
            builder,
            Arc::new(SystemMemoryProbe),
        ))
    }

    /// Assemble the state from explicit collaborators.
    pub fn from_parts(
        config_dir: PathBuf,
        settings: LauncherSettings,
        catalog: VersionCatalog,
        installer: Arc<dyn VersionInstaller>,
        builder: Arc<dyn CommandBuilder>,
        memory: Arc<dyn MemoryProbe>,
    ) -> Self {
        let layout = GameLayout::new(settings.minecraft_dir.clone());
        let supervisor = Arc::new(TaskSupervisor::new(layout.clone(), installer));
        let coordinator = LaunchCoordinator::new(layout.clone(), builder, memory);

        Self {
            config_dir,
            settings,
            layout,
            supervisor,
            coordinator,
            catalog,
            current_version: None,
        }
    }

    /// Last version installed or launched, else the catalog default.
    pub fn current_version(&self) -> Option<&str> {
        self.current_version
            .as_deref()
            .or_else(|| self.catalog.default_version())
    }

    pub fn set_current_version(&mut self, version: impl Into<String>) {
        self.current_version = Some(version.into());
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::core::install::InstallContext;
    use crate::core::launch::{LaunchOptions, ProcessDescriptor};

    struct NoopInstaller;

    #[async_trait]
    impl VersionInstaller for NoopInstaller {
        async fn install(&self, _ctx: InstallContext<'_>) -> LauncherResult<()> {
            Ok(())
        }
    }

    struct NoopBuilder;

    impl CommandBuilder for NoopBuilder {
        fn build(
            &self,
            _version: &str,
            layout: &GameLayout,
            _options: &LaunchOptions,
        ) -> LauncherResult<ProcessDescriptor> {
            Ok(ProcessDescriptor {
                program: PathBuf::from("java"),
                args: Vec::new(),
                current_dir: layout.root().to_path_buf(),
            })
        }
    }

    fn state(catalog: VersionCatalog) -> AppState {
        AppState::from_parts(
            PathBuf::from("config"),
            LauncherSettings::default(),
            catalog,
            Arc::new(NoopInstaller),
            Arc::new(NoopBuilder),
            Arc::new(SystemMemoryProbe),
        )
    }

    #[test]
    fn current_version_defaults_to_latest_release() {
        let mut state = state(VersionCatalog {
            versions: vec!["1.20.4".into(), "1.20.3".into()],
            latest_release: Some("1.20.4".into()),
            installed: Vec::new(),
        });
        assert_eq!(state.current_version(), Some("1.20.4"));

        state.set_current_version("1.20.3");
        assert_eq!(state.current_version(), Some("1.20.3"));
    }

    #[test]
    fn empty_catalog_has_no_current_version() {
        let state = state(VersionCatalog::default());
        assert_eq!(state.current_version(), None);
        assert_eq!(state.layout.root(), std::path::Path::new("minecraft"));
    }
}
