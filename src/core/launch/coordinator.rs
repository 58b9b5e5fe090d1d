use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::layout::{validate_version_id, GameLayout};
use crate::core::profile::{resolve_with, MemoryProbe, Profile};

use super::command::{CommandBuilder, ProcessDescriptor};
use super::options::{apply_frame_rate_cap, DisplaySettings, LaunchOptions, PlayerIdentity};

#[derive(Debug, Clone, Serialize)]
pub struct LaunchedProcess {
    pub pid: u32,
    pub descriptor: ProcessDescriptor,
}

/// Composes profile flags, identity and display settings into one game
/// process. Holds no install state; every call samples memory afresh.
pub struct LaunchCoordinator {
    layout: GameLayout,
    builder: Arc<dyn CommandBuilder>,
    memory: Arc<dyn MemoryProbe>,
}

impl LaunchCoordinator {
    pub fn new(
        layout: GameLayout,
        builder: Arc<dyn CommandBuilder>,
        memory: Arc<dyn MemoryProbe>,
    ) -> Self {
        Self {
            layout,
            builder,
            memory,
        }
    }

    /// Everything [`launch`](Self::launch) does except starting the process.
    pub async fn prepare(
        &self,
        version: &str,
        profile: Profile,
        identity: PlayerIdentity,
        display: &DisplaySettings,
    ) -> LauncherResult<ProcessDescriptor> {
        self.prepare_inner(version, profile, identity, display)
            .await
            .map_err(LauncherError::into_launch_failure)
    }

    async fn prepare_inner(
        &self,
        version: &str,
        profile: Profile,
        identity: PlayerIdentity,
        display: &DisplaySettings,
    ) -> LauncherResult<ProcessDescriptor> {
        validate_version_id(version)?;
        if !self.layout.version_dir(version).exists() {
            return Err(LauncherError::VersionNotInstalled(version.to_string()));
        }

        let options = LaunchOptions {
            identity,
            display: display.clone(),
            runtime: resolve_with(profile, self.memory.as_ref()),
        };
        debug!("Runtime arguments for {}: {:?}", profile, options.runtime);

        let descriptor = self.builder.build(version, &self.layout, &options)?;

        let options_file = self.layout.options_file();
        if let Err(e) = apply_frame_rate_cap(&options_file, display.max_fps).await {
            warn!("Could not apply frame-rate cap to {:?}: {}", options_file, e);
        }

        Ok(descriptor)
    }

    pub async fn launch(
        &self,
        version: &str,
        profile: Profile,
        identity: PlayerIdentity,
        display: &DisplaySettings,
    ) -> LauncherResult<LaunchedProcess> {
        let username = identity.username.clone();
        let descriptor = self.prepare(version, profile, identity, display).await?;

        info!(
            "Launching {} as {} with profile {}",
            version, username, profile
        );
        debug!("Command (copy/paste): {}", descriptor.display_for_logs());

        let pid = descriptor
            .spawn_detached()
            .map_err(LauncherError::into_launch_failure)?;
        info!("Game process started (pid {})", pid);

        Ok(LaunchedProcess { pid, descriptor })
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingBuilder {
        program: Option<PathBuf>,
        seen: Mutex<Vec<LaunchOptions>>,
    }

    impl CommandBuilder for RecordingBuilder {
        fn build(
            &self,
            _version: &str,
            layout: &GameLayout,
            options: &LaunchOptions,
        ) -> LauncherResult<ProcessDescriptor> {
            self.seen.lock().unwrap().push(options.clone());
            Ok(ProcessDescriptor {
                program: self.program.clone().unwrap_or_else(|| PathBuf::from("java")),
                args: options.runtime.as_slice().to_vec(),
                current_dir: layout.root().to_path_buf(),
            })
        }
    }

    struct FixedMemory(Option<u64>);

    impl MemoryProbe for FixedMemory {
        fn available_gb(&self) -> LauncherResult<u64> {
            self.0
                .ok_or_else(|| LauncherError::ResourceQuery("no reading".into()))
        }
    }

    fn coordinator(
        builder: Arc<RecordingBuilder>,
        memory: Option<u64>,
    ) -> (tempfile::TempDir, LaunchCoordinator) {
        let temp = tempfile::tempdir().unwrap();
        let layout = GameLayout::new(temp.path());
        std::fs::create_dir_all(layout.version_dir("1.20.4")).unwrap();
        let coordinator = LaunchCoordinator::new(layout, builder, Arc::new(FixedMemory(memory)));
        (temp, coordinator)
    }

    #[tokio::test]
    async fn prepare_composes_profile_identity_and_display() {
        let builder = Arc::new(RecordingBuilder::default());
        let (temp, coordinator) = coordinator(builder.clone(), Some(8));
        let display = DisplaySettings {
            max_fps: 144,
            ..Default::default()
        };

        let descriptor = coordinator
            .prepare(
                "1.20.4",
                Profile::UltraOptimized,
                PlayerIdentity::offline("Steve"),
                &display,
            )
            .await
            .unwrap();

        assert_eq!(&descriptor.args[..2], ["-Xmx6G", "-Xms3G"]);
        let seen = builder.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].identity.username, "Steve");
        assert_eq!(seen[0].display.max_fps, 144);

        let options = std::fs::read_to_string(temp.path().join("options.txt")).unwrap();
        assert_eq!(options, "maxFps:144\n");
    }

    #[tokio::test]
    async fn memory_failure_still_prepares_minimum_heap() {
        let builder = Arc::new(RecordingBuilder::default());
        let (_temp, coordinator) = coordinator(builder, None);

        let descriptor = coordinator
            .prepare(
                "1.20.4",
                Profile::UltraOptimized,
                PlayerIdentity::default(),
                &DisplaySettings::default(),
            )
            .await
            .unwrap();

        assert_eq!(&descriptor.args[..2], ["-Xmx2G", "-Xms1G"]);
    }

    #[tokio::test]
    async fn uninstalled_version_is_a_launch_failure() {
        let builder = Arc::new(RecordingBuilder::default());
        let (_temp, coordinator) = coordinator(builder.clone(), Some(8));

        let err = coordinator
            .launch(
                "1.19.2",
                Profile::Standard,
                PlayerIdentity::default(),
                &DisplaySettings::default(),
            )
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Launch failed: Version 1.19.2 is not installed"
        );
        assert!(builder.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn spawn_error_is_a_launch_failure() {
        let builder = Arc::new(RecordingBuilder {
            program: Some(PathBuf::from("/nonexistent/bin/java")),
            ..Default::default()
        });
        let (_temp, coordinator) = coordinator(builder, Some(8));

        let err = coordinator
            .launch(
                "1.20.4",
                Profile::Standard,
                PlayerIdentity::default(),
                &DisplaySettings::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, LauncherError::LaunchFailed(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn launch_spawns_detached_process() {
        let builder = Arc::new(RecordingBuilder {
            program: Some(PathBuf::from("true")),
            ..Default::default()
        });
        let (_temp, coordinator) = coordinator(builder, Some(8));

        let launched = coordinator
            .launch(
                "1.20.4",
                Profile::Standard,
                PlayerIdentity::default(),
                &DisplaySettings::default(),
            )
            .await
            .unwrap();

        assert!(launched.pid > 0);
        assert_eq!(launched.descriptor.args, vec!["-Xmx2G", "-Xms1G"]);
    }
}
