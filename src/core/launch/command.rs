// ─── Command Builder ───
// Turns an installed version plus launch options into a process invocation.

use std::path::{Path, PathBuf};
use std::process::Stdio;

#[cfg(target_os = "windows")]
use std::os::windows::process::CommandExt;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::layout::GameLayout;
use crate::core::version::VersionJson;

use super::options::{LaunchOptions, PlayerIdentity};

const LAUNCHER_NAME: &str = "Minelaunch";
const LAUNCHER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A fully resolved external process invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessDescriptor {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub current_dir: PathBuf,
}

impl ProcessDescriptor {
    pub fn to_command(&self) -> std::process::Command {
        let mut cmd = std::process::Command::new(&self.program);
        cmd.args(&self.args).current_dir(&self.current_dir);
        configure_platform_spawn(&mut cmd);
        cmd
    }

    /// Start the process without attaching to its stdio and return its pid.
    ///
    /// The exit status is collected on a blocking thread and logged.
    pub fn spawn_detached(&self) -> LauncherResult<u32> {
        let mut cmd = self.to_command();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let mut child = cmd.spawn().map_err(|e| {
            LauncherError::LaunchFailed(format!("cannot start {:?}: {}", self.program, e))
        })?;
        let pid = child.id();

        let reap = move || match child.wait() {
            Ok(status) => info!("Game process {} exited with {}", pid, status),
            Err(e) => warn!("Lost track of game process {}: {}", pid, e),
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(reap);
            }
            Err(_) => {
                std::thread::spawn(reap);
            }
        }

        Ok(pid)
    }

    /// Copy/paste-able rendering of the command line.
    pub fn display_for_logs(&self) -> String {
        let program = shell_escape(&self.program.to_string_lossy());
        let args = self
            .args
            .iter()
            .map(|arg| shell_escape(arg))
            .collect::<Vec<_>>()
            .join(" ");

        if args.is_empty() {
            program
        } else {
            format!("{} {}", program, args)
        }
    }
}

/// Builds the game invocation for an installed version.
pub trait CommandBuilder: Send + Sync {
    fn build(
        &self,
        version: &str,
        layout: &GameLayout,
        options: &LaunchOptions,
    ) -> LauncherResult<ProcessDescriptor>;
}

/// Command builder for versions laid out the way the vanilla installer
/// writes them (`versions/<id>/<id>.json`, `<id>.jar`, `natives/`).
#[derive(Debug, Clone)]
pub struct VanillaCommandBuilder {
    java_path: PathBuf,
}

impl Default for VanillaCommandBuilder {
    fn default() -> Self {
        Self::new("java")
    }
}

impl VanillaCommandBuilder {
    pub fn new(java_path: impl Into<PathBuf>) -> Self {
        Self {
            java_path: java_path.into(),
        }
    }
}

impl CommandBuilder for VanillaCommandBuilder {
    fn build(
        &self,
        version: &str,
        layout: &GameLayout,
        options: &LaunchOptions,
    ) -> LauncherResult<ProcessDescriptor> {
        let version_json = VersionJson::load_merged(&layout.versions_dir(), version)?;
        let main_class = version_json
            .main_class
            .as_deref()
            .ok_or_else(|| LauncherError::Other(format!("Main class not set for {}", version)))?;
        let jar_version = version_json.jar.as_deref().unwrap_or(version);

        let classpath = build_classpath(&version_json, layout, jar_version);
        if classpath.trim().is_empty() {
            return Err(LauncherError::Other(format!(
                "Empty classpath for {}",
                version
            )));
        }
        debug!("Classpath len={}", classpath.len());

        let context = PlaceholderContext {
            version,
            version_type: version_json.version_type.as_deref().unwrap_or("release"),
            game_dir: safe_path_str(layout.root()),
            assets_dir: safe_path_str(&layout.assets_dir()),
            asset_index: version_json.asset_index_name(),
            natives_dir: safe_path_str(&layout.natives_dir(jar_version)),
            libraries_dir: safe_path_str(&layout.libraries_dir()),
            classpath: &classpath,
            identity: &options.identity,
        };

        // ── JVM Arguments ──
        let mut args: Vec<String> = options.runtime.as_slice().to_vec();
        args.extend(resolve_jvm_args(&version_json.simple_jvm_args(), &context));
        args.push("-cp".into());
        args.push(classpath.clone());

        // Main class
        args.push(main_class.to_string());

        // ── Game Arguments ──
        args.extend(resolve_game_args(&version_json.simple_game_args(), &context));
        args.extend(options.display.game_args());

        Ok(ProcessDescriptor {
            program: self.java_path.clone(),
            args,
            current_dir: layout.root().to_path_buf(),
        })
    }
}

fn build_classpath(version_json: &VersionJson, layout: &GameLayout, jar_version: &str) -> String {
    let libraries_dir = layout.libraries_dir();
    let mut entries: Vec<String> = version_json
        .classpath_libraries()
        .into_iter()
        .map(|relative| safe_path_str(&libraries_dir.join(relative)))
        .collect();
    entries.push(safe_path_str(&layout.client_jar(jar_version)));
    entries.join(get_classpath_separator())
}

struct PlaceholderContext<'a> {
    version: &'a str,
    version_type: &'a str,
    game_dir: String,
    assets_dir: String,
    asset_index: &'a str,
    natives_dir: String,
    libraries_dir: String,
    classpath: &'a str,
    identity: &'a PlayerIdentity,
}

fn resolve_jvm_args(raw_args: &[String], ctx: &PlaceholderContext<'_>) -> Vec<String> {
    let mut resolved_args = Vec::new();
    let mut i = 0;

    while i < raw_args.len() {
        let arg = &raw_args[i];

        // The classpath is always appended by the builder itself.
        if arg == "-cp" || arg == "-classpath" || arg == "--class-path" {
            i += 2;
            continue;
        }

        let resolved = arg
            .replace("${natives_directory}", &ctx.natives_dir)
            .replace("${library_directory}", &ctx.libraries_dir)
            .replace("${classpath_separator}", get_classpath_separator())
            .replace("${classpath}", ctx.classpath)
            .replace("${game_directory}", &ctx.game_dir)
            .replace("${version_name}", ctx.version)
            .replace("${launcher_name}", LAUNCHER_NAME)
            .replace("${launcher_version}", LAUNCHER_VERSION);

        push_resolved(&mut resolved_args, resolved);
        i += 1;
    }

    resolved_args
}

fn resolve_game_args(raw_args: &[String], ctx: &PlaceholderContext<'_>) -> Vec<String> {
    let mut resolved_args = Vec::new();

    for arg in raw_args {
        let resolved = arg
            .replace("${auth_player_name}", &ctx.identity.username)
            .replace("${version_name}", ctx.version)
            .replace("${game_directory}", &ctx.game_dir)
            .replace("${assets_root}", &ctx.assets_dir)
            .replace("${game_assets}", &ctx.assets_dir)
            .replace("${assets_index_name}", ctx.asset_index)
            .replace("${auth_uuid}", &ctx.identity.uuid)
            .replace("${auth_access_token}", &ctx.identity.access_token)
            .replace("${auth_session}", &ctx.identity.access_token)
            .replace("${auth_xuid}", &ctx.identity.xuid)
            .replace("${clientid}", &ctx.identity.client_id)
            .replace("${user_properties}", "{}")
            .replace("${user_type}", &ctx.identity.user_type)
            .replace("${version_type}", ctx.version_type);

        push_resolved(&mut resolved_args, resolved);
    }

    resolved_args
}

/// Unresolvable placeholders are dropped together with the option they
/// were the value of.
fn push_resolved(args: &mut Vec<String>, resolved: String) {
    if resolved.contains("${") {
        debug!("Dropping unresolved argument {:?}", resolved);
        drop_dangling_option(args);
        return;
    }
    args.push(resolved);
}

fn drop_dangling_option(args: &mut Vec<String>) {
    if args.last().is_some_and(|last| last.starts_with('-')) {
        let _ = args.pop();
    }
}

/// Platform-specific Java classpath separator.
pub fn get_classpath_separator() -> &'static str {
    if cfg!(target_os = "windows") {
        ";"
    } else {
        ":"
    }
}

/// Canonical path as a string, without the `\\?\` prefix on Windows.
pub fn safe_path_str(path: &Path) -> String {
    let resolved = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let text = resolved.to_string_lossy().to_string();

    #[cfg(target_os = "windows")]
    {
        // Java rejects extended-length paths on the classpath.
        if let Some(stripped) = text.strip_prefix(r"\\?\") {
            return stripped.to_string();
        }
    }

    text
}

fn configure_platform_spawn(cmd: &mut std::process::Command) {
    #[cfg(target_os = "windows")]
    {
        const DETACHED_PROCESS: u32 = 0x00000008;
        cmd.creation_flags(DETACHED_PROCESS);
        cmd.env_remove("WT_SESSION");
        cmd.env_remove("TERM");
    }
    #[cfg(not(target_os = "windows"))]
    let _ = cmd;
}

fn shell_escape(raw: &str) -> String {
    if raw.is_empty() {
        return "\"\"".to_string();
    }

    if raw.chars().all(|ch| {
        ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '/' | ':' | '\\' | '=')
    }) {
        return raw.to_string();
    }

    format!("\"{}\"", raw.replace('"', "\\\""))
}
