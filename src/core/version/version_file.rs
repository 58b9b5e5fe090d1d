// ─── Version File ───
// Parses a Mojang version JSON, evaluates OS rules, and plans the files an
// install has to fetch.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::core::downloader::DownloadEntry;
use crate::core::error::{LauncherError, LauncherResult};

/// A fully parsed Mojang version JSON.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionJson {
    pub id: Option<String>,
    #[serde(default)]
    pub main_class: Option<String>,
    #[serde(default)]
    pub inherits_from: Option<String>,
    /// Version whose client jar is used (loader profiles point at their parent).
    #[serde(default)]
    pub jar: Option<String>,
    #[serde(default, rename = "type")]
    pub version_type: Option<String>,
    #[serde(default)]
    pub libraries: Vec<LibraryEntry>,
    pub downloads: Option<VersionDownloads>,
    #[serde(default)]
    pub asset_index: Option<AssetIndexInfo>,
    #[serde(default)]
    pub assets: Option<String>,
    #[serde(default)]
    pub arguments: Option<Arguments>,
    /// Legacy `minecraftArguments` field (pre-1.13).
    #[serde(default)]
    pub minecraft_arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VersionDownloads {
    pub client: Option<DownloadArtifact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadArtifact {
    pub sha1: String,
    pub size: u64,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndexInfo {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<serde_json::Value>,
    #[serde(default)]
    pub jvm: Vec<serde_json::Value>,
}

// ─── Library Entry with Rules ───

#[derive(Debug, Deserialize)]
pub struct LibraryEntry {
    pub name: String,
    #[serde(default)]
    pub downloads: Option<LibraryDownloads>,
    #[serde(default)]
    pub rules: Option<Vec<LibraryRule>>,
    #[serde(default)]
    pub natives: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct LibraryDownloads {
    pub artifact: Option<LibDownloadArtifact>,
    #[serde(default)]
    pub classifiers: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibDownloadArtifact {
    pub path: String,
    pub sha1: String,
    #[serde(default)]
    pub size: Option<u64>,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct LibraryRule {
    pub action: RuleAction,
    #[serde(default)]
    pub os: Option<OsRule>,
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Deserialize)]
pub struct OsRule {
    #[serde(default)]
    pub name: Option<String>,
}

/// Files an install has to fetch for the libraries of one version.
#[derive(Debug, Default)]
pub struct LibraryPlan {
    pub downloads: Vec<DownloadEntry>,
    /// Native archives (already present or planned) to unpack into `natives/`.
    pub native_archives: Vec<PathBuf>,
}

impl LibraryEntry {
    /// Evaluate whether this library should be included for the current OS.
    ///
    /// No rules means allowed. Otherwise rules are applied top to bottom,
    /// starting from "disallowed"; the last matching rule wins.
    pub fn is_allowed_for_current_os(&self) -> bool {
        match &self.rules {
            None => true,
            Some(rules) => {
                let mut allowed = false;
                for rule in rules {
                    let os_matches = rule
                        .os
                        .as_ref()
                        .and_then(|os| os.name.as_deref())
                        .map_or(true, |name| name == current_os_name());
                    if os_matches {
                        allowed = rule.action == RuleAction::Allow;
                    }
                }
                allowed
            }
        }
    }

    /// Native classifier (e.g. `natives-linux`) for the current OS, if any.
    pub fn native_classifier_for_current_os(&self) -> Option<String> {
        let natives = self.natives.as_ref()?;
        let arch = if cfg!(target_pointer_width = "64") {
            "64"
        } else {
            "32"
        };
        natives
            .as_object()?
            .get(current_os_name())?
            .as_str()
            .map(|s| s.replace("${arch}", arch))
    }

    /// Jar path relative to `libraries/`: the declared artifact path, or the
    /// Maven layout derived from the coordinate.
    pub fn artifact_path(&self) -> Option<PathBuf> {
        if let Some(artifact) = self.downloads.as_ref().and_then(|d| d.artifact.as_ref()) {
            return Some(PathBuf::from(&artifact.path));
        }
        if self.native_classifier_for_current_os().is_some() && self.downloads.is_some() {
            // natives-only entry (legacy LWJGL): nothing goes on the classpath
            return None;
        }
        maven_local_path(&self.name)
    }
}

/// Get the Mojang OS name for the current platform.
pub fn current_os_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "osx"
    } else {
        "linux"
    }
}

/// `group:artifact:version[:classifier][@ext]` → `group/path/artifact/version/file`.
pub fn maven_local_path(coordinate: &str) -> Option<PathBuf> {
    let (coordinate, extension) = match coordinate.rsplit_once('@') {
        Some((coord, ext)) => (coord, ext),
        None => (coordinate, "jar"),
    };
    let parts: Vec<&str> = coordinate.split(':').collect();
    let (group, artifact, version, classifier) = match parts.as_slice() {
        [g, a, v] => (*g, *a, *v, None),
        [g, a, v, c] => (*g, *a, *v, Some(*c)),
        _ => return None,
    };
    if [group, artifact, version].iter().any(|p| p.is_empty()) {
        return None;
    }

    let file_name = match classifier {
        Some(c) => format!("{}-{}-{}.{}", artifact, version, c, extension),
        None => format!("{}-{}.{}", artifact, version, extension),
    };
    Some(
        PathBuf::from(group.replace('.', "/"))
            .join(artifact)
            .join(version)
            .join(file_name),
    )
}

impl VersionJson {
    /// Fetch and parse a version JSON from the given URL using a shared client.
    pub async fn fetch(client: &reqwest::Client, url: &str) -> LauncherResult<(Self, String)> {
        let response = client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        let raw = response.text().await?;
        let version_json: VersionJson = serde_json::from_str(&raw)?;
        Ok((version_json, raw))
    }

    /// Read an installed version JSON, merging its `inheritsFrom` chain.
    pub fn load_merged(versions_dir: &Path, version: &str) -> LauncherResult<Self> {
        let mut merged = read_json_value(versions_dir, version)?;
        let mut seen = vec![version.to_string()];

        while let Some(parent) = merged
            .get("inheritsFrom")
            .and_then(|v| v.as_str())
            .map(str::to_string)
        {
            if seen.contains(&parent) {
                return Err(LauncherError::Other(format!(
                    "Circular inheritsFrom chain at {}",
                    parent
                )));
            }
            let parent_json = read_json_value(versions_dir, &parent)?;
            merged = Self::merge_with_parent_json(&merged, &parent_json)?;
            if let Some(obj) = merged.as_object_mut() {
                obj.entry("jar")
                    .or_insert_with(|| serde_json::Value::String(parent.clone()));
                obj.remove("inheritsFrom");
                if let Some(next) = parent_json.get("inheritsFrom") {
                    obj.insert("inheritsFrom".into(), next.clone());
                }
            }
            seen.push(parent);
        }

        Ok(serde_json::from_value(merged)?)
    }

    /// Client jar download, if the version declares one.
    pub fn client_download(&self, dest: PathBuf) -> Option<DownloadEntry> {
        let client = self.downloads.as_ref()?.client.as_ref()?;
        Some(DownloadEntry {
            url: client.url.clone(),
            dest,
            sha1: Some(client.sha1.clone()),
            size: Some(client.size),
        })
    }

    /// Plan library downloads (respecting OS rules), skipping jars already
    /// present under `libs_dir`.
    pub fn plan_libraries(&self, libs_dir: &Path) -> LibraryPlan {
        let mut plan = LibraryPlan::default();

        for lib in &self.libraries {
            if !lib.is_allowed_for_current_os() {
                debug!("Skipping library (OS rule): {}", lib.name);
                continue;
            }
            let Some(downloads) = lib.downloads.as_ref() else {
                continue;
            };

            if let Some(artifact) = &downloads.artifact {
                let dest = libs_dir.join(&artifact.path);
                if !dest.exists() {
                    plan.downloads.push(DownloadEntry {
                        url: artifact.url.clone(),
                        dest,
                        sha1: Some(artifact.sha1.clone()),
                        size: artifact.size,
                    });
                }
            }

            let native = lib
                .native_classifier_for_current_os()
                .and_then(|classifier| downloads.classifiers.as_ref()?.get(&classifier).cloned());
            if let Some(native_info) = native {
                if let (Some(url), Some(path), Some(sha1)) = (
                    native_info.get("url").and_then(|v| v.as_str()),
                    native_info.get("path").and_then(|v| v.as_str()),
                    native_info.get("sha1").and_then(|v| v.as_str()),
                ) {
                    let dest = libs_dir.join(path);
                    if !dest.exists() {
                        plan.downloads.push(DownloadEntry {
                            url: url.to_string(),
                            dest: dest.clone(),
                            sha1: Some(sha1.to_string()),
                            size: native_info.get("size").and_then(|v| v.as_u64()),
                        });
                    }
                    plan.native_archives.push(dest);
                }
            }
        }

        plan
    }

    /// Classpath jars for allowed libraries, relative to `libraries/`.
    pub fn classpath_libraries(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = Vec::new();
        for lib in self.libraries.iter().filter(|l| l.is_allowed_for_current_os()) {
            if let Some(path) = lib.artifact_path() {
                if !paths.contains(&path) {
                    paths.push(path);
                }
            }
        }
        paths
    }

    /// Asset index id used for `${assets_index_name}`.
    pub fn asset_index_name(&self) -> &str {
        self.asset_index
            .as_ref()
            .map(|ai| ai.id.as_str())
            .or(self.assets.as_deref())
            .unwrap_or("legacy")
    }

    /// Extract game arguments (string values plus rule-matched objects).
    pub fn simple_game_args(&self) -> Vec<String> {
        match &self.arguments {
            Some(args) => args.game.iter().flat_map(extract_argument_values).collect(),
            None => self
                .minecraft_arguments
                .as_deref()
                .map(|s| s.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
        }
    }

    /// Extract JVM arguments. Pre-1.13 versions declare none, so the launcher
    /// defaults are returned for them.
    pub fn simple_jvm_args(&self) -> Vec<String> {
        match &self.arguments {
            Some(args) if !args.jvm.is_empty() => {
                args.jvm.iter().flat_map(extract_argument_values).collect()
            }
            _ => vec![
                "-Djava.library.path=${natives_directory}".into(),
                "-cp".into(),
                "${classpath}".into(),
            ],
        }
    }

    /// Build a merged version JSON with `parent_json` as base and this version
    /// overriding matching keys. Libraries and argument lists are concatenated
    /// (child first) rather than replaced. Both documents must be objects.
    pub fn merge_with_parent_json(
        current_json: &serde_json::Value,
        parent_json: &serde_json::Value,
    ) -> LauncherResult<serde_json::Value> {
        let mut merged = parent_json.clone();
        let (Some(child), Some(base)) = (current_json.as_object(), merged.as_object_mut()) else {
            return Err(LauncherError::Other(
                "Malformed version JSON: expected an object".into(),
            ));
        };

        for (k, v) in child {
            match k.as_str() {
                "libraries" => {
                    let mut libs = v.as_array().cloned().unwrap_or_default();
                    if let Some(parent_libs) = parent_json.get("libraries").and_then(|l| l.as_array()) {
                        libs.extend(parent_libs.iter().cloned());
                    }
                    base.insert(k.clone(), serde_json::Value::Array(libs));
                }
                "arguments" => {
                    let mut args = parent_json
                        .get("arguments")
                        .and_then(|a| a.as_object())
                        .cloned()
                        .unwrap_or_default();
                    for key in ["jvm", "game"] {
                        let mut combined = args
                            .get(key)
                            .and_then(|a| a.as_array())
                            .cloned()
                            .unwrap_or_default();
                        if let Some(child) = v.get(key).and_then(|a| a.as_array()) {
                            combined.extend(child.iter().cloned());
                        }
                        args.insert(key.to_string(), serde_json::Value::Array(combined));
                    }
                    base.insert(k.clone(), serde_json::Value::Object(args));
                }
                _ => {
                    base.insert(k.clone(), v.clone());
                }
            }
        }

        Ok(merged)
    }
}

fn read_json_value(versions_dir: &Path, version: &str) -> LauncherResult<serde_json::Value> {
    let path = versions_dir
        .join(version)
        .join(format!("{}.json", version));
    if !path.is_file() {
        return Err(LauncherError::VersionNotInstalled(version.to_string()));
    }
    let raw = std::fs::read_to_string(&path).map_err(|source| LauncherError::Io {
        path: path.clone(),
        source,
    })?;
    let value: serde_json::Value = serde_json::from_str(&raw)?;
    if !value.is_object() {
        return Err(LauncherError::Other(format!(
            "Malformed version JSON {:?}: expected an object",
            path
        )));
    }
    Ok(value)
}

fn extract_argument_values(value: &serde_json::Value) -> Vec<String> {
    if let Some(arg) = value.as_str() {
        return vec![arg.to_string()];
    }

    let Some(obj) = value.as_object() else {
        return vec![];
    };

    if let Some(rules) = obj.get("rules").and_then(|r| r.as_array()) {
        if !rules_allow_current_os(rules) {
            return vec![];
        }
    }

    match obj.get("value") {
        Some(serde_json::Value::String(s)) => vec![s.clone()],
        Some(serde_json::Value::Array(arr)) => arr
            .iter()
            .filter_map(|v| v.as_str().map(ToString::to_string))
            .collect(),
        _ => vec![],
    }
}

/// Argument rules. Feature-gated rules (demo mode, quick play, custom
/// resolution) never match: the launcher adds those flags itself.
fn rules_allow_current_os(rules: &[serde_json::Value]) -> bool {
    let mut allowed = false;

    for rule in rules {
        if rule.get("features").is_some() {
            return false;
        }
        let action = rule
            .get("action")
            .and_then(|v| v.as_str())
            .unwrap_or("disallow");

        let os_matches = rule
            .get("os")
            .and_then(|os| os.get("name"))
            .and_then(|name| name.as_str())
            .map_or(true, |name| name == current_os_name());

        if os_matches {
            allowed = action == "allow";
        }
    }

    allowed
}
