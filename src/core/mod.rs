// ─── Minelaunch Core ───
// Install/launch orchestration for a Minecraft launcher.
//
// Architecture:
//   core/
//     progress/   — Latest-value progress channel (reporter + watcher)
//     task/       — Pause gate, install task, per-version task supervisor
//     install/    — Installer seam + vanilla installer (manifest → files)
//     version/    — Mojang manifest, version catalog, version JSON + OS rules
//     downloader/ — Concurrent downloads with SHA-1 validation
//     assets/     — Asset index + object planning
//     profile/    — Performance profiles → JVM flags (memory-aware)
//     launch/     — Launch options, command builder, launch coordinator
//     state/      — Settings + application wiring
//     layout.rs   — On-disk Minecraft directory layout

pub mod assets;
pub mod downloader;
pub mod error;
pub mod http;
pub mod install;
pub mod launch;
pub mod layout;
pub mod profile;
pub mod progress;
pub mod state;
pub mod task;
pub mod version;
