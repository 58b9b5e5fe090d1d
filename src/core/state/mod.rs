pub mod app_state;
pub mod settings;

pub use app_state::AppState;
pub use settings::{default_config_dir, LauncherSettings, MINECRAFT_DIR_ENV};
