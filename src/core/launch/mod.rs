pub mod command;
pub mod coordinator;
pub mod options;

pub use command::{CommandBuilder, ProcessDescriptor, VanillaCommandBuilder};
pub use coordinator::{LaunchCoordinator, LaunchedProcess};
pub use options::{apply_frame_rate_cap, DisplaySettings, LaunchOptions, PlayerIdentity};
