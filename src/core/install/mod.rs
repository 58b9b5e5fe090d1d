pub mod installer;
pub mod natives;
pub mod vanilla;

pub use installer::{InstallContext, InstallProgress, VersionInstaller};
pub use vanilla::VanillaInstaller;
