pub mod manifest;
pub mod version_file;

pub use manifest::{VersionCatalog, VersionEntry, VersionManifest};
pub use version_file::{AssetIndexInfo, LibraryPlan, VersionJson};
