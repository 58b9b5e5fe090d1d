pub mod reporter;

pub use reporter::{ProgressReporter, ProgressSnapshot, ProgressWatcher};
