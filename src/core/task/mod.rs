pub mod gate;
pub mod install;
pub mod supervisor;

pub use gate::PauseGate;
pub use install::{InstallState, InstallTask, TaskOutcome};
pub use supervisor::{StartOutcome, TaskStatus, TaskSupervisor};
