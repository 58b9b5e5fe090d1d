use sysinfo::System;

use crate::core::error::{LauncherError, LauncherResult};

const BYTES_PER_GB: u64 = 1024 * 1024 * 1024;

/// Source of the "available memory" sample used when sizing the heap.
pub trait MemoryProbe: Send + Sync {
    /// Currently available physical memory in whole gigabytes (floored).
    fn available_gb(&self) -> LauncherResult<u64>;
}

/// Reads available memory from the OS.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemMemoryProbe;

impl MemoryProbe for SystemMemoryProbe {
    fn available_gb(&self) -> LauncherResult<u64> {
        let mut system = System::new();
        system.refresh_memory();
        bytes_to_gb(system.available_memory())
    }
}

/// A zero reading means the platform could not report memory.
fn bytes_to_gb(bytes: u64) -> LauncherResult<u64> {
    if bytes == 0 {
        return Err(LauncherError::ResourceQuery(
            "available memory reported as 0 bytes".into(),
        ));
    }
    Ok(bytes / BYTES_PER_GB)
}
