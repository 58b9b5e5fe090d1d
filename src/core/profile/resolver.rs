use serde::Serialize;
use tracing::{debug, warn};

use super::memory::MemoryProbe;
use super::Profile;

/// Heap bounds for the memory-scaled profile, in GB.
const MIN_HEAP_GB: u64 = 2;
const MAX_HEAP_GB: u64 = 6;

/// Ordered JVM flags produced for one launch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuntimeArguments(Vec<String>);

impl RuntimeArguments {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a RuntimeArguments {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Map a profile and an available-memory sample (GB) to JVM flags.
///
/// `None` means the sample could not be taken; the memory-scaled profile
/// then falls back to the minimum heap.
pub fn resolve(profile: Profile, available_gb: Option<u64>) -> RuntimeArguments {
    let flags: Vec<String> = match profile {
        Profile::Standard => vec!["-Xmx2G".into(), "-Xms1G".into()],
        Profile::FpsBoost => vec![
            "-Xmx4G".into(),
            "-Xms2G".into(),
            "-XX:+UseG1GC".into(),
            "-XX:+OptimizeStringConcat".into(),
        ],
        Profile::UltraOptimized => {
            let heap = ultra_heap_gb(available_gb);
            let mut flags = vec![format!("-Xmx{}G", heap), format!("-Xms{}G", heap / 2)];
            flags.extend(
                [
                    "-XX:+UseG1GC",
                    "-XX:+UseStringDeduplication",
                    "-XX:+OptimizeStringConcat",
                    "-XX:+UnlockExperimentalVMOptions",
                    "-XX:ParallelGCThreads=4",
                    "-Dfml.ignoreInvalidMinecraftCertificates=true",
                    "-Dfml.ignorePatchDiscrepancies=true",
                    "-Djava.net.preferIPv4Stack=true",
                ]
                .map(String::from),
            );
            flags
        }
    };
    RuntimeArguments(flags)
}

/// Same as [`resolve`], sampling `probe` once, and only when the profile
/// depends on memory.
pub fn resolve_with(profile: Profile, probe: &dyn MemoryProbe) -> RuntimeArguments {
    let available_gb = match profile {
        Profile::UltraOptimized => match probe.available_gb() {
            Ok(gb) => {
                debug!("Available memory: {} GB", gb);
                Some(gb)
            }
            Err(e) => {
                warn!("Memory query failed, using minimum heap: {}", e);
                None
            }
        },
        _ => None,
    };
    resolve(profile, available_gb)
}

/// One GB stays with the OS; the result is clamped to [2, 6].
fn ultra_heap_gb(available_gb: Option<u64>) -> u64 {
    match available_gb {
        Some(gb) => gb.saturating_sub(1).clamp(MIN_HEAP_GB, MAX_HEAP_GB),
        None => MIN_HEAP_GB,
    }
}
