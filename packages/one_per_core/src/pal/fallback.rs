use std::env;
use std::io::{self, Error, ErrorKind};

use crate::ProcessorSet;
use crate::pal::Platform;

/// Fallback platform implementation for operating systems without native support.
///
/// Provides graceful degradation: there is no processor inventory (so the topology snapshot
/// stays empty), the affinity query reports itself unsupported (so callers fall back to their
/// defaults) and affinity changes are accepted but not applied. Code using the crate compiles
/// and runs on any platform, just without the benefits of actual pinning.
#[derive(Debug, Default)]
pub(crate) struct BuildTargetPlatform;

impl Platform for BuildTargetPlatform {
    fn processor_inventory(&self) -> Option<String> {
        None
    }

    fn env_var_is_set(&self, name: &str) -> bool {
        env::var_os(name).is_some()
    }

    fn current_thread_affinity(&self) -> Result<ProcessorSet, io::Error> {
        Err(Error::new(
            ErrorKind::Unsupported,
            "thread affinity is not supported on this platform",
        ))
    }

    fn set_current_thread_affinity(&self, _processors: &ProcessorSet) -> Result<(), io::Error> {
        // Accepted but not applied; threads simply remain unbound.
        Ok(())
    }
}
