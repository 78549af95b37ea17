use std::io::{self, Error};
use std::{env, fs, mem};

use libc::cpu_set_t;

use crate::pal::Platform;
use crate::{MAX_PROCESSORS, ProcessorSet};

/// The platform implementation for the real operating system that the build is targeting.
///
/// You would only use a different platform in unit tests that need a mock. Even then, whenever
/// possible, unit tests should use the real platform for maximum realism.
#[derive(Debug, Default)]
pub(crate) struct BuildTargetPlatform;

// Real OS bindings are tested via integration on actual Linux; error paths require OS-level
// failures that are impractical to trigger in tests.
impl Platform for BuildTargetPlatform {
    fn processor_inventory(&self) -> Option<String> {
        fs::read_to_string("/proc/cpuinfo").ok()
    }

    fn env_var_is_set(&self, name: &str) -> bool {
        env::var_os(name).is_some()
    }

    fn current_thread_affinity(&self) -> Result<ProcessorSet, io::Error> {
        // SAFETY: All zeroes is a valid cpu_set_t.
        let mut cpuset: cpu_set_t = unsafe { mem::zeroed() };

        // 0 means current thread.
        // SAFETY: No safety requirements beyond passing valid arguments.
        let result = unsafe { libc::sched_getaffinity(0, size_of::<cpu_set_t>(), &raw mut cpuset) };

        if result != 0 {
            return Err(Error::last_os_error());
        }

        let mut processors = ProcessorSet::new();

        for id in 0..MAX_PROCESSORS {
            // SAFETY: No safety requirements beyond passing valid arguments.
            if unsafe { libc::CPU_ISSET(id, &cpuset) } {
                #[expect(
                    clippy::cast_possible_truncation,
                    reason = "indexes are below MAX_PROCESSORS, which fits in u32"
                )]
                processors.insert(id as u32);
            }
        }

        Ok(processors)
    }

    fn set_current_thread_affinity(&self, processors: &ProcessorSet) -> Result<(), io::Error> {
        // SAFETY: All zeroes is a valid cpu_set_t.
        let mut cpuset: cpu_set_t = unsafe { mem::zeroed() };
        // SAFETY: No safety requirements beyond passing valid arguments.
        unsafe { libc::CPU_ZERO(&mut cpuset) };

        for id in processors.iter() {
            // SAFETY: No safety requirements beyond passing valid arguments.
            unsafe { libc::CPU_SET(id as usize, &mut cpuset) };
        }

        // 0 means current thread.
        // SAFETY: No safety requirements beyond passing valid arguments.
        let result = unsafe { libc::sched_setaffinity(0, size_of::<cpu_set_t>(), &cpuset) };

        if result == 0 {
            Ok(())
        } else {
            Err(Error::last_os_error())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_thread_affinity_is_nonempty() {
        let platform = BuildTargetPlatform;

        let processors = platform
            .current_thread_affinity()
            .expect("querying our own affinity cannot fail on Linux");

        // The current thread is running on at least one allowed processor.
        assert!(!processors.is_empty());
    }

    #[test]
    fn inventory_is_present_on_linux() {
        let platform = BuildTargetPlatform;

        let inventory = platform
            .processor_inventory()
            .expect("/proc/cpuinfo exists on every Linux system");

        assert!(inventory.contains("processor"));
    }

    #[test]
    fn rebinding_to_current_affinity_succeeds() {
        let platform = BuildTargetPlatform;

        let processors = platform
            .current_thread_affinity()
            .expect("querying our own affinity cannot fail on Linux");

        // Setting the affinity to what it already is must be accepted.
        platform
            .set_current_thread_affinity(&processors)
            .expect("rebinding to the existing affinity mask cannot fail");
    }

    #[test]
    fn env_var_presence_is_detected() {
        let platform = BuildTargetPlatform;

        // PATH is set in any sane test environment.
        assert!(platform.env_var_is_set("PATH"));
        assert!(!platform.env_var_is_set("ONE_PER_CORE_NO_SUCH_VARIABLE"));
    }
}
