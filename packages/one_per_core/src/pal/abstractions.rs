use std::fmt::Debug;
use std::io;

use crate::ProcessorSet;

/// The operating system interface used by the topology and affinity logic.
///
/// All OS calls go through this trait, enabling them to be mocked.
#[cfg_attr(test, mockall::automock)]
pub(crate) trait Platform: Debug + Send + Sync + 'static {
    /// The textual processor inventory of the system, or `None` if it is unavailable.
    ///
    /// On Linux this is the contents of /proc/cpuinfo: a plaintext file with
    /// "key    : value" pairs, blocks separated by empty lines.
    fn processor_inventory(&self) -> Option<String>;

    /// Whether the named environment variable is set to any value.
    fn env_var_is_set(&self, name: &str) -> bool;

    /// The set of processors the current thread is allowed to run on.
    fn current_thread_affinity(&self) -> Result<ProcessorSet, io::Error>;

    /// Restricts the current thread to the given processors.
    ///
    /// Only touches the calling thread's own scheduling state.
    fn set_current_thread_affinity(&self, processors: &ProcessorSet) -> Result<(), io::Error>;
}
