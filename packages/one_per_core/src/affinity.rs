use std::sync::atomic::{AtomicBool, Ordering};

use crate::pal::{Platform, PlatformFacade};
use crate::{CpuTopology, Error, ProcessorId, ProcessorSet, Result};

/// Environment variables recognized as threading or affinity overrides.
///
/// These are the controls of common parallel runtimes and math libraries. When any of them is
/// set, the operator has taken manual control of thread placement and the crate stays out of
/// the way: all binding operations become no-ops.
const THREADING_ENV_VARS: [&str; 30] = [
    "OMP_CANCELLATION",
    "OMP_DISPLAY_ENV",
    "OMP_DEFAULT_DEVICE",
    "OMP_DYNAMIC",
    "OMP_MAX_ACTIVE_LEVELS",
    "OMP_MAX_TASK_PRIORITY",
    "OMP_NESTED",
    "OMP_NUM_THREADS",
    "OMP_PROC_BIND",
    "OMP_PLACES",
    "OMP_STACKSIZE",
    "OMP_SCHEDULE",
    "OMP_THREAD_LIMIT",
    "OMP_WAIT_POLICY",
    "GOMP_CPU_AFFINITY",
    "GOMP_DEBUG",
    "GOMP_STACKSIZE",
    "GOMP_SPINCOUNT",
    "GOMP_RTEMS_THREAD_POOLS",
    "KMP_AFFINITY",
    "KMP_NUM_THREADS",
    "MIC_KMP_AFFINITY",
    "MIC_OMP_NUM_THREADS",
    "MIC_OMP_PROC_BIND",
    "PHI_KMP_AFFINITY",
    "PHI_OMP_NUM_THREADS",
    "PHI_KMP_PLACE_THREADS",
    "MKL_NUM_THREADS",
    "MKL_DYNAMIC",
    "MKL_DOMAIN_NUM_THREADS",
];

/// The seam to the external parallel runtime whose workers get bound to cores.
///
/// The crate does not schedule work itself; it only configures the pool's worker count and
/// applies affinity from within each worker. Implement this for whatever runtime dispatches
/// your parallel loops.
pub trait WorkerPool {
    /// Sets the number of worker threads the pool uses for subsequent parallel regions.
    fn set_worker_count(&self, count: usize);

    /// Runs `body` once on every worker thread, passing each worker its index in
    /// `0..worker_count`. Each invocation must execute on the worker thread itself, as the
    /// body manipulates the affinity of the calling thread.
    fn run_on_workers(&self, body: &(dyn Fn(usize) + Sync));
}

/// Binds threads to distinct physical cores, based on a [`CpuTopology`] snapshot.
///
/// At construction, the manager scans the environment for threading overrides, queries the OS
/// for the set of processors the process may run on and reduces that set to one representative
/// logical processor per physical core, so that hyperthread siblings are never double-booked.
/// Workers bound through [`bind_worker_pool`][Self::bind_worker_pool] each own one physical
/// core exclusively; housekeeping threads can be kept off the workers' cores with
/// [`bind_current_thread_to_secondary_core`][Self::bind_current_thread_to_secondary_core].
///
/// Construct the manager once at startup, after building the topology snapshot, and share it
/// by reference. Construction must complete before worker threads start using it; after that,
/// all state is read-only except the GPU flag, which is an eventually-consistent toggle.
///
/// Core identity is derived as `processor_id % total_physical_cores`, which assumes the common
/// layout where hyperthread siblings are offset by the core count. This holds on typical x86
/// systems but is not guaranteed by every OS topology.
///
/// # Example
///
/// ```
/// use one_per_core::{AffinityManager, CpuTopology};
///
/// let topology = CpuTopology::detect();
/// let manager = AffinityManager::new(&topology);
///
/// if manager.is_binding_allowed() {
///     println!(
///         "will bind {} workers to distinct physical cores",
///         manager.effective_worker_count()
///     );
/// }
/// ```
#[derive(Debug)]
pub struct AffinityManager {
    platform: PlatformFacade,

    clock_speed_mhz: u32,
    socket_count: u32,
    processor_count: u32,
    total_physical_cores: u32,

    /// The processors the process was allowed to run on when the manager was built, or every
    /// processor known to the topology if the OS query failed.
    allowed_processors: ProcessorSet,

    /// One allowed logical processor per distinct physical core, in order of discovery
    /// (ascending processor ID, first claim of each core wins).
    core_representatives: Vec<ProcessorId>,

    env_override_present: bool,
    gpu_enabled: AtomicBool,
}

impl AffinityManager {
    /// Creates a manager for the current process, consuming the topology snapshot's aggregates.
    #[must_use]
    pub fn new(topology: &CpuTopology) -> Self {
        Self::with_platform(topology, PlatformFacade::target())
    }

    pub(crate) fn with_platform(topology: &CpuTopology, platform: PlatformFacade) -> Self {
        let env_override_present = THREADING_ENV_VARS
            .iter()
            .any(|name| platform.env_var_is_set(name));

        let allowed_processors = match platform.current_thread_affinity() {
            Ok(processors) => processors,
            Err(error) => {
                tracing::debug!(
                    %error,
                    "affinity query failed; assuming all known processors are allowed"
                );
                ProcessorSet::first_n(topology.processor_count())
            }
        };

        let total_physical_cores = topology.total_physical_cores();
        let mut core_representatives = Vec::new();

        // With zero physical cores there is no core identity to derive, so no processor can
        // represent one; the representative set stays empty.
        if total_physical_cores != 0 {
            let mut claimed_cores = ProcessorSet::new();

            for processor_id in 0..topology.processor_count() {
                if !allowed_processors.contains(processor_id) {
                    continue;
                }

                let core_id = processor_id % total_physical_cores;

                if !claimed_cores.contains(core_id) {
                    claimed_cores.insert(core_id);
                    core_representatives.push(processor_id);
                }
            }
        }

        Self {
            platform,
            clock_speed_mhz: topology.clock_speed_mhz(),
            socket_count: topology.socket_count(),
            processor_count: topology.processor_count(),
            total_physical_cores,
            allowed_processors,
            core_representatives,
            env_override_present,
            gpu_enabled: AtomicBool::new(false),
        }
    }

    /// Whether binding operations are permitted.
    ///
    /// Binding is allowed only when no threading override is present in the environment and
    /// GPU mode is not enabled. The pool binding operation checks this internally; other
    /// callers are expected to check it themselves where relevant.
    #[must_use]
    pub fn is_binding_allowed(&self) -> bool {
        !self.env_override_present && !self.gpu_enabled.load(Ordering::Relaxed)
    }

    /// Toggles GPU mode.
    ///
    /// When the workload runs on a GPU, the CPU-side threads are not compute-bound and pinning
    /// them does more harm than good, so enabling GPU mode disables all binding. The flag may
    /// be toggled from any thread; concurrent readers observe the change eventually
    /// (last-writer-wins, no stronger ordering).
    pub fn set_gpu_enabled(&self, enabled: bool) {
        self.gpu_enabled.store(enabled, Ordering::Relaxed);
    }

    /// Whether GPU mode is currently enabled.
    #[must_use]
    pub fn gpu_enabled(&self) -> bool {
        self.gpu_enabled.load(Ordering::Relaxed)
    }

    /// Whether any recognized threading environment variable was set at construction.
    #[must_use]
    pub fn env_override_present(&self) -> bool {
        self.env_override_present
    }

    /// The processors the process was allowed to run on when the manager was built.
    #[must_use]
    pub fn allowed_processors(&self) -> ProcessorSet {
        self.allowed_processors
    }

    /// The representative logical processor of each available physical core, in discovery
    /// order.
    #[must_use]
    pub fn core_representatives(&self) -> &[ProcessorId] {
        &self.core_representatives
    }

    /// The number of worker threads a bound pool will use: one per available physical core.
    #[must_use]
    pub fn effective_worker_count(&self) -> usize {
        self.core_representatives.len()
    }

    /// Binds the calling thread to the second available physical core, or to the first if
    /// only one core is available.
    ///
    /// Intended for housekeeping and I/O threads: keeping them off core 0 leaves the primary
    /// core's worker undisturbed. Does nothing when binding is not allowed or no cores are
    /// available.
    pub fn bind_current_thread_to_secondary_core(&self) {
        if !self.is_binding_allowed() {
            return;
        }

        let logical_core_id = usize::from(self.core_representatives.len() > 1);

        // The index is chosen internally, so an empty representative set is not a caller
        // contract violation; there is simply nothing to bind to.
        let Some(processor_id) = self.core_representatives.get(logical_core_id).copied() else {
            return;
        };

        self.apply_affinity(&single_processor(processor_id));
    }

    /// Adjusts the pool to one worker per available physical core and binds each worker
    /// thread to its own core.
    ///
    /// The pool's worker count is set to [`effective_worker_count`][Self::effective_worker_count]
    /// regardless of what the pool was configured with before; the caller must accept the
    /// adjusted value. Worker index `i` is bound to the `i`-th core representative, giving a
    /// one-to-one mapping from workers to physical cores.
    ///
    /// Does nothing - neither the worker count nor any affinity is touched - when binding is
    /// not allowed.
    pub fn bind_worker_pool(&self, pool: &(impl WorkerPool + ?Sized)) {
        if !self.is_binding_allowed() {
            return;
        }

        let worker_count = self.core_representatives.len();
        pool.set_worker_count(worker_count);

        pool.run_on_workers(&|worker_index| {
            let processor_id = self
                .core_representatives
                .get(worker_index)
                .copied()
                .expect("pool dispatched a worker index beyond the configured worker count");

            self.apply_affinity(&single_processor(processor_id));
        });
    }

    /// Binds the calling thread to exactly the representative processor of the given logical
    /// core index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CoreIndexOutOfRange`] when `logical_core_id` is at or beyond the
    /// number of available physical cores. This is a caller contract violation and is by
    /// policy unrecoverable; it is never wrapped around or clamped.
    pub fn bind_current_thread_to_core(&self, logical_core_id: usize) -> Result<()> {
        let processor_id = self.resolve_core_index(logical_core_id)?;

        self.apply_affinity(&single_processor(processor_id));
        Ok(())
    }

    /// Binds the calling thread to every allowed hyperthread sibling of the given logical
    /// core index, rather than to a single processor.
    ///
    /// Use this when a thread should float across a core's hyperthreads instead of pinning to
    /// one of them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CoreIndexOutOfRange`] when `logical_core_id` is at or beyond the
    /// number of available physical cores, as for
    /// [`bind_current_thread_to_core`][Self::bind_current_thread_to_core].
    pub fn bind_current_thread_to_core_siblings(&self, logical_core_id: usize) -> Result<()> {
        let representative = self.resolve_core_index(logical_core_id)?;

        // Siblings of a core are the processor IDs congruent to it modulo the core count.
        // A representative exists, so the core count is nonzero.
        let mut processors = ProcessorSet::new();
        let mut processor_id = representative % self.total_physical_cores;

        while processor_id < self.processor_count {
            if self.allowed_processors.contains(processor_id) {
                processors.insert(processor_id);
            }

            processor_id = processor_id.saturating_add(self.total_physical_cores);
        }

        self.apply_affinity(&processors);
        Ok(())
    }

    /// Logs every derived quantity at info level, for operator visibility.
    pub fn log_summary(&self) {
        tracing::info!(
            clock_speed_mhz = self.clock_speed_mhz,
            socket_count = self.socket_count,
            total_physical_cores = self.total_physical_cores,
            processor_count = self.processor_count,
            allowed_processors = %self.allowed_processors,
            gpu_enabled = self.gpu_enabled(),
            env_override_present = self.env_override_present,
            binding_allowed = self.is_binding_allowed(),
            effective_worker_count = self.effective_worker_count(),
            "processor binding summary"
        );
    }

    fn resolve_core_index(&self, logical_core_id: usize) -> Result<ProcessorId> {
        self.core_representatives
            .get(logical_core_id)
            .copied()
            .ok_or(Error::CoreIndexOutOfRange {
                index: logical_core_id,
                available: self.core_representatives.len(),
            })
    }

    /// Applies an affinity mask to the calling thread.
    ///
    /// A failed set call is reported and not retried; the thread then simply runs unbound.
    fn apply_affinity(&self, processors: &ProcessorSet) {
        if let Err(error) = self.platform.set_current_thread_affinity(processors) {
            tracing::warn!(
                %error,
                %processors,
                "failed to set thread affinity; thread remains unbound"
            );
        }
    }
}

fn single_processor(processor_id: ProcessorId) -> ProcessorSet {
    let mut processors = ProcessorSet::new();
    processors.insert(processor_id);
    processors
}
