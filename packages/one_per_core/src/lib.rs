//! Compute-bound parallel workloads lose throughput in two quiet ways: two software threads
//! end up sharing one physical core via hyperthreading, or threads migrate between cores and
//! leave their caches behind. This crate discovers the physical processor topology of the host
//! machine and uses it to bind a pool of parallel workers to distinct physical cores, one
//! worker per core, while keeping capacity available for housekeeping and I/O threads.
//!
//! # How it works
//!
//! Two components, built once at startup:
//!
//! * [`CpuTopology`] parses the OS processor inventory (`/proc/cpuinfo` on Linux) into
//!   per-logical-processor records and derived aggregates: socket count, physical core count
//!   and clock speed.
//! * [`AffinityManager`] consumes those aggregates, queries the OS for the processors the
//!   process may run on, and reduces that set to one representative logical processor per
//!   physical core. Its operations bind the calling thread or an entire worker pool to
//!   specific cores.
//!
//! Binding steps aside automatically when the operator has taken manual control: if any
//! recognized threading environment variable (`OMP_NUM_THREADS`, `KMP_AFFINITY`,
//! `MKL_NUM_THREADS` and friends) is set, or GPU mode is enabled, every binding operation
//! becomes a no-op.
//!
//! # Quick start
//!
//! ```
//! use one_per_core::{AffinityManager, CpuTopology};
//!
//! let topology = CpuTopology::detect();
//! let manager = AffinityManager::new(&topology);
//!
//! // Keep this (housekeeping) thread off the primary worker core.
//! manager.bind_current_thread_to_secondary_core();
//!
//! // Wire up your parallel runtime through the WorkerPool trait, then:
//! // manager.bind_worker_pool(&pool);
//! println!(
//!     "{} workers, one per physical core",
//!     manager.effective_worker_count()
//! );
//! ```
//!
//! # Degradation, not failure
//!
//! A missing processor inventory, a malformed inventory line or a failed OS affinity call all
//! degrade to safe defaults: running unbound is always preferred over not running. The one
//! exception is a caller passing a logical core index beyond the available cores, which is a
//! contract violation reported as [`Error::CoreIndexOutOfRange`] and meant to be treated as
//! fatal.
//!
//! # Operating system compatibility
//!
//! Topology parsing and thread binding are implemented for Linux. On other operating systems
//! the crate compiles and runs with graceful degradation: the topology snapshot is empty and
//! binding operations do nothing.

mod affinity;
mod error;
mod primitive_types;
mod processor_set;
mod topology;

pub use affinity::{AffinityManager, WorkerPool};
pub use error::{Error, Result};
pub use primitive_types::{MAX_PROCESSORS, ProcessorId};
pub use processor_set::ProcessorSet;
pub use topology::{CpuTopology, LogicalProcessor};

mod pal;
