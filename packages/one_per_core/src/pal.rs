//! Platform Abstraction Layer (PAL). Private API; everything OS-specific lives behind the
//! [`Platform`] trait so that topology and affinity logic stay platform-neutral and testable.

mod abstractions;
pub(crate) use abstractions::*;

mod facade;
pub(crate) use facade::*;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub(crate) use linux::*;

// On operating systems without native support we fall back to graceful degradation: no
// inventory, no affinity control, but everything still runs.
#[cfg(not(target_os = "linux"))]
mod fallback;
#[cfg(not(target_os = "linux"))]
pub(crate) use fallback::*;
