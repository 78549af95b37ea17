/// Identifies a specific logical processor.
///
/// This will match the numeric identifier used by standard tooling of the operating system.
///
/// It is important to highlight that the values used are not guaranteed to be sequential/contiguous
/// or to start from zero (aspects that are also not guaranteed by operating system tooling).
pub type ProcessorId = u32;

/// The maximum number of logical processors a [`ProcessorSet`][crate::ProcessorSet] can represent.
///
/// This matches the capacity of the operating system affinity mask (`CPU_SETSIZE` on Linux), so
/// every processor the OS can express in an affinity mask fits in a `ProcessorSet` and vice versa.
pub const MAX_PROCESSORS: usize = 1024;
