use std::fmt::{self, Debug, Display};

use crate::{MAX_PROCESSORS, ProcessorId};

const WORDS: usize = MAX_PROCESSORS / 64;

/// A fixed-capacity set of logical processor IDs.
///
/// This is the crate's representation of an OS affinity mask: the set of processors a thread is
/// permitted to run on. Capacity is [`MAX_PROCESSORS`]; inserting an ID at or beyond the capacity
/// is ignored because the OS mask cannot represent such a processor either.
///
/// # Example
///
/// ```
/// use one_per_core::ProcessorSet;
///
/// let mut set = ProcessorSet::default();
/// set.insert(0);
/// set.insert(2);
///
/// assert!(set.contains(0));
/// assert!(!set.contains(1));
/// assert_eq!(set.len(), 2);
/// ```
#[derive(Clone, Copy, Default, Eq, PartialEq)]
pub struct ProcessorSet {
    words: [u64; WORDS],
}

impl ProcessorSet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self { words: [0; WORDS] }
    }

    /// Creates a set containing every ID in `0..count`.
    #[must_use]
    pub fn first_n(count: u32) -> Self {
        let mut set = Self::new();

        for id in 0..count {
            set.insert(id);
        }

        set
    }

    /// Adds a processor ID to the set. Adding an ID that is already present has no effect.
    ///
    /// IDs at or beyond [`MAX_PROCESSORS`] are silently ignored.
    pub fn insert(&mut self, id: ProcessorId) {
        let index = id as usize;

        if index >= MAX_PROCESSORS {
            return;
        }

        // Whole-number division and remainder on an in-range index cannot misbehave.
        self.words[index / 64] |= 1 << (index % 64);
    }

    /// Whether the set contains the given processor ID.
    ///
    /// IDs at or beyond [`MAX_PROCESSORS`] are never contained.
    #[must_use]
    pub fn contains(&self, id: ProcessorId) -> bool {
        let index = id as usize;

        if index >= MAX_PROCESSORS {
            return false;
        }

        self.words[index / 64] & (1 << (index % 64)) != 0
    }

    /// The number of processor IDs in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Whether the set contains no processor IDs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|word| *word == 0)
    }

    /// Iterates over the processor IDs in the set, in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = ProcessorId> + '_ {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "MAX_PROCESSORS fits in u32"
        )]
        let capacity = MAX_PROCESSORS as ProcessorId;

        (0..capacity).filter(|id| self.contains(*id))
    }
}

impl Display for ProcessorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", cpulist::emit(self.iter()))
    }
}

impl Debug for ProcessorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ProcessorSet")
            .field(&cpulist::emit(self.iter()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoke_test() {
        let mut set = ProcessorSet::new();
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);

        set.insert(0);
        set.insert(7);
        set.insert(63);
        set.insert(64);

        assert!(set.contains(0));
        assert!(set.contains(7));
        assert!(set.contains(63));
        assert!(set.contains(64));
        assert!(!set.contains(1));
        assert_eq!(set.len(), 4);
        assert!(!set.is_empty());
    }

    #[test]
    fn insert_is_idempotent() {
        let mut set = ProcessorSet::new();

        set.insert(5);
        set.insert(5);

        assert_eq!(set.len(), 1);
    }

    #[test]
    fn out_of_capacity_ids_are_ignored() {
        let mut set = ProcessorSet::new();

        #[expect(
            clippy::cast_possible_truncation,
            reason = "MAX_PROCESSORS fits in u32"
        )]
        set.insert(MAX_PROCESSORS as ProcessorId);
        set.insert(u32::MAX);

        assert!(set.is_empty());
        assert!(!set.contains(u32::MAX));
    }

    #[test]
    fn iterates_in_ascending_order() {
        let mut set = ProcessorSet::new();

        set.insert(130);
        set.insert(2);
        set.insert(65);

        let ids: Vec<_> = set.iter().collect();
        assert_eq!(ids, vec![2, 65, 130]);
    }

    #[test]
    fn first_n_contains_exactly_the_prefix() {
        let set = ProcessorSet::first_n(4);

        assert_eq!(set.len(), 4);
        assert!(set.contains(0));
        assert!(set.contains(3));
        assert!(!set.contains(4));
    }

    #[test]
    fn display_uses_cpulist_format() {
        let mut set = ProcessorSet::new();

        set.insert(0);
        set.insert(1);
        set.insert(2);
        set.insert(5);

        assert_eq!(set.to_string(), "0-2,5");
    }
}
