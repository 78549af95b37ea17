use thiserror::Error;

/// Errors that can occur when resolving and binding processor cores.
///
/// Environmental failures (unreadable inventory, failed affinity syscalls) are absorbed with
/// safe defaults and never surface here; it is better to run unbound than to fail. The only
/// error kind is a contract violation by the caller, which by policy is unrecoverable: callers
/// are expected to treat it as fatal rather than retry or clamp.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The caller asked for a logical core index at or beyond the number of available
    /// physical cores.
    ///
    /// This indicates a logic error in the calling system, not an environmental condition.
    #[error(
        "logical core index {index} is out of range: only {available} physical cores are available"
    )]
    CoreIndexOutOfRange {
        /// The logical core index that was requested.
        index: usize,

        /// The number of physical cores actually available for binding.
        available: usize,
    },
}

/// A specialized `Result` type for core binding operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn out_of_range_is_error() {
        let error = Error::CoreIndexOutOfRange {
            index: 8,
            available: 4,
        };

        let result: Result<()> = Err(error);
        assert!(result.is_err());
    }

    #[test]
    fn out_of_range_message_names_both_quantities() {
        let error = Error::CoreIndexOutOfRange {
            index: 8,
            available: 4,
        };

        let message = error.to_string();
        assert!(message.contains('8'));
        assert!(message.contains('4'));
    }
}
