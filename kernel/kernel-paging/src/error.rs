/// Failure statuses returned across the paging subsystem.
///
/// Protection violations are deliberately absent: they are handled by
/// terminating the offending process, and the interrupted call reports
/// [`PagingError::ProcessTerminated`] instead of returning normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PagingError {
    /// No free backing-store slot, or no free frame and no eviction victim.
    #[error("no free backing-store slot or physical frame available")]
    ResourceExhausted,
    /// An index or page count outside the configured bounds.
    #[error("argument outside the configured bounds")]
    InvalidArgument,
    /// Lookup miss on a per-process slot or mapping.
    #[error("no mapping registered for the process")]
    NotFound,
    /// The offending process was terminated before the call returned.
    #[error("offending process was terminated")]
    ProcessTerminated,
}
