//! Error types.

use std::fmt;

/// Result with the crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by queue construction, enqueue and the observer registry.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A level was at capacity.
    #[error("queue full: {0}")]
    QueueFull(String),

    /// Invalid [`QueueConfig`](crate::QueueConfig).
    #[error("config error: {0}")]
    Config(String),

    /// An observer factory constructor was already installed.
    #[error("observer factory already registered")]
    AlreadyRegistered,
}

impl Error {
    /// Builds [`Error::QueueFull`].
    pub fn queue_full<S: Into<String>>(msg: S) -> Self {
        Error::QueueFull(msg.into())
    }

    /// Builds [`Error::Config`].
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }
}

/// Returned by a rejecting enqueue when the target level is at capacity.
///
/// Carries the rejected item back to the caller; nothing in the queue was
/// modified.
#[derive(thiserror::Error)]
#[error("priority level {level} is full, can't add item")]
pub struct QueueFullError<T> {
    /// The item that was not enqueued.
    pub item: T,
    /// Level that was full.
    pub level: usize,
}

impl<T> QueueFullError<T> {
    /// Takes the rejected item back.
    pub fn into_inner(self) -> T {
        self.item
    }
}

impl<T> fmt::Debug for QueueFullError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueFullError")
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}

impl<T> From<QueueFullError<T>> for Error {
    fn from(err: QueueFullError<T>) -> Self {
        Error::queue_full(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_full_converts() {
        let err = QueueFullError { item: 5u32, level: 2 };
        assert_eq!(err.to_string(), "priority level 2 is full, can't add item");

        let converted: Error = err.into();
        assert!(matches!(converted, Error::QueueFull(_)));
    }

    #[test]
    fn test_queue_full_returns_item() {
        let err = QueueFullError {
            item: String::from("job"),
            level: 0,
        };
        assert_eq!(err.into_inner(), "job");
    }
}
