//! Error types for the Trellis core crate.

use std::fmt;

/// The main error type for Trellis core operations.
#[derive(Debug)]
pub enum CoreError {
    /// Background executor error.
    Executor(ExecutorError),
    /// UI queue error.
    UiQueue(UiQueueError),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Executor(err) => write!(f, "Executor error: {err}"),
            Self::UiQueue(err) => write!(f, "UI queue error: {err}"),
        }
    }
}

impl std::error::Error for CoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Executor(err) => Some(err),
            Self::UiQueue(err) => Some(err),
        }
    }
}

/// Errors raised by the background executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    /// The executor has been shut down and no longer accepts work.
    ShutDown,
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShutDown => write!(f, "Executor has been shut down"),
        }
    }
}

impl std::error::Error for ExecutorError {}

impl From<ExecutorError> for CoreError {
    fn from(err: ExecutorError) -> Self {
        Self::Executor(err)
    }
}

/// Errors raised by the UI task queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiQueueError {
    /// No UI queue has been installed for this process.
    NotInstalled,
    /// The UI queue's receiving side has been dropped.
    Disconnected,
}

impl fmt::Display for UiQueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInstalled => write!(f, "No UI queue has been installed"),
            Self::Disconnected => write!(f, "The UI queue has been disconnected"),
        }
    }
}

impl std::error::Error for UiQueueError {}

impl From<UiQueueError> for CoreError {
    fn from(err: UiQueueError) -> Self {
        Self::UiQueue(err)
    }
}

/// A specialized Result type for Trellis core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
