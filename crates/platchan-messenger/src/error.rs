/// Errors that can occur in messenger operations.
#[derive(Debug, thiserror::Error)]
pub enum MessengerError {
    /// The worker thread for a task queue could not be started.
    #[error("failed to spawn task queue {name}: {source}")]
    Spawn {
        name: String,
        source: std::io::Error,
    },

    /// The task queue's worker is gone and no longer accepts tasks.
    #[error("task queue {0} is closed")]
    QueueClosed(String),

    /// A control message could not be encoded or decoded.
    #[error("control message error: {0}")]
    Codec(#[from] platchan_codec::CodecError),

    /// A control message had an unexpected method or argument shape.
    #[error("invalid control message: {0}")]
    InvalidControl(String),
}

pub type Result<T> = std::result::Result<T, MessengerError>;
