/// Errors that can occur in method channel operations.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// A method call or envelope could not be encoded.
    #[error("codec error: {0}")]
    Codec(#[from] platchan_codec::CodecError),

    /// The messenger rejected the operation.
    #[error("messenger error: {0}")]
    Messenger(#[from] platchan_messenger::MessengerError),

    /// The reply continuation was dropped before it ran.
    #[error("reply for {method} on {channel} was dropped")]
    ReplyDropped { channel: String, method: String },
}

pub type Result<T> = std::result::Result<T, ChannelError>;
