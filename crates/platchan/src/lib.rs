//! Flutter-compatible platform channel messaging.
//!
//! platchan lets host code and Dart code call named methods on each other
//! over an opaque binary transport, with the same wire formats the Flutter
//! framework uses.
//!
//! # Crate Structure
//!
//! - [`codec`]: `Value`, method calls, envelopes, standard and JSON codecs
//! - [`messenger`]: Binary messenger contract, task queues, in-process pair
//! - [`channel`]: Method channels and result sinks
//! - [`systemchannels`]: Text input and mouse cursor channels (behind
//!   `systemchannels` feature)

/// Re-export codec types.
pub mod codec {
    pub use platchan_codec::*;
}

/// Re-export messenger types.
pub mod messenger {
    pub use platchan_messenger::*;
}

/// Re-export method channel types.
pub mod channel {
    pub use platchan_channel::*;
}

/// Re-export system channel types (requires `systemchannels` feature).
#[cfg(feature = "systemchannels")]
pub mod systemchannels {
    pub use platchan_systemchannels::*;
}
