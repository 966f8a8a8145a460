//! Error types shared across the engine.

use std::error::Error;
use std::fmt::{self, Formatter};

use crate::attributes::AttributeKey;

/// Errors produced by attribute lookups and channel access.
///
/// Modifier and cue evaluation paths never surface these: an unknown
/// attribute there degrades to a per-item no-op as the runtime contract
/// requires. The error form is for direct host access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeError {
    /// No attribute with the given key exists on the entity.
    UnknownAttribute(AttributeKey),
    /// A modifier addressed an aggregation channel the attribute does not have.
    ChannelOutOfRange { channel: usize, channels: usize },
}

impl fmt::Display for AttributeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AttributeError::UnknownAttribute(key) => {
                write!(f, "attribute '{key}' not present on entity")
            }
            AttributeError::ChannelOutOfRange { channel, channels } => {
                write!(
                    f,
                    "channel {channel} out of range for attribute with {channels} channels"
                )
            }
        }
    }
}

impl Error for AttributeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats() {
        let err = AttributeError::ChannelOutOfRange {
            channel: 3,
            channels: 1,
        };
        assert_eq!(
            err.to_string(),
            "channel 3 out of range for attribute with 1 channels"
        );
    }
}
