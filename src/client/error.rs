// ABOUTME: SMPP session error types covering transport, codec, remote and state failures
// ABOUTME: Provides structured error reporting with automatic conversion from lower layer errors

use crate::client::state::SessionState;
use crate::codec::CodecError;
use crate::datatypes::{CommandId, CommandStatus};
use crate::segmentation::SegmentationError;
use std::io;
use thiserror::Error;

/// Error type for SMPP session operations
#[derive(Debug, Error)]
pub enum SmppError {
    /// I/O error on the transport (connect, read, write)
    #[error("Connection error: {0}")]
    Connection(#[from] io::Error),

    /// A PDU could not be encoded, or a matched response could not be decoded
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// The peer answered with a non-zero command_status or a generic_nack
    #[error("Remote error: {0}")]
    RemoteError(CommandStatus),

    /// The operation is not allowed in the current session state.
    /// Nothing was written to the transport.
    #[error("Cannot send {operation:?} while {state}")]
    InvalidSessionState {
        operation: CommandId,
        state: SessionState,
    },

    /// The transport is gone; the request will never be answered
    #[error("Session closed")]
    SessionClosed,

    /// No response within the configured timeout
    #[error("Operation timeout")]
    Timeout,

    /// Response type does not fit the request
    #[error("Unexpected PDU: expected {expected:?}, got {actual:?}")]
    UnexpectedPdu {
        expected: CommandId,
        actual: CommandId,
    },

    #[error("Segmentation error: {0}")]
    Segmentation(#[from] SegmentationError),

    /// Data validation error (missing message fields, malformed addresses, etc.)
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type alias for SMPP operations
pub type SmppResult<T> = Result<T, SmppError>;

impl SmppError {
    /// The command_status the peer reported, if this error came from the peer
    pub fn remote_status(&self) -> Option<CommandStatus> {
        match self {
            SmppError::RemoteError(status) => Some(*status),
            _ => None,
        }
    }
}
