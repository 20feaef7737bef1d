//! Error types for the session layer
//!
//! The session operations themselves are best-effort and return
//! nothing; errors only arise at the edges, when parsing identities
//! supplied from outside.

use std::fmt;

/// Error type for session-layer parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Peer identity parsing errors
    InvalidPeerId {
        message: String,
    },

    /// Content key parsing errors
    InvalidKey {
        message: String,
    },
}

impl SessionError {
    /// Create a new InvalidPeerId error
    pub fn invalid_peer_id(message: impl Into<String>) -> Self {
        SessionError::InvalidPeerId {
            message: message.into(),
        }
    }

    /// Create a new InvalidKey error
    pub fn invalid_key(message: impl Into<String>) -> Self {
        SessionError::InvalidKey {
            message: message.into(),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::InvalidPeerId { message } => {
                write!(f, "Invalid peer id: {}", message)
            }
            SessionError::InvalidKey { message } => {
                write!(f, "Invalid key: {}", message)
            }
        }
    }
}

impl std::error::Error for SessionError {}
