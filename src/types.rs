//! Core identity types
//!
//! Opaque identities shared by every part of the session layer: remote
//! peers and the content keys they are asked for.

use crate::error::SessionError;
use std::fmt;

/// Remote peer identifier (20 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId(pub [u8; 20]);

impl PeerId {
    /// Create a new PeerId from bytes
    pub fn new(id: [u8; 20]) -> Self {
        Self(id)
    }

    /// Generate a random PeerId
    pub fn random() -> Self {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        let mut id = [0u8; 20];
        rng.fill(&mut id);
        Self(id)
    }

    /// Get the PeerId as bytes
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Get the PeerId as a hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a PeerId from a hex string
    pub fn from_hex(hex_str: &str) -> Result<Self, SessionError> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| SessionError::invalid_peer_id(format!("not a hex string: {}", e)))?;
        let len = bytes.len();
        let id: [u8; 20] = bytes
            .try_into()
            .map_err(|_| SessionError::invalid_peer_id(format!("expected 20 bytes, got {}", len)))?;
        Ok(Self(id))
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Content key identifying one block within a session (20 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key(pub [u8; 20]);

impl Key {
    /// Create a new Key from bytes
    pub fn new(key: [u8; 20]) -> Self {
        Self(key)
    }

    /// Derive the key for a block of data (SHA-1 digest)
    pub fn for_data(data: &[u8]) -> Self {
        use sha1::{Digest, Sha1};
        let mut hasher = Sha1::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Get the Key as bytes
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Get the Key as a hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a Key from a hex string
    pub fn from_hex(hex_str: &str) -> Result<Self, SessionError> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| SessionError::invalid_key(format!("not a hex string: {}", e)))?;
        let len = bytes.len();
        let key: [u8; 20] = bytes
            .try_into()
            .map_err(|_| SessionError::invalid_key(format!("expected 20 bytes, got {}", len)))?;
        Ok(Self(key))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
