//! Object identifiers
//!
//! Provides [`ObjectId`], the opaque key every record of a project file is
//! stored under, and [`PbxIdentifier`], the structured 24-digit hexadecimal
//! form Xcode writes for the identifiers it generates.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Opaque identifier of one record in a project file
///
/// Equality, ordering and hashing follow the raw string value, so two
/// identifiers with the same text are interchangeable. The empty string is
/// reserved as the null identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    /// Wrap a raw identifier string
    #[inline]
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The reserved null identifier
    #[inline]
    #[must_use]
    pub fn null() -> Self {
        Self(String::new())
    }

    /// Generate a random identifier in Xcode's 24-digit form
    #[inline]
    #[must_use]
    pub fn random() -> Self {
        PbxIdentifier::random().to_object_id()
    }

    /// True for the reserved null identifier
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw string value
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the raw string value
    #[inline]
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ObjectId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for ObjectId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Structured identifier: 12 bytes written as 24 hexadecimal digits
///
/// # Layout
/// - bytes `0..4`: origin (user and process in Xcode's scheme)
/// - bytes `4..8`: big-endian sequence counter
/// - bytes `8..12`: host and time salt
///
/// Fresh identifiers derived from an existing one keep origin and salt and
/// step the sequence, which keeps generated identifiers readable and
/// diff-friendly next to the ones around them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PbxIdentifier([u8; 12]);

impl PbxIdentifier {
    /// Number of hexadecimal digits in the textual form
    pub const TEXT_LEN: usize = 24;

    /// Create from raw bytes
    #[inline]
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// Random identifier drawn from a v4 UUID
    #[must_use]
    pub fn random() -> Self {
        let uuid = Uuid::new_v4();
        let mut bytes = [0u8; 12];
        bytes.copy_from_slice(&uuid.as_bytes()[..12]);
        Self(bytes)
    }

    /// Raw bytes
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }

    /// Sequence counter (bytes 4..8, big endian)
    #[inline]
    #[must_use]
    pub fn sequence(&self) -> u32 {
        u32::from_be_bytes([self.0[4], self.0[5], self.0[6], self.0[7]])
    }

    /// Same origin and salt with a different sequence counter
    #[inline]
    #[must_use]
    pub fn with_sequence(&self, sequence: u32) -> Self {
        let mut bytes = self.0;
        bytes[4..8].copy_from_slice(&sequence.to_be_bytes());
        Self(bytes)
    }

    /// Identifier `step` positions further along the sequence (wrapping)
    #[inline]
    #[must_use]
    pub fn successor(&self, step: u32) -> Self {
        self.with_sequence(self.sequence().wrapping_add(step))
    }

    /// Uppercase textual form as an [`ObjectId`]
    #[inline]
    #[must_use]
    pub fn to_object_id(&self) -> ObjectId {
        ObjectId(hex::encode_upper(self.0))
    }
}

impl Display for PbxIdentifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}

impl FromStr for PbxIdentifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != Self::TEXT_LEN {
            return Err(IdentifierError::Length(s.len()));
        }
        let mut bytes = [0u8; 12];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| IdentifierError::NotHex(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl TryFrom<&ObjectId> for PbxIdentifier {
    type Error = IdentifierError;

    fn try_from(value: &ObjectId) -> Result<Self, Self::Error> {
        value.as_str().parse()
    }
}

/// Errors for structured identifier parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    /// Wrong number of characters
    #[error("structured identifier must be 24 hex digits, got {0} characters")]
    Length(usize),

    /// Non-hexadecimal characters
    #[error("structured identifier is not hexadecimal: {0}")]
    NotHex(String),
}
