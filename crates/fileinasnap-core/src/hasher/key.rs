use super::digest::digest_bytes;
use crate::model::FileDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the exact-match pass derives a grouping key when no hash is supplied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStrategy {
    /// Supplied hash, else a blake3 digest of the content sample, else the surrogate.
    #[default]
    Digest,
    /// Supplied hash, else the `name|size|mimeType` surrogate. Content is ignored.
    Surrogate,
}

/// Exact-match grouping key. Keys of different kinds never compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContentKey {
    Supplied(String),
    /// Size is part of the key since the content may only be a sample of the file.
    Digest { hex: String, size: u64 },
    /// Weak stand-in used when nothing about the content is known.
    Surrogate(String),
}

impl ContentKey {
    pub fn for_file(file: &FileDescriptor, strategy: KeyStrategy) -> Self {
        let supplied = file.hash.trim();
        if !supplied.is_empty() {
            return ContentKey::Supplied(supplied.to_string());
        }

        match strategy {
            KeyStrategy::Digest if !file.content.is_empty() => ContentKey::Digest {
                hex: digest_bytes(file.content.as_bytes()),
                size: file.size,
            },
            _ => ContentKey::Surrogate(surrogate_key(file)),
        }
    }

    pub fn is_surrogate(&self) -> bool {
        matches!(self, ContentKey::Surrogate(_))
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKey::Supplied(hash) => write!(f, "hash:{}", hash),
            ContentKey::Digest { hex, size } => write!(f, "blake3:{}:{}", hex, size),
            ContentKey::Surrogate(key) => write!(f, "surrogate:{}", key),
        }
    }
}

pub fn surrogate_key(file: &FileDescriptor) -> String {
    format!("{}|{}|{}", file.name, file.size, file.mime_type)
}
