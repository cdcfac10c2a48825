//! SHA-256 file hasher with streaming support.
//!
//! # Overview
//! This module provides the [`Hasher`] struct for computing SHA-256 digests
//! of file contents without loading whole files into memory, and the
//! [`ContentDigest`] type used as the content identity across the crate.
//!
//! # Example
//!
//! ```no_run
//! use fdmerge::scanner::Hasher;
//! use std::path::Path;
//!
//! let hasher = Hasher::new();
//! let outcome = hasher.hash_file(Path::new("photo.jpg")).unwrap();
//! println!("{} ({:?})", outcome.digest, outcome.elapsed);
//! ```

use std::fmt;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use super::HashError;

/// Length of a content digest in bytes (256 bits).
pub const DIGEST_LEN: usize = 32;

/// Default read buffer for streaming hashes.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// SHA-256 digest of a file's full byte content.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentDigest([u8; DIGEST_LEN]);

impl ContentDigest {
    /// Wrap raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Digest of an in-memory byte slice.
    #[must_use]
    pub fn of_bytes(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Lowercase hexadecimal rendering (64 characters).
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a 64-character hexadecimal digest.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; DIGEST_LEN];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentDigest({})", self.to_hex())
    }
}

impl Serialize for ContentDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Digest plus the wall time spent producing it.
///
/// The elapsed time is diagnostic only; nothing decides on it.
#[derive(Debug, Clone, Copy)]
pub struct HashOutcome {
    /// Content digest
    pub digest: ContentDigest,
    /// Bytes read
    pub bytes: u64,
    /// Time spent reading and hashing
    pub elapsed: Duration,
}

/// Streaming SHA-256 hasher.
#[derive(Debug, Clone)]
pub struct Hasher {
    buffer_size: usize,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a hasher with the default 64 KiB read buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            shutdown_flag: None,
        }
    }

    /// Use a custom read buffer size (minimum 4 KiB).
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(4096);
        self
    }

    /// Stop hashing large files early when the flag is raised.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Hash a file's full content.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::NotFound`] if the file does not exist at the
    /// moment of hashing, [`HashError::PermissionDenied`] if it cannot be
    /// opened, [`HashError::Interrupted`] if shutdown was requested midway.
    pub fn hash_file(&self, path: &Path) -> Result<HashOutcome, HashError> {
        let start = Instant::now();
        let mut file = File::open(path).map_err(|e| map_io_error(path, e))?;

        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; self.buffer_size];
        let mut bytes = 0u64;
        loop {
            if self.is_shutdown_requested() {
                return Err(HashError::Interrupted);
            }
            let n = match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(map_io_error(path, e)),
            };
            hasher.update(&buffer[..n]);
            bytes += n as u64;
        }

        let digest = ContentDigest(hasher.finalize().into());
        Ok(HashOutcome {
            digest,
            bytes,
            elapsed: start.elapsed(),
        })
    }

    /// Hash a file and return only the digest.
    pub fn digest(&self, path: &Path) -> Result<ContentDigest, HashError> {
        self.hash_file(path).map(|outcome| outcome.digest)
    }
}

fn map_io_error(path: &Path, error: std::io::Error) -> HashError {
    match error.kind() {
        ErrorKind::NotFound => HashError::NotFound(path.to_path_buf()),
        ErrorKind::PermissionDenied => HashError::PermissionDenied(path.to_path_buf()),
        _ => HashError::Io {
            path: path.to_path_buf(),
            source: error,
        },
    }
}
