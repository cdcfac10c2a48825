//! JSON state file stored at each folder root.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::dedup::FolderMap;

use super::{CacheEntry, CacheError, CacheResult, HashCache};

/// Layout version written by this build.
pub const STATE_FILE_VERSION: u32 = 1;

/// Envelope carrying an integrity checksum over the entries.
#[derive(Debug, Serialize, Deserialize)]
struct StateEnvelope {
    version: u32,
    /// SHA256 of the compact JSON of `entries`.
    checksum: String,
    entries: Vec<CacheEntry>,
}

/// [`HashCache`] backed by a JSON file named `file_name` in each folder root.
#[derive(Debug, Clone)]
pub struct StateFile {
    file_name: String,
}

impl StateFile {
    /// Create a backend using the given file name.
    #[must_use]
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }

    /// File name used in each folder root.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Location of the state file for a folder.
    #[must_use]
    pub fn path_for(&self, folder_root: &Path) -> PathBuf {
        folder_root.join(&self.file_name)
    }
}

fn checksum_of(entries: &[CacheEntry]) -> CacheResult<String> {
    // Compact form on both sides so the checksum is stable
    let json = serde_json::to_string(entries).map_err(CacheError::Serialize)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

impl HashCache for StateFile {
    fn load(&self, folder_root: &Path) -> CacheResult<Option<FolderMap>> {
        let path = self.path_for(folder_root);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(CacheError::Io { path, source }),
        };

        let envelope: StateEnvelope =
            serde_json::from_str(&content).map_err(|source| CacheError::Parse {
                path: path.clone(),
                source,
            })?;

        if envelope.version != STATE_FILE_VERSION {
            return Err(CacheError::UnsupportedVersion {
                path,
                found: envelope.version,
                expected: STATE_FILE_VERSION,
            });
        }

        if checksum_of(&envelope.entries)? != envelope.checksum {
            return Err(CacheError::ChecksumMismatch(path));
        }

        let mut pairs = Vec::with_capacity(envelope.entries.len());
        for entry in envelope.entries {
            let digest = entry.digest.clone();
            let pair = entry
                .into_record()
                .ok_or_else(|| CacheError::InvalidDigest {
                    path: path.clone(),
                    digest,
                })?;
            if !pair.1.source_path.exists() {
                log::warn!(
                    "File referenced in {} no longer exists: {}",
                    path.display(),
                    pair.1.source_path.display()
                );
            }
            pairs.push(pair);
        }

        log::debug!("Loaded {} entries from {}", pairs.len(), path.display());
        Ok(Some(FolderMap::from_entries(pairs)))
    }

    fn save(&self, folder_root: &Path, map: &FolderMap) -> CacheResult<()> {
        let path = self.path_for(folder_root);
        let entries: Vec<CacheEntry> = map
            .iter()
            .map(|(digest, record)| CacheEntry::from_record(digest, record))
            .collect();
        let envelope = StateEnvelope {
            version: STATE_FILE_VERSION,
            checksum: checksum_of(&entries)?,
            entries,
        };
        let json = serde_json::to_string_pretty(&envelope).map_err(CacheError::Serialize)?;

        let mut file = File::create(&path).map_err(|source| CacheError::Io {
            path: path.clone(),
            source,
        })?;
        file.write_all(json.as_bytes())
            .map_err(|source| CacheError::Io {
                path: path.clone(),
                source,
            })?;

        log::debug!("Stored {} entries in {}", map.len(), path.display());
        Ok(())
    }
}
