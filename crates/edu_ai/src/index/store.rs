use std::fs;
use std::path::{Path, PathBuf};

use edu_core::error::{codes, AppError};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use super::{IndexEntry, IndexManifest, VectorIndex, INDEX_FORMAT_VERSION};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const ENTRIES_FILE: &str = "entries.json";

fn sibling(dir: &Path, suffix: &str) -> PathBuf {
    let mut name = dir
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "index".into());
    name.push(suffix);
    dir.with_file_name(name)
}

fn staging_dir(dir: &Path) -> PathBuf {
    sibling(dir, ".save_tmp")
}

fn previous_dir(dir: &Path) -> PathBuf {
    sibling(dir, ".pre_save")
}

fn save_err(message: &str, details: String) -> AppError {
    AppError::new(codes::INDEX_SAVE_FAILED, message.to_string()).with_details(details)
}

fn corrupt(message: &str, details: String) -> AppError {
    AppError::new(codes::INDEX_CORRUPT, message.to_string()).with_details(details)
}

impl VectorIndex {
    /// Persist to `dir`, replacing whatever is there.
    ///
    /// Everything is written to a staging directory first; the previous index is only
    /// moved aside once the new one is complete, so a crash mid-save leaves the old
    /// index (or its `.pre_save` copy) loadable.
    pub fn save(&self, dir: &Path) -> Result<(), AppError> {
        let staging = staging_dir(dir);
        if staging.exists() {
            fs::remove_dir_all(&staging).map_err(|e| {
                save_err(
                    "Failed to clean stale staging directory",
                    format!("path={}; err={}", staging.display(), e),
                )
            })?;
        }
        fs::create_dir_all(&staging).map_err(|e| {
            save_err(
                "Failed to create staging directory",
                format!("path={}; err={}", staging.display(), e),
            )
        })?;

        let entries_json = serde_json::to_vec(&self.entries)
            .map_err(|e| save_err("Failed to encode index entries", e.to_string()))?;
        let mut manifest = self.manifest.clone();
        manifest.entries_sha256 = Some(hex::encode(Sha256::digest(&entries_json)));
        let manifest_json = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| save_err("Failed to encode index manifest", e.to_string()))?;

        // Manifest last: a staged directory without one is never mistaken for an index.
        for (name, bytes) in [(ENTRIES_FILE, &entries_json), (MANIFEST_FILE, &manifest_json)] {
            let path = staging.join(name);
            fs::write(&path, bytes).map_err(|e| {
                save_err(
                    "Failed to write index file",
                    format!("path={}; err={}", path.display(), e),
                )
            })?;
        }

        if let Some(parent) = dir.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                save_err(
                    "Failed to create index parent directory",
                    format!("path={}; err={}", parent.display(), e),
                )
            })?;
        }

        let previous = previous_dir(dir);
        if dir.exists() {
            if previous.exists() {
                fs::remove_dir_all(&previous).map_err(|e| {
                    save_err(
                        "Failed to remove previous pre_save directory",
                        format!("path={}; err={}", previous.display(), e),
                    )
                })?;
            }
            fs::rename(dir, &previous).map_err(|e| {
                save_err(
                    "Failed to move existing index out of the way",
                    format!("src={} dst={}: {}", dir.display(), previous.display(), e),
                )
            })?;
        }
        fs::rename(&staging, dir).map_err(|e| {
            save_err(
                "Failed to move new index into place",
                format!("src={} dst={}: {}", staging.display(), dir.display(), e),
            )
        })?;

        if previous.exists() {
            if let Err(e) = fs::remove_dir_all(&previous) {
                warn!(path = %previous.display(), error = %e, "could not remove replaced index");
            }
        }

        info!(
            path = %dir.display(),
            entries = manifest.entry_count,
            dims = manifest.dims,
            model = %manifest.embedding_model,
            "index saved"
        );
        Ok(())
    }

    /// Load from `dir`. No manifest is `INDEX_NOT_FOUND`; anything that does not decode or
    /// verify is `INDEX_CORRUPT`.
    pub fn load(dir: &Path) -> Result<Self, AppError> {
        let mut root = dir.to_path_buf();
        if !root.join(MANIFEST_FILE).is_file() {
            // Crash between moving the old index aside and moving the new one in.
            let previous = previous_dir(dir);
            if !dir.exists() && previous.join(MANIFEST_FILE).is_file() {
                warn!(path = %previous.display(), "recovering index from pre_save copy");
                root = previous;
            } else {
                return Err(AppError::new(
                    codes::INDEX_NOT_FOUND,
                    "No index found; run ingestion before querying",
                )
                .with_details(format!("path={}", dir.display())));
            }
        }

        let manifest_path = root.join(MANIFEST_FILE);
        let manifest_raw = fs::read(&manifest_path).map_err(|e| {
            corrupt(
                "Failed to read index manifest",
                format!("path={}; err={}", manifest_path.display(), e),
            )
        })?;
        let manifest: IndexManifest = serde_json::from_slice(&manifest_raw).map_err(|e| {
            corrupt(
                "Failed to decode index manifest",
                format!("path={}; err={}", manifest_path.display(), e),
            )
        })?;
        if manifest.format_version != INDEX_FORMAT_VERSION {
            return Err(corrupt(
                "Unsupported index format version",
                format!(
                    "expected={INDEX_FORMAT_VERSION}; got={}",
                    manifest.format_version
                ),
            ));
        }

        let entries_path = root.join(ENTRIES_FILE);
        let entries_raw = fs::read(&entries_path).map_err(|e| {
            corrupt(
                "Failed to read index entries",
                format!("path={}; err={}", entries_path.display(), e),
            )
        })?;
        let actual_sha = hex::encode(Sha256::digest(&entries_raw));
        if manifest.entries_sha256.as_deref() != Some(actual_sha.as_str()) {
            return Err(corrupt(
                "Index entries checksum mismatch",
                format!(
                    "expected={}; actual={actual_sha}",
                    manifest.entries_sha256.as_deref().unwrap_or("none")
                ),
            ));
        }
        let entries: Vec<IndexEntry> = serde_json::from_slice(&entries_raw).map_err(|e| {
            corrupt(
                "Failed to decode index entries",
                format!("path={}; err={}", entries_path.display(), e),
            )
        })?;

        if entries.is_empty() || entries.len() != manifest.entry_count as usize {
            return Err(corrupt(
                "Index entry count does not match manifest",
                format!("manifest={}; entries={}", manifest.entry_count, entries.len()),
            ));
        }
        if let Some(bad) = entries
            .iter()
            .find(|e| e.vector.len() != manifest.dims as usize)
        {
            return Err(corrupt(
                "Index vector dims do not match manifest",
                format!(
                    "expected={}; got={}; chunk_id={}",
                    manifest.dims,
                    bad.vector.len(),
                    bad.chunk_id
                ),
            ));
        }

        info!(
            path = %root.display(),
            entries = entries.len(),
            dims = manifest.dims,
            model = %manifest.embedding_model,
            "index loaded"
        );
        Ok(Self::from_parts(manifest, entries))
    }
}
