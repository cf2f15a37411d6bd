use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::{Error, Result};

const SCRATCH_DIR: &str = ".scratch";

/// An upload buffered to disk before it is committed. The file is removed
/// when the value is dropped.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    sha256_digest: String,
    size: u64,
}

impl ScratchFile {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn sha256_digest(&self) -> &str {
        &self.sha256_digest
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove scratch file {}: {e}", self.path.display()),
        }
    }
}

/// Streams an upload into a scratch file, hashing as it goes.
pub struct ScratchWriter {
    file: File,
    hasher: Sha256,
    scratch: ScratchFile,
}

impl ScratchWriter {
    pub async fn write(&mut self, chunk: &[u8]) -> Result<()> {
        self.file.write_all(chunk).await?;
        self.hasher.update(chunk);
        self.scratch.size += chunk.len() as u64;
        Ok(())
    }

    pub async fn finish(mut self) -> Result<ScratchFile> {
        self.file.flush().await?;
        self.file.sync_all().await?;
        self.scratch.sha256_digest = hex::encode(self.hasher.finalize());
        Ok(self.scratch)
    }
}

/// Distribution files on disk, laid out as `<directory>/<relative_path>/<filename>`.
#[derive(Debug, Clone)]
pub struct PackageStorage {
    base_path: PathBuf,
}

impl PackageStorage {
    pub fn new(directory: &Path) -> Self {
        Self {
            base_path: directory.to_path_buf(),
        }
    }

    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn scratch_dir(&self) -> PathBuf {
        self.base_path.join(SCRATCH_DIR)
    }

    pub async fn scratch(&self) -> Result<ScratchWriter> {
        let dir = self.scratch_dir();
        fs::create_dir_all(&dir).await?;

        let path = dir.join(Uuid::new_v4().to_string());
        let file = File::create(&path).await?;

        Ok(ScratchWriter {
            file,
            hasher: Sha256::new(),
            scratch: ScratchFile {
                path,
                sha256_digest: String::new(),
                size: 0,
            },
        })
    }

    pub async fn scratch_from_bytes(&self, data: &[u8]) -> Result<ScratchFile> {
        let mut writer = self.scratch().await?;
        writer.write(data).await?;
        writer.finish().await
    }

    /// Moves the scratch content to its final location: copy to a temporary
    /// sibling, fsync, then rename into place.
    pub async fn commit(
        &self,
        scratch: &ScratchFile,
        relative_path: &str,
        filename: &str,
    ) -> Result<PathBuf> {
        let final_path = self.file_path(relative_path, filename)?;
        let dir = final_path
            .parent()
            .ok_or_else(|| Error::validation("invalid relative path"))?;
        fs::create_dir_all(dir).await?;

        let temp_path = dir.join(format!(".{}.tmp", Uuid::new_v4()));
        let result = async {
            fs::copy(&scratch.path, &temp_path).await?;
            OpenOptions::new()
                .write(true)
                .open(&temp_path)
                .await?
                .sync_all()
                .await?;
            fs::rename(&temp_path, &final_path).await
        }
        .await;

        if let Err(e) = result {
            let _ = fs::remove_file(&temp_path).await;
            return Err(Error::Io(e));
        }

        Ok(final_path)
    }

    pub async fn open(&self, relative_path: &str, filename: &str) -> Result<(File, u64)> {
        let path = self.file_path(relative_path, filename)?;
        let file = File::open(&path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                Error::Missing("file")
            } else {
                Error::Io(e)
            }
        })?;
        let size = file.metadata().await?.len();
        Ok((file, size))
    }

    fn file_path(&self, relative_path: &str, filename: &str) -> Result<PathBuf> {
        validate_filename(filename)?;
        let mut path = self.base_path.clone();
        for component in relative_path.split('/') {
            validate_filename(component)
                .map_err(|_| Error::validation("invalid relative path"))?;
            path.push(component);
        }
        path.push(filename);
        Ok(path)
    }
}

/// A random `aa/aabb/<rest>` directory derived from the hex SHA-256 of 32
/// random bytes. Never derived from the filename.
#[must_use]
pub fn generate_relative_path() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    let hash = hex::encode(Sha256::digest(bytes));
    format!("{}/{}/{}", &hash[..2], &hash[..4], &hash[4..])
}

/// A filename must be one non-empty path component.
pub fn validate_filename(filename: &str) -> Result<()> {
    if filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\', '\0'])
    {
        return Err(Error::validation("invalid filename"));
    }
    Ok(())
}
