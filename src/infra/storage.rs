//! Flat-file post storage: the whole collection lives in one JSON array.

use std::{
    io::{self, ErrorKind, Write},
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::{fs, task};
use tracing::{info, warn};

use crate::{
    application::repos::{PostsStore, RepoError},
    domain::entities::PostRecord,
};

const STORAGE_TARGET: &str = "quill::storage";
const EMPTY_COLLECTION: &[u8] = b"[]";

/// JSON-file-backed [`PostsStore`].
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store for `path`, creating its parent directory if necessary.
    ///
    /// The file itself is created lazily by the first [`PostsStore::load`].
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, std::io::Error> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory that receives staged writes; it must share a filesystem with `path`.
    fn staging_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Atomically replace the file with `contents`.
    async fn replace_contents(&self, contents: Vec<u8>) -> Result<(), RepoError> {
        let dir = self.staging_dir();
        let path = self.path.clone();

        run_blocking(move || {
            let staged = stage_contents(&dir, &contents)?;
            staged.persist(&path).map_err(|err| err.error)?;
            Ok(())
        })
        .await
    }

    /// Create the file holding an empty collection unless something else got there
    /// first. Returns `false` when the file already existed.
    async fn initialize_empty(&self) -> Result<bool, RepoError> {
        let dir = self.staging_dir();
        let path = self.path.clone();

        run_blocking(move || {
            let staged = stage_contents(&dir, EMPTY_COLLECTION)?;
            match staged.persist_noclobber(&path) {
                Ok(_) => Ok(true),
                Err(err) if err.error.kind() == ErrorKind::AlreadyExists => Ok(false),
                Err(err) => Err(err.error),
            }
        })
        .await
    }

    fn decode(&self, data: &[u8]) -> Vec<PostRecord> {
        match serde_json::from_slice::<Vec<PostRecord>>(data) {
            Ok(posts) => posts,
            Err(err) => {
                warn!(
                    target: STORAGE_TARGET,
                    path = %self.path.display(),
                    error = %err,
                    "post collection is malformed; treating it as empty"
                );
                Vec::new()
            }
        }
    }
}

/// Write `contents` to a uniquely named temporary file inside `dir`.
fn stage_contents(dir: &Path, contents: &[u8]) -> io::Result<NamedTempFile> {
    let mut staged = tempfile::Builder::new()
        .prefix(".quill-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    staged.write_all(contents)?;
    staged.as_file().sync_all()?;
    Ok(staged)
}

async fn run_blocking<T, F>(work: F) -> Result<T, RepoError>
where
    F: FnOnce() -> io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(work)
        .await
        .map_err(RepoError::from_persistence)?
        .map_err(RepoError::from_persistence)
}

#[async_trait]
impl PostsStore for JsonFileStore {
    /// Missing files are initialised to an empty collection. Contents that do not
    /// decode as a post array are logged and treated as an empty collection.
    async fn load(&self) -> Result<Vec<PostRecord>, RepoError> {
        match fs::read(&self.path).await {
            Ok(data) => return Ok(self.decode(&data)),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(RepoError::from_persistence(err)),
        }

        if self.initialize_empty().await? {
            info!(
                target: STORAGE_TARGET,
                path = %self.path.display(),
                "initialised empty post collection"
            );
            return Ok(Vec::new());
        }

        // Another caller created or saved the file in the meantime.
        let data = fs::read(&self.path)
            .await
            .map_err(RepoError::from_persistence)?;
        Ok(self.decode(&data))
    }

    async fn save(&self, posts: &[PostRecord]) -> Result<(), RepoError> {
        let encoded = serde_json::to_vec_pretty(posts).map_err(RepoError::encoding)?;
        self.replace_contents(encoded).await
    }
}
