//! Import/export of the post collection as a TOML archive.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;

use crate::{
    application::{error::AppError, posts::PostService},
    domain::{entities::PostRecord, posts::PostCollection},
    infra::error::InfraError,
};

const ARCHIVE_VERSION: u32 = 1;
/// TOML integers are signed 64-bit.
const ARCHIVE_INT_MAX: u64 = i64::MAX as u64;

#[derive(Debug, Serialize, Deserialize)]
struct PostArchive {
    version: u32,
    #[serde(default)]
    posts: Vec<PostRecord>,
}

/// Write every stored post to `path` as a TOML archive, returning the post count.
pub async fn export_posts(service: &PostService, path: &Path) -> Result<usize, AppError> {
    let posts = service.list().await?;
    ensure_archivable(&posts)?;
    let count = posts.len();
    let archive = PostArchive {
        version: ARCHIVE_VERSION,
        posts,
    };

    let encoded = toml::to_string_pretty(&archive)
        .map_err(|err| AppError::unexpected(format!("failed to encode archive: {err}")))?;
    fs::write(path, encoded)
        .await
        .map_err(|err| AppError::from(InfraError::Io(err)))?;

    info!(
        target: "quill::archive",
        path = %path.display(),
        posts = count,
        "archive written"
    );
    Ok(count)
}

fn ensure_archivable(posts: &[PostRecord]) -> Result<(), AppError> {
    for post in posts {
        if post.id > ARCHIVE_INT_MAX {
            return Err(AppError::validation(format!(
                "post id {} exceeds the archive integer limit {ARCHIVE_INT_MAX}",
                post.id
            )));
        }
        if post.likes > ARCHIVE_INT_MAX {
            return Err(AppError::validation(format!(
                "post {} has {} likes, above the archive integer limit {ARCHIVE_INT_MAX}",
                post.id, post.likes
            )));
        }
    }
    Ok(())
}

/// Replace the stored collection with the posts held in the archive at `path`.
///
/// Unlike the storage file, an archive is parsed strictly: a malformed archive,
/// an unknown version or duplicate ids abort the import without touching storage.
pub async fn import_posts(service: &PostService, path: &Path) -> Result<usize, AppError> {
    let data = fs::read_to_string(path)
        .await
        .map_err(|err| AppError::from(InfraError::Io(err)))?;
    let archive: PostArchive = toml::from_str(&data)
        .map_err(|err| AppError::validation(format!("invalid archive: {err}")))?;

    if archive.version != ARCHIVE_VERSION {
        return Err(AppError::validation(format!(
            "unsupported archive version {} (expected {ARCHIVE_VERSION})",
            archive.version
        )));
    }

    let collection = PostCollection::new(archive.posts);
    let count = collection.len();
    service.replace_all(collection).await?;

    info!(
        target: "quill::archive",
        path = %path.display(),
        posts = count,
        "archive imported"
    );
    Ok(count)
}
