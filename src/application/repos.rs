//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::PostRecord;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("failed to encode post collection: {message}")]
    Encoding { message: String },
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn encoding(err: impl std::fmt::Display) -> Self {
        Self::Encoding {
            message: err.to_string(),
        }
    }
}

/// Whole-collection storage for posts.
///
/// There is no partial access: `load` returns every post in stored order and
/// `save` replaces everything that was stored before.
#[async_trait]
pub trait PostsStore: Send + Sync {
    async fn load(&self) -> Result<Vec<PostRecord>, RepoError>;

    async fn save(&self, posts: &[PostRecord]) -> Result<(), RepoError>;
}
