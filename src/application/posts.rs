//! Post operations expressed as load → mutate → save cycles over the whole collection.

use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::application::repos::{PostsStore, RepoError};
use crate::domain::{
    entities::{PostDraft, PostRecord},
    error::DomainError,
    posts::PostCollection,
};

const POSTS_TARGET: &str = "quill::posts";

#[derive(Debug, Error)]
pub enum PostServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn PostsStore>,
    write_lock: Arc<Mutex<()>>,
}

impl PostService {
    pub fn new(store: Arc<dyn PostsStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn list(&self) -> Result<Vec<PostRecord>, PostServiceError> {
        Ok(self.store.load().await?)
    }

    pub async fn find(&self, id: u64) -> Result<Option<PostRecord>, PostServiceError> {
        let collection = PostCollection::new(self.store.load().await?);
        Ok(collection.find(id).cloned())
    }

    pub async fn create(&self, draft: PostDraft) -> Result<PostRecord, PostServiceError> {
        let created = self
            .mutate(|collection| collection.append(draft).cloned())
            .await?;

        counter!("quill_posts_created_total").increment(1);
        info!(target: POSTS_TARGET, post_id = created.id, "post created");
        Ok(created)
    }

    /// Replace the text fields of an existing post. Unknown ids are reported
    /// as [`DomainError::PostNotFound`] and leave storage untouched.
    pub async fn update(&self, id: u64, draft: PostDraft) -> Result<PostRecord, PostServiceError> {
        let updated = self
            .mutate(|collection| collection.update_content(id, draft).cloned())
            .await?;

        counter!("quill_posts_updated_total").increment(1);
        info!(target: POSTS_TARGET, post_id = id, "post updated");
        Ok(updated)
    }

    /// Remove the post with `id`, returning whether anything was removed.
    ///
    /// The collection is saved either way.
    pub async fn delete(&self, id: u64) -> Result<bool, PostServiceError> {
        let removed = self.mutate(|collection| Ok(collection.remove(id))).await?;

        if removed == 0 {
            debug!(target: POSTS_TARGET, post_id = id, "delete matched no post");
            return Ok(false);
        }

        counter!("quill_posts_deleted_total").increment(1);
        info!(target: POSTS_TARGET, post_id = id, "post deleted");
        Ok(true)
    }

    /// Add one like to the post with `id`, returning the new count.
    ///
    /// The collection is saved even when no post matched.
    pub async fn like(&self, id: u64) -> Result<Option<u64>, PostServiceError> {
        let likes = self.mutate(|collection| Ok(collection.like(id))).await?;

        match likes {
            Some(likes) => {
                counter!("quill_posts_liked_total").increment(1);
                info!(target: POSTS_TARGET, post_id = id, likes, "post liked");
            }
            None => debug!(target: POSTS_TARGET, post_id = id, "like matched no post"),
        }

        Ok(likes)
    }

    /// Swap the stored collection for `collection` wholesale.
    pub async fn replace_all(&self, collection: PostCollection) -> Result<(), PostServiceError> {
        collection.validate_unique_ids()?;

        let _guard = self.write_lock.lock().await;
        self.store.save(collection.as_slice()).await?;
        info!(
            target: POSTS_TARGET,
            posts = collection.len(),
            "post collection replaced"
        );
        Ok(())
    }

    /// Run `apply` against a freshly loaded collection and persist the result.
    ///
    /// The write lock spans the whole cycle so concurrent mutations within this
    /// process cannot overwrite one another. Nothing is saved when `apply` fails.
    async fn mutate<T, F>(&self, apply: F) -> Result<T, PostServiceError>
    where
        F: FnOnce(&mut PostCollection) -> Result<T, DomainError>,
    {
        let _guard = self.write_lock.lock().await;

        let mut collection = PostCollection::new(self.store.load().await?);
        let outcome = apply(&mut collection)?;
        self.store.save(collection.as_slice()).await?;

        Ok(outcome)
    }
}
