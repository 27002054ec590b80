//! The post collection and the mutations applied to it between a load and a save.

use std::collections::HashSet;

use crate::domain::{
    entities::{PostDraft, PostRecord},
    error::DomainError,
};

/// Ordered sequence of posts, kept in insertion order.
///
/// Ids are unique within a collection. Nothing here touches storage: callers
/// load a collection, mutate it, and hand it back to be saved whole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostCollection {
    posts: Vec<PostRecord>,
}

impl PostCollection {
    pub fn new(posts: Vec<PostRecord>) -> Self {
        Self { posts }
    }

    pub fn as_slice(&self) -> &[PostRecord] {
        &self.posts
    }

    pub fn into_inner(self) -> Vec<PostRecord> {
        self.posts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// One past the largest id present, or `1` for an empty collection.
    ///
    /// Gaps left by deletions are never filled.
    pub fn next_id(&self) -> Result<u64, DomainError> {
        match self.posts.iter().map(|post| post.id).max() {
            Some(max) => max.checked_add(1).ok_or(DomainError::IdExhausted { max }),
            None => Ok(1),
        }
    }

    pub fn find(&self, id: u64) -> Option<&PostRecord> {
        self.posts.iter().find(|post| post.id == id)
    }

    fn find_mut(&mut self, id: u64) -> Option<&mut PostRecord> {
        self.posts.iter_mut().find(|post| post.id == id)
    }

    /// Append a new post built from `draft` with a fresh id and zero likes.
    pub fn append(&mut self, draft: PostDraft) -> Result<&PostRecord, DomainError> {
        let id = self.next_id()?;
        self.posts.push(PostRecord::from_draft(id, draft));
        let index = self.posts.len() - 1;
        Ok(&self.posts[index])
    }

    /// Overwrite title, author and content of the post with `id` in place.
    pub fn update_content(
        &mut self,
        id: u64,
        draft: PostDraft,
    ) -> Result<&PostRecord, DomainError> {
        let post = self
            .find_mut(id)
            .ok_or_else(|| DomainError::post_not_found(id))?;
        post.title = draft.title;
        post.author = draft.author;
        post.content = draft.content;
        Ok(&*post)
    }

    /// Drop every post whose id is `id`. Returns how many were removed.
    pub fn remove(&mut self, id: u64) -> usize {
        let before = self.posts.len();
        self.posts.retain(|post| post.id != id);
        before - self.posts.len()
    }

    /// Add one like to the post with `id`, returning the new count when it exists.
    pub fn like(&mut self, id: u64) -> Option<u64> {
        let post = self.find_mut(id)?;
        post.likes = post.likes.saturating_add(1);
        Some(post.likes)
    }

    pub fn validate_unique_ids(&self) -> Result<(), DomainError> {
        let mut seen = HashSet::with_capacity(self.posts.len());
        for post in &self.posts {
            if !seen.insert(post.id) {
                return Err(DomainError::DuplicateId { id: post.id });
            }
        }
        Ok(())
    }
}

impl From<Vec<PostRecord>> for PostCollection {
    fn from(posts: Vec<PostRecord>) -> Self {
        Self::new(posts)
    }
}
