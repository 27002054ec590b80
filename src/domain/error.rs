use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("post `{id}` not found")]
    PostNotFound { id: u64 },
    #[error("post id `{id}` appears more than once in the collection")]
    DuplicateId { id: u64 },
    #[error("no post id is available after `{max}`")]
    IdExhausted { max: u64 },
}

impl DomainError {
    pub fn post_not_found(id: u64) -> Self {
        Self::PostNotFound { id }
    }
}
