//! Domain entities mirrored from persistent storage.

use serde::{Deserialize, Deserializer, Serialize};

/// A single blog entry as stored in the post collection file.
///
/// Text fields and `likes` fall back to their defaults when absent or `null`,
/// so a hand-edited file with partial objects still loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub likes: u64,
}

/// User-supplied fields of a post, shared by the add and update operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostDraft {
    pub title: String,
    pub author: String,
    pub content: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl PostRecord {
    pub fn from_draft(id: u64, draft: PostDraft) -> Self {
        let PostDraft {
            title,
            author,
            content,
        } = draft;

        Self {
            id,
            title,
            author,
            content,
            likes: 0,
        }
    }
}
