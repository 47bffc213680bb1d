//! Comment document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

pub const COMMENT_COLLECTION: &str = "comments";

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct CommentDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Post the comment belongs to
    pub post: ObjectId,

    /// Author
    pub user: ObjectId,

    pub description: String,
}

impl CommentDoc {
    pub fn new(post: ObjectId, user: ObjectId, description: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            post,
            user,
            description,
        }
    }
}

impl IntoIndexes for CommentDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "post": 1 },
            Some(IndexOptions::builder().name("post_index".to_string()).build()),
        )]
    }
}

impl MutMetadata for CommentDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
