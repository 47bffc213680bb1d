//! Category document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

pub const CATEGORY_COLLECTION: &str = "categories";

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct CategoryDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Creator
    pub user: ObjectId,

    pub title: String,
}

impl CategoryDoc {
    pub fn new(user: ObjectId, title: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            user,
            title: title.trim().to_string(),
        }
    }
}

impl IntoIndexes for CategoryDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        Vec::new()
    }
}

impl MutMetadata for CategoryDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
