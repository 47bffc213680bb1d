//! Post document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for posts
pub const POST_COLLECTION: &str = "posts";

pub const DEFAULT_CATEGORY: &str = "All";

pub const DEFAULT_POST_IMAGE: &str =
    "https://cdn.pixabay.com/photo/2023/03/03/20/40/starling-7828426_1280.jpg";

/// Post document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PostDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub title: String,

    #[serde(default = "default_category")]
    pub category: String,

    #[serde(default)]
    pub num_views: i64,

    /// Users who liked the post; disjoint from `dislikes`
    #[serde(default)]
    pub likes: Vec<ObjectId>,

    /// Users who disliked the post; disjoint from `likes`
    #[serde(default)]
    pub dislikes: Vec<ObjectId>,

    /// Author
    pub user: ObjectId,

    pub description: String,

    #[serde(default = "default_image")]
    pub image: String,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn default_image() -> String {
    DEFAULT_POST_IMAGE.to_string()
}

impl PostDoc {
    pub fn new(author: ObjectId, title: String, description: String, category: Option<String>) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            title: title.trim().to_string(),
            category: category
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(default_category),
            num_views: 0,
            likes: Vec::new(),
            dislikes: Vec::new(),
            user: author,
            description,
            image: default_image(),
        }
    }
}

impl IntoIndexes for PostDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "user": 1 },
                Some(IndexOptions::builder().name("author_index".to_string()).build()),
            ),
            (
                doc! { "category": 1 },
                Some(IndexOptions::builder().name("category_index".to_string()).build()),
            ),
        ]
    }
}

impl MutMetadata for PostDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
