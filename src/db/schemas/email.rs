//! Sent email record
//!
//! One document per message a user sent through `/api/emails`.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

pub const EMAIL_COLLECTION: &str = "emails";

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct EmailDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub sent_by: ObjectId,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub message: String,
}

impl IntoIndexes for EmailDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "sent_by": 1 },
            Some(IndexOptions::builder().name("sender_index".to_string()).build()),
        )]
    }
}

impl MutMetadata for EmailDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
