//! JSON shapes returned to clients
//!
//! Ids are hex strings and field names are camelCase. Password hashes and
//! token digests never appear here.

use bson::oid::ObjectId;
use serde::Serialize;

use crate::db::schemas::{CategoryDoc, CommentDoc, EmailDoc, Metadata, PostDoc, UserDoc, UserRole};

fn hex(id: &Option<ObjectId>) -> String {
    id.map(|i| i.to_hex()).unwrap_or_default()
}

fn hex_all(ids: &[ObjectId]) -> Vec<String> {
    ids.iter().map(|id| id.to_hex()).collect()
}

fn updated_rfc3339(metadata: &Metadata) -> Option<String> {
    metadata
        .updated_at
        .and_then(|d| d.try_to_rfc3339_string().ok())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub profile_pic: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    pub post_count: i64,
    pub is_blocked: bool,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    pub is_account_verified: bool,
    pub account_type: &'static str,
    pub viewed_by: Vec<String>,
    pub followers: Vec<String>,
    pub following: Vec<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posts: Option<Vec<PostView>>,
}

impl From<&UserDoc> for UserView {
    fn from(user: &UserDoc) -> Self {
        Self {
            id: hex(&user._id),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            full_name: user.full_name(),
            profile_pic: user.profile_pic.clone(),
            email: user.email.clone(),
            bio: user.bio.clone(),
            post_count: user.post_count,
            is_blocked: user.is_blocked,
            is_admin: user.is_admin,
            role: user.role,
            is_account_verified: user.is_account_verified,
            account_type: user.account_type(),
            viewed_by: hex_all(&user.viewed_by),
            followers: hex_all(&user.followers),
            following: hex_all(&user.following),
            created_at: user.metadata.created_rfc3339(),
            updated_at: updated_rfc3339(&user.metadata),
            posts: None,
        }
    }
}

impl UserView {
    pub fn with_posts(mut self, posts: &[PostDoc]) -> Self {
        self.posts = Some(posts.iter().map(PostView::from).collect());
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: String,
    pub title: String,
    pub category: String,
    pub num_views: i64,
    pub likes: Vec<String>,
    pub dislikes: Vec<String>,
    pub user: String,
    pub description: String,
    pub image: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<CommentView>>,
}

impl From<&PostDoc> for PostView {
    fn from(post: &PostDoc) -> Self {
        Self {
            id: hex(&post._id),
            title: post.title.clone(),
            category: post.category.clone(),
            num_views: post.num_views,
            likes: hex_all(&post.likes),
            dislikes: hex_all(&post.dislikes),
            user: post.user.to_hex(),
            description: post.description.clone(),
            image: post.image.clone(),
            created_at: post.metadata.created_rfc3339(),
            updated_at: updated_rfc3339(&post.metadata),
            comments: None,
        }
    }
}

impl PostView {
    pub fn with_comments(mut self, comments: &[CommentDoc]) -> Self {
        self.comments = Some(comments.iter().map(CommentView::from).collect());
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: String,
    pub post: String,
    pub user: String,
    pub description: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<&CommentDoc> for CommentView {
    fn from(comment: &CommentDoc) -> Self {
        Self {
            id: hex(&comment._id),
            post: comment.post.to_hex(),
            user: comment.user.to_hex(),
            description: comment.description.clone(),
            created_at: comment.metadata.created_rfc3339(),
            updated_at: updated_rfc3339(&comment.metadata),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryView {
    pub id: String,
    pub user: String,
    pub title: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<&CategoryDoc> for CategoryView {
    fn from(category: &CategoryDoc) -> Self {
        Self {
            id: hex(&category._id),
            user: category.user.to_hex(),
            title: category.title.clone(),
            created_at: category.metadata.created_rfc3339(),
            updated_at: updated_rfc3339(&category.metadata),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailView {
    pub id: String,
    pub sent_by: String,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub message: String,
    pub created_at: Option<String>,
}

impl From<&EmailDoc> for EmailView {
    fn from(email: &EmailDoc) -> Self {
        Self {
            id: hex(&email._id),
            sent_by: email.sent_by.to_hex(),
            from: email.from.clone(),
            to: email.to.clone(),
            subject: email.subject.clone(),
            message: email.message.clone(),
            created_at: email.metadata.created_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_view_hides_secrets() {
        let mut user = UserDoc::new("Ada".into(), "L".into(), "ada@example.com".into(), "$argon2id$secret".into());
        user._id = Some(ObjectId::new());
        user.password_reset_token = Some("digest".into());
        user.followers.push(ObjectId::new());

        let json = serde_json::to_string(&UserView::from(&user)).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("digest"));
        assert!(json.contains("\"accountType\":\"Pro Account\""));
        assert!(json.contains("\"fullName\":\"Ada L\""));
    }

    #[test]
    fn test_post_view_ids_are_hex() {
        let author = ObjectId::new();
        let liker = ObjectId::new();
        let mut post = PostDoc::new(author, "T".into(), "D".into(), None);
        post.likes.push(liker);

        let view = PostView::from(&post);
        assert_eq!(view.user, author.to_hex());
        assert_eq!(view.likes, vec![liker.to_hex()]);
        assert_eq!(view.category, "All");
        assert!(view.id.is_empty());
    }
}
