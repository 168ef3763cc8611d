//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::domain::entities::{
    CommentRecord, FriendshipRecord, LikeRecord, MessageRecord, NotificationRecord, PostRecord,
    UserRecord,
};
use crate::domain::types::NotificationKind;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("integrity error: {message}")]
    Integrity { message: String },
}

impl RepoError {
    pub fn duplicate(constraint: impl Into<String>) -> Self {
        Self::Duplicate {
            constraint: constraint.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub bio: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdateUserParams {
    pub id: Uuid,
    pub display_name: String,
    pub bio: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateNotificationParams {
    pub user_id: Uuid,
    pub actor_id: Uuid,
    pub kind: NotificationKind,
    pub subject_id: Uuid,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn list_users(&self, page: PageRequest) -> Result<Page<UserRecord>, RepoError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError>;

    /// Fails with [`RepoError::Duplicate`] when the username or email is taken.
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;

    async fn update_user(&self, params: UpdateUserParams) -> Result<UserRecord, RepoError>;

    /// Removes the user together with everything they authored or took part in.
    async fn delete_user(&self, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn list_posts(&self, page: PageRequest) -> Result<Page<PostRecord>, RepoError>;

    async fn list_posts_by_author(
        &self,
        author_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<PostRecord>, RepoError>;

    async fn find_post(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError>;

    async fn create_post(&self, author_id: Uuid, content: String)
    -> Result<PostRecord, RepoError>;

    async fn update_post(&self, id: Uuid, content: String) -> Result<PostRecord, RepoError>;

    /// Removes the post, its comments and its likes.
    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    async fn list_comments(
        &self,
        post_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<CommentRecord>, RepoError>;

    async fn find_comment(&self, id: Uuid) -> Result<Option<CommentRecord>, RepoError>;

    async fn create_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        content: String,
    ) -> Result<CommentRecord, RepoError>;

    async fn update_comment(&self, id: Uuid, content: String) -> Result<CommentRecord, RepoError>;

    async fn delete_comment(&self, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait LikesRepo: Send + Sync {
    async fn list_likes(
        &self,
        post_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<LikeRecord>, RepoError>;

    /// Fails with [`RepoError::Duplicate`] when the user already liked the post.
    async fn add_like(&self, post_id: Uuid, user_id: Uuid) -> Result<LikeRecord, RepoError>;

    /// Returns [`RepoError::NotFound`] when there was no like to remove.
    async fn remove_like(&self, post_id: Uuid, user_id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait FriendshipsRepo: Send + Sync {
    async fn list_friends(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<UserRecord>, RepoError>;

    async fn find_friendship(&self, id: Uuid) -> Result<Option<FriendshipRecord>, RepoError>;

    /// Fails with [`RepoError::Duplicate`] when the pair is already friends.
    async fn create_friendship(
        &self,
        requester_id: Uuid,
        addressee_id: Uuid,
    ) -> Result<FriendshipRecord, RepoError>;

    async fn delete_friendship(&self, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait MessagesRepo: Send + Sync {
    async fn create_message(
        &self,
        sender_id: Uuid,
        recipient_id: Uuid,
        content: String,
    ) -> Result<MessageRecord, RepoError>;

    /// Messages exchanged between two users, oldest first.
    async fn conversation(
        &self,
        a: Uuid,
        b: Uuid,
        page: PageRequest,
    ) -> Result<Page<MessageRecord>, RepoError>;
}

#[async_trait]
pub trait NotificationsRepo: Send + Sync {
    async fn list_notifications(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<NotificationRecord>, RepoError>;

    async fn find_notification(&self, id: Uuid) -> Result<Option<NotificationRecord>, RepoError>;

    async fn create_notification(
        &self,
        params: CreateNotificationParams,
    ) -> Result<NotificationRecord, RepoError>;

    async fn mark_read(&self, id: Uuid) -> Result<NotificationRecord, RepoError>;
}
