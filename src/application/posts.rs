//! Posts with their comments and likes.

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::application::error::ServiceError;
use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    CommentsRepo, CreateNotificationParams, LikesRepo, NotificationsRepo, PostsRepo, UsersRepo,
};
use crate::domain::entities::{CommentRecord, LikeRecord, PostRecord};
use crate::domain::error::DomainError;
use crate::domain::types::NotificationKind;
use crate::domain::validation::{self, MAX_COMMENT_LEN, MAX_POST_LEN};

#[derive(Clone)]
pub struct PostService {
    users: Arc<dyn UsersRepo>,
    posts: Arc<dyn PostsRepo>,
    comments: Arc<dyn CommentsRepo>,
    likes: Arc<dyn LikesRepo>,
    notifications: Arc<dyn NotificationsRepo>,
}

impl PostService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        posts: Arc<dyn PostsRepo>,
        comments: Arc<dyn CommentsRepo>,
        likes: Arc<dyn LikesRepo>,
        notifications: Arc<dyn NotificationsRepo>,
    ) -> Self {
        Self {
            users,
            posts,
            comments,
            likes,
            notifications,
        }
    }

    async fn require_caller(&self, caller: Uuid) -> Result<(), ServiceError> {
        match self.users.find_user(caller).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::UnknownCaller(caller)),
        }
    }

    pub async fn list(&self, page: PageRequest) -> Result<Page<PostRecord>, ServiceError> {
        Ok(self.posts.list_posts(page).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<PostRecord, ServiceError> {
        self.posts
            .find_post(id)
            .await?
            .ok_or_else(|| DomainError::not_found("post").into())
    }

    pub async fn create(&self, caller: Uuid, content: &str) -> Result<PostRecord, ServiceError> {
        self.require_caller(caller).await?;
        let content = validation::text("content", content, MAX_POST_LEN)?;
        Ok(self.posts.create_post(caller, content).await?)
    }

    pub async fn update(
        &self,
        caller: Uuid,
        id: Uuid,
        content: &str,
    ) -> Result<PostRecord, ServiceError> {
        let post = self.get(id).await?;
        if post.author_id != caller {
            return Err(DomainError::forbidden("edit another user's post").into());
        }
        let content = validation::text("content", content, MAX_POST_LEN)?;
        Ok(self.posts.update_post(id, content).await?)
    }

    pub async fn delete(&self, caller: Uuid, id: Uuid) -> Result<(), ServiceError> {
        let post = self.get(id).await?;
        if post.author_id != caller {
            return Err(DomainError::forbidden("delete another user's post").into());
        }
        Ok(self.posts.delete_post(id).await?)
    }

    pub async fn comments(
        &self,
        post_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<CommentRecord>, ServiceError> {
        self.get(post_id).await?;
        Ok(self.comments.list_comments(post_id, page).await?)
    }

    pub async fn get_comment(&self, id: Uuid) -> Result<CommentRecord, ServiceError> {
        self.comments
            .find_comment(id)
            .await?
            .ok_or_else(|| DomainError::not_found("comment").into())
    }

    /// Comment on a post; the post author is notified unless commenting on
    /// their own post.
    pub async fn add_comment(
        &self,
        caller: Uuid,
        post_id: Uuid,
        content: &str,
    ) -> Result<CommentRecord, ServiceError> {
        self.require_caller(caller).await?;
        let post = self.get(post_id).await?;
        let content = validation::text("content", content, MAX_COMMENT_LEN)?;
        let comment = self
            .comments
            .create_comment(post_id, caller, content)
            .await?;

        if post.author_id != caller {
            self.notify(post.author_id, caller, NotificationKind::Comment, comment.id)
                .await;
        }

        Ok(comment)
    }

    pub async fn update_comment(
        &self,
        caller: Uuid,
        id: Uuid,
        content: &str,
    ) -> Result<CommentRecord, ServiceError> {
        let comment = self.get_comment(id).await?;
        if comment.author_id != caller {
            return Err(DomainError::forbidden("edit another user's comment").into());
        }
        let content = validation::text("content", content, MAX_COMMENT_LEN)?;
        Ok(self.comments.update_comment(id, content).await?)
    }

    pub async fn delete_comment(&self, caller: Uuid, id: Uuid) -> Result<(), ServiceError> {
        let comment = self.get_comment(id).await?;
        if comment.author_id != caller {
            return Err(DomainError::forbidden("delete another user's comment").into());
        }
        Ok(self.comments.delete_comment(id).await?)
    }

    pub async fn likes(
        &self,
        post_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<LikeRecord>, ServiceError> {
        self.get(post_id).await?;
        Ok(self.likes.list_likes(post_id, page).await?)
    }

    pub async fn like(&self, caller: Uuid, post_id: Uuid) -> Result<LikeRecord, ServiceError> {
        self.require_caller(caller).await?;
        let post = self.get(post_id).await?;
        let like = self.likes.add_like(post_id, caller).await?;

        if post.author_id != caller {
            self.notify(post.author_id, caller, NotificationKind::Like, post_id)
                .await;
        }

        Ok(like)
    }

    pub async fn unlike(&self, caller: Uuid, post_id: Uuid) -> Result<(), ServiceError> {
        self.get(post_id).await?;
        Ok(self.likes.remove_like(post_id, caller).await?)
    }

    /// Notifications are a side effect; failing to record one does not undo
    /// the action that caused it.
    async fn notify(&self, user_id: Uuid, actor_id: Uuid, kind: NotificationKind, subject_id: Uuid) {
        let params = CreateNotificationParams {
            user_id,
            actor_id,
            kind,
            subject_id,
        };
        if let Err(err) = self.notifications.create_notification(params).await {
            warn!(
                target = "agora::application::posts",
                kind = kind.as_str(),
                error = %err,
                "failed to record notification"
            );
        }
    }
}
